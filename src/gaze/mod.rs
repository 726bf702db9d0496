//! Gaze control: active search for a lost target and pixel tracking
pub mod scanner;

pub use scanner::{GazeScanState, GazeScanner};

use crate::common::types::{AnglePair, Pixel};
use crate::error::CollaboratorError;

/// The head/gaze actuator.
///
/// Every call is best-effort and must not block; motion completion is polled
/// through `is_motion_done`.
pub trait GazeActuator: Send {
    /// Move the gaze to (azimuth, elevation) in degrees
    fn look_at_angle(&mut self, angles: AnglePair) -> Result<(), CollaboratorError>;

    /// Center the gaze on an image pixel
    fn look_at_pixel(&mut self, pixel: Pixel) -> Result<(), CollaboratorError>;

    /// Abort the current gaze motion
    fn stop(&mut self) -> Result<(), CollaboratorError>;

    /// Set the time (seconds) the actuator takes for one trajectory
    fn set_trajectory_time(&mut self, seconds: f64) -> Result<(), CollaboratorError>;

    /// Read the current trajectory time (seconds)
    fn trajectory_time(&mut self) -> Result<f64, CollaboratorError>;

    /// Whether the last commanded motion has completed
    fn is_motion_done(&mut self) -> bool;
}

/// Stand-in used when no gaze actuator is connected.
///
/// Commands are accepted and dropped, motions complete immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisconnectedGaze;

impl GazeActuator for DisconnectedGaze {
    fn look_at_angle(&mut self, _angles: AnglePair) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn look_at_pixel(&mut self, _pixel: Pixel) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn set_trajectory_time(&mut self, _seconds: f64) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn trajectory_time(&mut self) -> Result<f64, CollaboratorError> {
        Err(CollaboratorError::Disconnected)
    }

    fn is_motion_done(&mut self) -> bool {
        true
    }
}
