//! Gaze scan state machine.
//!
//! One search episode sweeps the gaze through three waypoints
//! (near side, other side, in front). Each waypoint must report
//! motion-complete before its deadline, otherwise the episode fails.
//! The scanner never waits: `step()` is called once per control tick and
//! either advances, fails, or leaves the state untouched.

use super::GazeActuator;
use crate::common::clock::Clock;
use crate::common::types::{AnglePair, Pixel};
use crate::config::GazeConfig;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// State of one search episode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GazeScanState {
    /// Armed, no command issued yet
    None,
    /// Moving toward the near-side waypoint
    Nearest,
    /// Moving toward the other-side waypoint
    Otherside,
    /// Moving back in front of the robot
    Infront,
    /// All waypoints reached
    Finished,
    /// A waypoint was not reached in time
    Failed,
}

impl GazeScanState {
    /// Waypoint states, where a gaze motion is in progress
    pub fn is_moving(&self) -> bool {
        matches!(
            self,
            GazeScanState::Nearest | GazeScanState::Otherside | GazeScanState::Infront
        )
    }

    /// Episode over, `reset()` needed before the next one
    pub fn is_done(&self) -> bool {
        matches!(self, GazeScanState::Finished | GazeScanState::Failed)
    }
}

impl fmt::Display for GazeScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GazeScanState::None => "none",
            GazeScanState::Nearest => "nearest",
            GazeScanState::Otherside => "otherside",
            GazeScanState::Infront => "infront",
            GazeScanState::Finished => "finished",
            GazeScanState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Drives the gaze actuator through the scan pattern and keeps the target
/// in view while it is tracked.
pub struct GazeScanner {
    actuator: Box<dyn GazeActuator>,
    config: GazeConfig,
    state: GazeScanState,
    deadline: Option<Instant>,
    entered_at: Option<Instant>,
    /// Trajectory time in use before the search sped the gaze up
    default_trajectory_time: Option<f64>,
    last_tracked_pixel: Option<Pixel>,
}

impl GazeScanner {
    pub fn new(actuator: Box<dyn GazeActuator>, config: GazeConfig) -> Self {
        GazeScanner {
            actuator,
            config,
            state: GazeScanState::None,
            deadline: None,
            entered_at: None,
            default_trajectory_time: None,
            last_tracked_pixel: None,
        }
    }

    pub fn set_config(&mut self, config: GazeConfig) {
        self.config = config;
    }

    pub fn state(&self) -> GazeScanState {
        self.state
    }

    /// Trajectory time captured at the start of the last search
    pub fn default_trajectory_time(&self) -> Option<f64> {
        self.default_trajectory_time
    }

    /// Re-arm for a new search episode, aborting one in progress.
    pub fn reset(&mut self) {
        self.abort();
        self.state = GazeScanState::None;
    }

    /// Stop a moving scan and restore the trajectory time. No-op otherwise.
    pub fn abort(&mut self) {
        if self.state.is_moving() {
            debug!("Gaze scan aborted in {} state", self.state);
            self.stop_and_restore();
            self.state = GazeScanState::None;
        }
        self.deadline = None;
        self.entered_at = None;
    }

    /// Advance the scan by one tick.
    pub fn step(&mut self, clock: &dyn Clock) -> GazeScanState {
        let now = clock.now();
        match self.state {
            GazeScanState::None => {
                self.capture_trajectory_time();
                if let Err(e) = self.actuator.set_trajectory_time(self.config.trajectory_time) {
                    warn!("Failed to set gaze trajectory time: {}", e);
                }
                self.enter(GazeScanState::Nearest, pair(self.config.scan_near), now);
            }
            GazeScanState::Nearest => {
                self.advance_or_timeout(now, GazeScanState::Otherside, self.config.scan_otherside)
            }
            GazeScanState::Otherside => {
                self.advance_or_timeout(now, GazeScanState::Infront, self.config.scan_infront)
            }
            GazeScanState::Infront => {
                if self.actuator.is_motion_done() {
                    debug!(
                        "Gaze scan in INFRONT state: motion completed in {:?}",
                        self.elapsed(now)
                    );
                    self.stop_and_restore();
                    self.state = GazeScanState::Finished;
                    self.deadline = None;
                } else {
                    self.check_timeout(now);
                }
            }
            GazeScanState::Finished | GazeScanState::Failed => {}
        }
        self.state
    }

    /// Point the gaze at `pixel` when it leaves the central window.
    ///
    /// Returns true if a command was issued.
    pub fn track_pixel(&mut self, pixel: Pixel) -> bool {
        if !self.config.track_with_gaze || pixel.x.is_nan() || pixel.y.is_nan() {
            return false;
        }
        let [u_min, u_max] = self.config.pixel_x_range;
        let [v_min, v_max] = self.config.pixel_y_range;
        let outside = pixel.x < u_min || pixel.x > u_max || pixel.y < v_min || pixel.y > v_max;
        if !outside {
            return false;
        }
        if let Some(last) = self.last_tracked_pixel {
            let band = self.config.pixel_deadband;
            if (last.x - pixel.x).abs() < band && (last.y - pixel.y).abs() < band {
                return false;
            }
        }
        self.last_tracked_pixel = Some(pixel);
        debug!("Gaze look at pixel ({:.0}, {:.0})", pixel.x, pixel.y);
        if let Err(e) = self.actuator.look_at_pixel(pixel) {
            warn!("Gaze look at pixel failed: {}", e);
        }
        true
    }

    /// Restore the trajectory time captured before searching
    pub fn close(&mut self) {
        if self.state.is_moving() {
            self.abort();
            return;
        }
        if let Some(t) = self.default_trajectory_time {
            if let Err(e) = self.actuator.set_trajectory_time(t) {
                warn!("Failed to restore gaze trajectory time: {}", e);
            }
        }
    }

    /// Human readable status for debug prints
    pub fn describe(&self) -> String {
        let [az, el] = match self.state {
            GazeScanState::None | GazeScanState::Nearest => self.config.scan_near,
            GazeScanState::Otherside => self.config.scan_otherside,
            _ => self.config.scan_infront,
        };
        match self.state {
            GazeScanState::None => "NONE state. Scan not started".to_string(),
            GazeScanState::Finished => "FINISHED state. Lookup for target is finished".to_string(),
            GazeScanState::Failed => {
                "FAILED state. A waypoint was not reached in time".to_string()
            }
            moving => format!(
                "{} state. Gaze is moving toward angle ({:.1} {:.1})",
                moving.to_string().to_uppercase(),
                az,
                el
            ),
        }
    }

    fn advance_or_timeout(&mut self, now: Instant, next: GazeScanState, waypoint: [f64; 2]) {
        if self.actuator.is_motion_done() {
            debug!(
                "Gaze scan in {} state: motion completed in {:?}, moving to {:?}",
                self.state,
                self.elapsed(now),
                waypoint
            );
            self.enter(next, pair(waypoint), now);
        } else {
            self.check_timeout(now);
        }
    }

    fn check_timeout(&mut self, now: Instant) {
        if self.deadline.is_some_and(|deadline| now > deadline) {
            error!(
                "Gaze scan in {} state: waypoint not reached within {:.1}s",
                self.state, self.config.lookup_timeout
            );
            self.stop_and_restore();
            self.state = GazeScanState::Failed;
            self.deadline = None;
        }
    }

    fn enter(&mut self, state: GazeScanState, angles: AnglePair, now: Instant) {
        if let Err(e) = self.actuator.look_at_angle(angles) {
            warn!("Gaze look at angle {:?} failed: {}", angles, e);
        }
        self.state = state;
        self.entered_at = Some(now);
        self.deadline = match now.checked_add(self.config.lookup_timeout()) {
            Some(deadline) => Some(deadline),
            None => {
                error!(
                    "Gaze lookup timeout {:.1}s overflows the clock, failing on next step",
                    self.config.lookup_timeout
                );
                Some(now)
            }
        };
    }

    fn capture_trajectory_time(&mut self) {
        match self.actuator.trajectory_time() {
            Ok(t) => self.default_trajectory_time = Some(t),
            Err(e) => debug!("Gaze trajectory time unavailable: {}", e),
        }
    }

    fn stop_and_restore(&mut self) {
        if let Err(e) = self.actuator.stop() {
            warn!("Gaze stop failed: {}", e);
        }
        if let Some(t) = self.default_trajectory_time {
            if let Err(e) = self.actuator.set_trajectory_time(t) {
                warn!("Failed to restore gaze trajectory time: {}", e);
            }
        }
    }

    fn elapsed(&self, now: Instant) -> Duration {
        self.entered_at
            .map(|at| now.saturating_duration_since(at))
            .unwrap_or_default()
    }
}

fn pair(angles: [f64; 2]) -> AnglePair {
    (angles[0], angles[1])
}
