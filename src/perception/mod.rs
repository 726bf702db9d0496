//! Perception module for Prometheus robot
pub mod sensors;
pub mod transform;

use crate::common::types::{Pixel, Point3D};
use crate::config::{FrameConfig, TargetType};
use std::fmt;

/// Reference frames a target can be expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceFrame {
    /// Left camera of the head (red ball tracker)
    HeadCamera,
    /// Depth camera (person detector)
    DepthCamera,
    /// Robot base frame
    Base,
}

impl ReferenceFrame {
    /// Frame the detector of `target_type` publishes in
    pub fn for_target_type(target_type: TargetType) -> Self {
        match target_type {
            TargetType::Redball => ReferenceFrame::HeadCamera,
            TargetType::Person | TargetType::FakeHumanModel => ReferenceFrame::DepthCamera,
        }
    }

    /// Configured name of this frame in the transform tree
    pub fn name<'a>(&self, frames: &'a FrameConfig) -> &'a str {
        match self {
            ReferenceFrame::HeadCamera => &frames.head_camera,
            ReferenceFrame::DepthCamera => &frames.depth_camera,
            ReferenceFrame::Base => &frames.base,
        }
    }
}

impl fmt::Display for ReferenceFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReferenceFrame::HeadCamera => "head_camera",
            ReferenceFrame::DepthCamera => "depth_camera",
            ReferenceFrame::Base => "base",
        };
        f.write_str(name)
    }
}

/// Where the target was seen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sighting {
    pub point: Point3D,
    pub pixel: Pixel,
}

/// One observation of the followed target.
///
/// An invalid target only carries its frame tag; there is no position to read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    frame: ReferenceFrame,
    sighting: Option<Sighting>,
}

impl Target {
    pub fn valid(frame: ReferenceFrame, point: Point3D, pixel: Pixel) -> Self {
        Target {
            frame,
            sighting: Some(Sighting { point, pixel }),
        }
    }

    pub fn invalid(frame: ReferenceFrame) -> Self {
        Target {
            frame,
            sighting: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.sighting.is_some()
    }

    pub fn frame(&self) -> ReferenceFrame {
        self.frame
    }

    pub fn sighting(&self) -> Option<&Sighting> {
        self.sighting.as_ref()
    }
}

/// A target expressed in the robot base frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseFrameTarget {
    pub point: Point3D,
    /// Pixel of the original observation, kept for gaze tracking
    pub pixel: Pixel,
}

impl BaseFrameTarget {
    /// Distance on the floor plane (meters)
    pub fn planar_distance(&self) -> f64 {
        self.point.x.hypot(self.point.y)
    }

    /// Bearing from the robot heading (degrees, positive to the left)
    pub fn bearing_deg(&self) -> f64 {
        self.point.y.atan2(self.point.x).to_degrees()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn invalid_target_has_no_sighting() {
        let target = Target::invalid(ReferenceFrame::DepthCamera);
        assert!(!target.is_valid());
        assert!(target.sighting().is_none());
        assert_eq!(target.frame(), ReferenceFrame::DepthCamera);
    }

    #[test]
    fn frame_follows_target_type() {
        assert_eq!(
            ReferenceFrame::for_target_type(TargetType::Redball),
            ReferenceFrame::HeadCamera
        );
        assert_eq!(
            ReferenceFrame::for_target_type(TargetType::Person),
            ReferenceFrame::DepthCamera
        );
    }

    #[test]
    fn bearing_and_distance() {
        let target = BaseFrameTarget {
            point: Point3D::new(1.0, 1.0, 0.7),
            pixel: Pixel::new(0.0, 0.0),
        };
        assert_relative_eq!(target.bearing_deg(), 45.0, epsilon = 1e-9);
        assert_relative_eq!(target.planar_distance(), 2f64.sqrt(), epsilon = 1e-9);
    }
}
