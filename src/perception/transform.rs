//! Conversion of target observations into the robot base frame

use super::{BaseFrameTarget, ReferenceFrame, Sighting};
use crate::common::types::{Point3D, Transform3D};
use crate::config::FrameConfig;
use crate::error::TransformError;
use std::collections::HashMap;

/// Trait for transform tree lookups
pub trait TransformLookup: Send {
    /// Express `point`, given in `source`, in `target`.
    fn transform_point(
        &self,
        source: &str,
        target: &str,
        point: &Point3D,
    ) -> Result<Point3D, TransformError>;
}

/// A transform tree holding fixed parent <- child transforms
#[derive(Debug, Default, Clone)]
pub struct StaticTransformTree {
    // (parent, child) -> pose of child in parent
    edges: HashMap<(String, String), Transform3D>,
}

impl StaticTransformTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pose of `child` expressed in `parent`
    pub fn insert(&mut self, parent: &str, child: &str, pose: Transform3D) {
        self.edges
            .insert((parent.to_string(), child.to_string()), pose);
    }

    fn find(&self, source: &str, target: &str) -> Option<Transform3D> {
        if source == target {
            return Some(Transform3D::identity());
        }
        if let Some(pose) = self.edges.get(&(target.to_string(), source.to_string())) {
            return Some(*pose);
        }
        self.edges
            .get(&(source.to_string(), target.to_string()))
            .map(|pose| pose.inverse())
    }
}

impl TransformLookup for StaticTransformTree {
    fn transform_point(
        &self,
        source: &str,
        target: &str,
        point: &Point3D,
    ) -> Result<Point3D, TransformError> {
        self.find(source, target)
            .map(|pose| pose * point)
            .ok_or_else(|| TransformError::TransformUnavailable {
                source_frame: source.to_string(),
                target_frame: target.to_string(),
            })
    }
}

/// Brings targets from their acquisition frame into the base frame
pub struct TargetFrameTransformer {
    frames: FrameConfig,
    lookup: Box<dyn TransformLookup>,
}

impl TargetFrameTransformer {
    pub fn new(frames: FrameConfig, lookup: Box<dyn TransformLookup>) -> Self {
        TargetFrameTransformer { frames, lookup }
    }

    pub fn set_frames(&mut self, frames: FrameConfig) {
        self.frames = frames;
    }

    /// Transform a sighting made in `frame` into the base frame
    pub fn to_base_frame(
        &self,
        frame: ReferenceFrame,
        sighting: &Sighting,
    ) -> Result<BaseFrameTarget, TransformError> {
        let point = match frame {
            ReferenceFrame::Base => sighting.point,
            _ => self.lookup.transform_point(
                frame.name(&self.frames),
                &self.frames.base,
                &sighting.point,
            )?,
        };
        Ok(BaseFrameTarget {
            point,
            pixel: sighting.pixel,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::Pixel;
    use approx::assert_relative_eq;
    use nalgebra::{Translation3, UnitQuaternion, Vector3};

    fn camera_on_mast() -> Transform3D {
        // camera 1m up, looking 90 degrees to the left
        Transform3D::from_parts(
            Translation3::new(0.0, 0.0, 1.0),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f64::consts::FRAC_PI_2),
        )
    }

    fn sighting(x: f64, y: f64, z: f64) -> Sighting {
        Sighting {
            point: Point3D::new(x, y, z),
            pixel: Pixel::new(160.0, 120.0),
        }
    }

    #[test]
    fn applies_child_pose() {
        let mut tree = StaticTransformTree::new();
        tree.insert("mobile_base_body_link", "depth_center", camera_on_mast());
        let transformer = TargetFrameTransformer::new(FrameConfig::default(), Box::new(tree));

        let target = transformer
            .to_base_frame(ReferenceFrame::DepthCamera, &sighting(2.0, 0.0, 0.0))
            .unwrap();
        assert_relative_eq!(target.point.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(target.point.y, 2.0, epsilon = 1e-9);
        assert_relative_eq!(target.point.z, 1.0, epsilon = 1e-9);
        assert_eq!(target.pixel, Pixel::new(160.0, 120.0));
    }

    #[test]
    fn inverse_edge_is_used() {
        let mut tree = StaticTransformTree::new();
        tree.insert("depth_center", "mobile_base_body_link", camera_on_mast().inverse());
        let transformer = TargetFrameTransformer::new(FrameConfig::default(), Box::new(tree));

        let target = transformer
            .to_base_frame(ReferenceFrame::DepthCamera, &sighting(2.0, 0.0, 0.0))
            .unwrap();
        assert_relative_eq!(target.point.y, 2.0, epsilon = 1e-9);
        assert_relative_eq!(target.point.z, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn missing_transform_is_unavailable() {
        let transformer = TargetFrameTransformer::new(
            FrameConfig::default(),
            Box::new(StaticTransformTree::new()),
        );
        let err = transformer
            .to_base_frame(ReferenceFrame::HeadCamera, &sighting(1.0, 0.0, 0.0))
            .unwrap_err();
        assert_eq!(
            err,
            TransformError::TransformUnavailable {
                source_frame: "head_leopard_left".to_string(),
                target_frame: "mobile_base_body_link".to_string(),
            }
        );
    }

    #[test]
    fn base_frame_targets_pass_through() {
        let transformer = TargetFrameTransformer::new(
            FrameConfig::default(),
            Box::new(StaticTransformTree::new()),
        );
        let target = transformer
            .to_base_frame(ReferenceFrame::Base, &sighting(1.0, -1.0, 0.0))
            .unwrap();
        assert_eq!(target.point, Point3D::new(1.0, -1.0, 0.0));
    }
}
