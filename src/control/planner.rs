//! Velocity planning toward a target in the base frame

use super::VelocityCommand;
use crate::config::NavigationConfig;
use crate::perception::BaseFrameTarget;

/// Turns a base-frame target position into a bounded velocity command
#[derive(Debug, Clone)]
pub struct VelocityCommandPlanner {
    config: NavigationConfig,
}

impl VelocityCommandPlanner {
    /// Create a new planner
    pub fn new(config: NavigationConfig) -> Self {
        VelocityCommandPlanner { config }
    }

    pub fn set_config(&mut self, config: NavigationConfig) {
        self.config = config;
    }

    /// Compute the command for `target`. A zero command means hold position.
    pub fn plan(&self, target: &BaseFrameTarget) -> VelocityCommand {
        let distance = target.planar_distance();
        let bearing = target.bearing_deg();

        VelocityCommand {
            direction: bearing,
            linear: self.linear_speed(distance),
            angular: self.angular_speed(bearing),
        }
    }

    fn linear_speed(&self, distance: f64) -> f64 {
        if distance < self.config.distance_threshold {
            return 0.0;
        }
        (self.config.factor_dist_to_vel * distance).min(self.config.velocity_limits.linear)
    }

    fn angular_speed(&self, bearing: f64) -> f64 {
        let error = bearing.abs();
        if error < self.config.angle_threshold {
            return 0.0;
        }
        let limit = self.config.velocity_limits.angular;
        let raw = (self.config.factor_ang_to_vel * bearing).clamp(-limit, limit);
        raw * self.reduction(error)
    }

    /// 0 below the reduction zone, 1 above it, linear in between
    fn reduction(&self, error: f64) -> f64 {
        let zone = self.config.angle_limits_vel_reduction;
        if error >= zone.max {
            1.0
        } else if error <= zone.min {
            0.0
        } else {
            (error - zone.min) / (zone.max - zone.min)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::{Pixel, Point3D};
    use approx::assert_relative_eq;

    fn at(x: f64, y: f64) -> BaseFrameTarget {
        BaseFrameTarget {
            point: Point3D::new(x, y, 0.0),
            pixel: Pixel::new(160.0, 120.0),
        }
    }

    fn planner() -> VelocityCommandPlanner {
        VelocityCommandPlanner::new(NavigationConfig::default())
    }

    #[test]
    fn target_within_distance_threshold_stops() {
        let command = planner().plan(&at(0.5, 0.0));
        assert!(command.is_zero());
    }

    #[test]
    fn linear_speed_is_proportional_then_saturates() {
        let planner = planner();
        assert_relative_eq!(planner.plan(&at(1.0, 0.0)).linear, 0.8, epsilon = 1e-9);
        assert_relative_eq!(planner.plan(&at(2.0, 0.0)).linear, 1.6, epsilon = 1e-9);
        // limit is 3 m/s
        assert_relative_eq!(planner.plan(&at(10.0, 0.0)).linear, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn linear_speed_never_grows_while_approaching() {
        let planner = planner();
        let mut previous = f64::INFINITY;
        for step in 0..100 {
            let distance = 10.0 - step as f64 * 0.1;
            let speed = planner.plan(&at(distance, 0.0)).linear;
            assert!(speed <= previous);
            assert!(speed <= 3.0);
            previous = speed;
        }
    }

    #[test]
    fn aligned_target_needs_no_rotation() {
        let command = planner().plan(&at(2.0, 0.05));
        assert_eq!(command.angular, 0.0);
    }

    #[test]
    fn small_heading_error_is_not_corrected() {
        // 10 degrees: above the angle threshold but below the reduction zone
        let y = 2.0 * 10f64.to_radians().tan();
        let command = planner().plan(&at(2.0, y));
        assert_eq!(command.angular, 0.0);
    }

    #[test]
    fn reduction_zone_interpolates() {
        // 30 degrees: halfway through the 20..40 zone, raw 24 deg/s
        let y = 2.0 * 30f64.to_radians().tan();
        let command = planner().plan(&at(2.0, y));
        assert_relative_eq!(command.angular, 12.0, epsilon = 1e-6);
        assert_relative_eq!(command.direction, 30.0, epsilon = 1e-6);
    }

    #[test]
    fn large_heading_error_gets_full_limited_authority() {
        let right = planner().plan(&at(0.0, -2.0));
        assert_relative_eq!(right.angular, -30.0, epsilon = 1e-9);

        let behind = planner().plan(&at(-2.0, 0.1));
        assert_relative_eq!(behind.angular, 30.0, epsilon = 1e-9);
    }
}
