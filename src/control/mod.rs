//! Control module for Prometheus robot
pub mod planner;

use crate::error::CollaboratorError;

/// Velocity command for the robot
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VelocityCommand {
    /// Direction of linear motion relative to the robot heading (degrees)
    pub direction: f64,
    /// Linear speed (m/s)
    pub linear: f64,
    /// Angular speed (deg/s)
    pub angular: f64,
}

impl VelocityCommand {
    /// Hold position
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.linear == 0.0 && self.angular == 0.0
    }

    /// Same direction, both speeds multiplied by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        VelocityCommand {
            direction: self.direction,
            linear: self.linear * factor,
            angular: self.angular * factor,
        }
    }
}

/// Forwards velocity commands to the low-level motion controller
pub trait VelocitySink: Send {
    fn send(&mut self, command: &VelocityCommand) -> Result<(), CollaboratorError>;
}

/// Checks whether moving in a direction would hit something
pub trait ObstacleVerifier: Send {
    /// `direction` in degrees relative to the robot heading
    fn obstacle_in_direction(&mut self, direction: f64) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaling_keeps_direction() {
        let command = VelocityCommand {
            direction: 30.0,
            linear: 1.0,
            angular: -10.0,
        };
        let held = command.scaled(0.5);
        assert_eq!(held.direction, 30.0);
        assert_eq!(held.linear, 0.5);
        assert_eq!(held.angular, -5.0);
        assert!(!held.is_zero());
        assert!(VelocityCommand::zero().is_zero());
    }
}
