//! Navigation module for Prometheus robot
//!
//! The follower does not plan paths itself. When the target cannot be found
//! it hands a goal to an autonomous navigation engine and polls its status.

use crate::error::CollaboratorError;
use std::fmt;

/// Status reported by the navigation engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationStatus {
    Idle,
    PreparingBeforeMove,
    Moving,
    WaitingObstacle,
    GoalReached,
    Aborted,
    Failing,
    Paused,
    Thinking,
    Error,
}

/// What a navigation status means for the follower
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    InProgress,
    Succeeded,
    Failed,
}

impl NavigationStatus {
    pub fn outcome(&self) -> NavigationOutcome {
        match self {
            NavigationStatus::GoalReached => NavigationOutcome::Succeeded,
            NavigationStatus::Aborted | NavigationStatus::Failing | NavigationStatus::Error => {
                NavigationOutcome::Failed
            }
            NavigationStatus::Idle
            | NavigationStatus::PreparingBeforeMove
            | NavigationStatus::Moving
            | NavigationStatus::WaitingObstacle
            | NavigationStatus::Paused
            | NavigationStatus::Thinking => NavigationOutcome::InProgress,
        }
    }
}

impl fmt::Display for NavigationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NavigationStatus::Idle => "idle",
            NavigationStatus::PreparingBeforeMove => "preparing_before_move",
            NavigationStatus::Moving => "moving",
            NavigationStatus::WaitingObstacle => "waiting_obstacle",
            NavigationStatus::GoalReached => "goal_reached",
            NavigationStatus::Aborted => "aborted",
            NavigationStatus::Failing => "failing",
            NavigationStatus::Paused => "paused",
            NavigationStatus::Thinking => "thinking",
            NavigationStatus::Error => "error",
        };
        f.write_str(name)
    }
}

/// A goal relative to the robot's current pose
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativeGoal {
    /// meters, forward
    pub x: f64,
    /// meters, left
    pub y: f64,
    /// final heading, degrees
    pub theta: f64,
}

/// Autonomous point-to-point navigation used as a fallback
pub trait NavigationFallback: Send {
    /// Start moving toward `goal`. Must not block until arrival.
    fn go_to(&mut self, goal: &RelativeGoal) -> Result<(), CollaboratorError>;

    /// Current status of the last goal
    fn status(&mut self) -> Result<NavigationStatus, CollaboratorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_map_to_outcomes() {
        assert_eq!(
            NavigationStatus::GoalReached.outcome(),
            NavigationOutcome::Succeeded
        );
        for failed in [
            NavigationStatus::Aborted,
            NavigationStatus::Failing,
            NavigationStatus::Error,
        ] {
            assert_eq!(failed.outcome(), NavigationOutcome::Failed);
        }
        for running in [
            NavigationStatus::Idle,
            NavigationStatus::Moving,
            NavigationStatus::WaitingObstacle,
            NavigationStatus::Thinking,
        ] {
            assert_eq!(running.outcome(), NavigationOutcome::InProgress);
        }
    }
}
