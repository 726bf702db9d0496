pub mod behaviors;
pub mod common;
pub mod config;
pub mod control;
pub mod error;
pub mod gaze;
pub mod lifecycle;
pub mod navigation;
pub mod perception;

pub use behaviors::{FollowResult, Follower, FollowerIo, InnerState, SmEvent, Transition};
pub use config::FollowerConfig;
pub use lifecycle::OuterState;
pub use perception::{ReferenceFrame, Target};
