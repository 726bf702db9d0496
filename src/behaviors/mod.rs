//! Behaviors module for Prometheus robot
pub mod follower;
pub mod monitor;
pub mod state;

pub use follower::{Follower, FollowerIo};
pub use monitor::{MonitorEvent, MonitorSink, NullMonitor};
pub use state::{FollowResult, InnerState, SmEvent, Transition};
