//! Error types for the follower

use thiserror::Error;

/// Rejected configuration. Raised only by `configure()`, never while running.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid threshold {name}: {value}")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("Invalid limit {name}: {reason}")]
    InvalidLimit { name: &'static str, reason: String },

    #[error("Malformed frame name for {role}: {name:?}")]
    MalformedFrame { role: &'static str, name: String },
}

/// Failure to express a target in the robot base frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("Transform from {source_frame} to {target_frame} is unavailable")]
    TransformUnavailable {
        source_frame: String,
        target_frame: String,
    },
}

/// Failure reported by an external collaborator (gaze, navigation, sinks).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("Collaborator is not connected")]
    Disconnected,

    #[error("Command rejected: {0}")]
    Rejected(String),
}

/// Invalid request on the outer lifecycle state machine.
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Cannot {action} while in state {state}")]
    InvalidTransition {
        action: &'static str,
        state: crate::lifecycle::OuterState,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, LifecycleError>;
