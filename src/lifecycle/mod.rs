//! Lifecycle management for Prometheus components

use crate::error::{LifecycleError, Result};
use std::fmt;

/// Trait for components that follow a lifecycle pattern
pub trait LifecycleNode {
    /// Activate the node
    fn on_activate(&mut self) -> Result<()>;

    /// Deactivate the node
    fn on_deactivate(&mut self) -> Result<()>;

    /// Clean up the node
    fn on_cleanup(&mut self) -> Result<()>;

    /// Name used in logs
    fn name(&self) -> &str;
}

/// Outer state of a lifecycle node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OuterState {
    /// Created, configuration not yet accepted
    None,
    /// Idle, accepting start
    Configured,
    /// Executing its behavior
    Running,
    /// Terminal until re-configured
    Error,
}

impl fmt::Display for OuterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OuterState::None => "none",
            OuterState::Configured => "configured",
            OuterState::Running => "running",
            OuterState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Base implementation for lifecycle nodes
#[derive(Debug)]
pub struct LifecycleNodeBase {
    pub name: String,
    state: OuterState,
}

impl LifecycleNodeBase {
    /// Create a new lifecycle node base
    pub fn new(name: &str) -> Self {
        LifecycleNodeBase {
            name: name.to_string(),
            state: OuterState::None,
        }
    }

    /// Get the current state
    pub fn get_state(&self) -> OuterState {
        self.state
    }

    /// Record the outcome of a configuration attempt.
    ///
    /// Allowed from any state except `Running`.
    pub fn configured(&mut self, ok: bool) -> Result<()> {
        self.require_not(OuterState::Running, "configure")?;
        self.state = if ok {
            OuterState::Configured
        } else {
            OuterState::Error
        };
        Ok(())
    }

    /// `Configured` -> `Running`
    pub fn activate(&mut self) -> Result<()> {
        self.require(OuterState::Configured, "start")?;
        self.state = OuterState::Running;
        Ok(())
    }

    /// `Running` -> `Configured`
    pub fn deactivate(&mut self) -> Result<()> {
        self.require(OuterState::Running, "stop")?;
        self.state = OuterState::Configured;
        Ok(())
    }

    /// Back to `None`, whatever the current state.
    pub fn cleanup(&mut self) {
        self.state = OuterState::None;
    }

    fn require(&self, expected: OuterState, action: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(LifecycleError::InvalidTransition {
                action,
                state: self.state,
            })
        }
    }

    fn require_not(&self, refused: OuterState, action: &'static str) -> Result<()> {
        if self.state == refused {
            Err(LifecycleError::InvalidTransition {
                action,
                state: self.state,
            })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_only_from_configured() {
        let mut base = LifecycleNodeBase::new("test");
        assert!(base.activate().is_err());

        base.configured(true).unwrap();
        assert_eq!(base.get_state(), OuterState::Configured);
        base.activate().unwrap();
        assert_eq!(base.get_state(), OuterState::Running);
        assert!(base.activate().is_err());
    }

    #[test]
    fn stop_returns_to_configured() {
        let mut base = LifecycleNodeBase::new("test");
        assert!(base.deactivate().is_err());
        base.configured(true).unwrap();
        base.activate().unwrap();
        base.deactivate().unwrap();
        assert_eq!(base.get_state(), OuterState::Configured);
    }

    #[test]
    fn failed_configuration_is_error_until_reconfigured() {
        let mut base = LifecycleNodeBase::new("test");
        base.configured(false).unwrap();
        assert_eq!(base.get_state(), OuterState::Error);
        assert!(base.activate().is_err());

        base.configured(true).unwrap();
        assert_eq!(base.get_state(), OuterState::Configured);
    }

    #[test]
    fn cannot_reconfigure_while_running() {
        let mut base = LifecycleNodeBase::new("test");
        base.configured(true).unwrap();
        base.activate().unwrap();
        assert!(base.configured(true).is_err());
        assert_eq!(base.get_state(), OuterState::Running);
    }
}
