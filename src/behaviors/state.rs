//! States, events and results of the follow behavior

use std::fmt;

/// Behavior while the coordinator is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InnerState {
    Unknown,
    TargetValid,
    MaybeLostTarget,
    LostTargetLookup,
    StartAutoNav,
    WaitAutoNav,
    AutoNavOk,
    AutoNavError,
    NeedHelp,
}

impl InnerState {
    pub fn name(&self) -> &'static str {
        match self {
            InnerState::Unknown => "unknown",
            InnerState::TargetValid => "targetValid",
            InnerState::MaybeLostTarget => "maybeLostTarget",
            InnerState::LostTargetLookup => "lostTarget_lookup",
            InnerState::StartAutoNav => "startAutoNav",
            InnerState::WaitAutoNav => "waitAutoNav",
            InnerState::AutoNavOk => "autoNavOk",
            InnerState::AutoNavError => "autoNavError",
            InnerState::NeedHelp => "needHelp",
        }
    }
}

impl fmt::Display for InnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Events that trigger inner transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmEvent {
    ValidTargetRec,
    InvalidTargetRec,
    LookupFinished,
    AutoNavFinished,
    Error,
}

impl fmt::Display for SmEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SmEvent::ValidTargetRec => "validTargetRec",
            SmEvent::InvalidTargetRec => "invalidTargetRec",
            SmEvent::LookupFinished => "lookupFinished",
            SmEvent::AutoNavFinished => "autoNavFinished",
            SmEvent::Error => "error",
        };
        f.write_str(name)
    }
}

/// One recorded inner transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: InnerState,
    pub to: InnerState,
    pub event: SmEvent,
}

/// Outcome of one tick, reported to the owning module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowResult {
    /// Tracking the target
    Ok,
    /// Target not visible, waiting or searching
    LostTarget,
    /// Navigation fallback in progress
    AutoNavigation,
    /// Autonomous recovery failed
    NeedHelp,
    Error,
    Failed,
    /// Tick received outside the running state
    NotRunning,
}
