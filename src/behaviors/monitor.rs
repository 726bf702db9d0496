//! Behavior monitoring events

use super::state::{InnerState, SmEvent};
use std::fmt;

/// Event sent to the behavior monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorEvent {
    ReplyFirstTargetInvalid,
    ReplyNTargetInvalid,
    ReqLookUp,
    ReplyLookupFailed,
    ReplyLookupSucceed,
    ReqNavig,
    ReplyHumanLost,
    ReplyTargetFound,
    ReqHelp,
    Timeout,
    /// An inner state machine transition
    Transition {
        from: InnerState,
        to: InnerState,
        event: SmEvent,
    },
}

impl MonitorEvent {
    /// Wire name used by the monitor
    pub fn name(&self) -> &'static str {
        match self {
            MonitorEvent::ReplyFirstTargetInvalid => "e_reply_first_target_invalid",
            MonitorEvent::ReplyNTargetInvalid => "e_reply_N_target_invalid",
            MonitorEvent::ReqLookUp => "e_req_lookUp",
            MonitorEvent::ReplyLookupFailed => "e_reply_lookup_failed",
            MonitorEvent::ReplyLookupSucceed => "e_reply_lookup_succeed",
            MonitorEvent::ReqNavig => "e_req_navig",
            MonitorEvent::ReplyHumanLost => "e_reply_human_lost",
            MonitorEvent::ReplyTargetFound => "e_reply_target_found",
            MonitorEvent::ReqHelp => "e_req_help",
            MonitorEvent::Timeout => "e_timeout",
            MonitorEvent::Transition { .. } => "e_transition",
        }
    }
}

impl fmt::Display for MonitorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorEvent::Transition { from, to, event } => {
                write!(f, "{} {} -> {} on {}", self.name(), from, to, event)
            }
            _ => f.write_str(self.name()),
        }
    }
}

/// Fire-and-forget receiver of monitor events
pub trait MonitorSink: Send {
    fn send(&mut self, skill: &str, event: MonitorEvent);
}

/// Monitor that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMonitor;

impl MonitorSink for NullMonitor {
    fn send(&mut self, _skill: &str, _event: MonitorEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names() {
        assert_eq!(MonitorEvent::ReqHelp.name(), "e_req_help");
        assert_eq!(MonitorEvent::ReqLookUp.to_string(), "e_req_lookUp");
        let transition = MonitorEvent::Transition {
            from: InnerState::TargetValid,
            to: InnerState::MaybeLostTarget,
            event: SmEvent::InvalidTargetRec,
        };
        assert_eq!(
            transition.to_string(),
            "e_transition targetValid -> maybeLostTarget on invalidTargetRec"
        );
    }
}
