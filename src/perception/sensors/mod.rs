//! Sources of target observations

use super::Target;

/// Yields the latest target observation, if any arrived since the last read.
///
/// No backpressure: a source that produced several observations between two
/// reads only reports the newest one.
pub trait TargetSource {
    /// Get the source name
    fn name(&self) -> &str;

    /// Take the newest observation
    fn latest(&mut self) -> Option<Target>;
}
