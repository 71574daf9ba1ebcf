use super::metrics::{MetricKind, Payload};
use crate::error::Result;

/// Source of point measurements for one metric kind.
///
/// A call may block for a while (CPU usage needs two refreshes some time
/// apart), so workers run it on the blocking thread pool. Implementations
/// must be callable repeatedly; state kept between calls is allowed.
pub trait Probe: Send + 'static {
    /// The kind of payload this probe produces
    fn kind(&self) -> MetricKind;

    /// Take one measurement. An error only skips the current cycle.
    fn measure(&mut self) -> Result<Payload>;
}
