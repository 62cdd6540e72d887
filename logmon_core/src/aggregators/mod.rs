pub mod alert;
pub mod metrics;

use crate::event::LogEvent;

pub use alert::AlertAggregator;
pub use metrics::MetricsAggregator;

/// Stateful consumer of log events that emits results as windows settle.
pub trait WindowAggregator: Send {
    /// Result emitted for each settled window (or state change).
    type Output: Send + 'static;

    /// Feeds one event and returns whatever became ready because of it, in
    /// emission order. Events with a zero timestamp are ignored.
    fn ingest(&mut self, event: &LogEvent) -> Vec<Self::Output>;

    /// Short label used in logs.
    fn name(&self) -> &str;

    /// Number of distinct timestamps currently buffered.
    fn buffered_timestamps(&self) -> usize;
}
