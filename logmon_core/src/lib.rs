pub mod aggregators;
pub mod buffer;
pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod pipeline;
pub mod report;
pub mod window;

pub use aggregators::{AlertAggregator, MetricsAggregator, WindowAggregator};
pub use channel::{event_channel, EventReceiver, EventSender};
pub use config::{parse_config_from_file, parse_config_from_str, MonitorConfig};
pub use dispatcher::Dispatcher;
pub use error::{MonitorError, Result};
pub use event::{HttpVerb, LogEvent};
pub use pipeline::{EventSource, Pipeline, PipelineReport, Sink};
pub use report::{AlertEvent, MetricsSummary, VerbCounts};

// Re-export commonly used types
pub use async_trait::async_trait;
pub use tokio_util::sync::CancellationToken;
