pub mod json;
pub mod text;

pub use json::JsonFormat;
pub use text::TextFormat;

use logmon_core::{AlertEvent, MetricsSummary, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Renders pipeline output as a self-contained chunk of text, newline included.
pub trait ReportFormat: Send + Sync + 'static {
    fn metrics(&self, summary: &MetricsSummary) -> Result<String>;

    fn alert(&self, alert: &AlertEvent) -> Result<String>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("Unknown output format: {} (expected text or json)", other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
