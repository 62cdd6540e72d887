use super::ReportFormat;
use logmon_core::{AlertEvent, MetricsSummary, Result};
use serde::Serialize;

/// One JSON object per line, tagged with `kind`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum Record<'a> {
    Metrics(&'a MetricsSummary),
    Alert(&'a AlertEvent),
}

impl JsonFormat {
    fn line(record: Record<'_>) -> Result<String> {
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        Ok(line)
    }
}

impl ReportFormat for JsonFormat {
    fn metrics(&self, summary: &MetricsSummary) -> Result<String> {
        Self::line(Record::Metrics(summary))
    }

    fn alert(&self, alert: &AlertEvent) -> Result<String> {
        Self::line(Record::Alert(alert))
    }
}
