use super::ReportFormat;
use chrono::{DateTime, Utc};
use colored::Colorize;
use logmon_core::{AlertEvent, MetricsSummary, Result};

const TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Human-readable console output.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFormat {
    color: bool,
}

impl TextFormat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highlight alerts with ANSI colours.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }
}

/// UTC wall-clock rendering of a unix timestamp in seconds.
pub fn format_timestamp(timestamp: u64) -> String {
    i64::try_from(timestamp)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|time| time.format(TIME_FORMAT).to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

fn rounded(percent: f64) -> i64 {
    percent.round() as i64
}

impl ReportFormat for TextFormat {
    fn metrics(&self, summary: &MetricsSummary) -> Result<String> {
        let mut out = String::from("-----\n");
        out.push_str(&format!(
            "Time window: {}, {}\n",
            format_timestamp(summary.start_time),
            format_timestamp(summary.end_time)
        ));
        out.push_str(&format!("Number of hits: {}\n", summary.hit_count));

        if summary.hit_count == 0 {
            return Ok(out);
        }

        if !summary.top_sections.is_empty() {
            let label = if summary.top_sections.len() == 1 {
                "section"
            } else {
                "sections"
            };
            let times = if summary.top_section_hit_count > 1 {
                "times"
            } else {
                "time"
            };
            out.push_str(&format!(
                "Most hit {}: {}  ({} {})\n",
                label,
                summary.top_sections.join(" "),
                summary.top_section_hit_count,
                times
            ));
        }

        let operations: Vec<String> = summary
            .verb_counts
            .non_zero()
            .map(|(verb, count)| format!("{}({})", verb, count))
            .collect();
        out.push_str(&format!("Operations: {}\n", operations.join(" ")));
        out.push_str(&format!(
            "Success rate: {}%\n",
            rounded(summary.success_rate_percent)
        ));

        if let Some(host) = &summary.lowest_success_rate_host {
            out.push_str(&format!(
                "Remote host with lowest success rate: {} ({}%)\n",
                host,
                rounded(summary.lowest_success_rate_percent)
            ));
        }

        Ok(out)
    }

    fn alert(&self, alert: &AlertEvent) -> Result<String> {
        let at = format_timestamp(alert.window_end_time);
        let line = if alert.is_active {
            format!(
                "*** High traffic generated an alert - hits = {}, triggered at {} ***",
                alert.average_hits_per_second, at
            )
        } else {
            format!("*** Traffic back to normal at {} ***", at)
        };

        let line = match (self.color, alert.is_active) {
            (false, _) => line,
            (true, true) => line.red().bold().to_string(),
            (true, false) => line.green().to_string(),
        };
        Ok(format!("{}\n", line))
    }
}
