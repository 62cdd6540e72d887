use crate::{ui, Cli};
use anyhow::{Context, Result};
use logmon_core::{parse_config_from_file, MonitorConfig, MonitorError, Pipeline, PipelineReport};
use logmon_input::CsvLogReader;
use logmon_sinks::{JsonFormat, OutputFormat, WriterSink};
use tracing::{error, info, warn};

/// How a monitoring run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// Stopped by Ctrl-C before the input was exhausted.
    Cancelled,
}

/// Reads the `--alert_th` value; anything that is not a positive integer is
/// reported and ignored.
pub fn parse_threshold(raw: Option<&str>) -> Option<u64> {
    let raw = raw?;
    match raw.trim().parse::<i64>() {
        Ok(value) if value > 0 => Some(value as u64),
        _ => {
            error!("Invalid alert threshold {:?}, using the configured value", raw);
            None
        }
    }
}

async fn load_config(cli: &Cli) -> Result<MonitorConfig> {
    let config = match &cli.config {
        Some(path) => parse_config_from_file(path)
            .await
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => MonitorConfig::default(),
    };
    Ok(config.with_threshold_override(parse_threshold(cli.alert_threshold.as_deref())))
}

pub async fn execute(cli: Cli) -> Result<Outcome> {
    let config = load_config(&cli).await?;
    let pipeline = Pipeline::new(config);

    let cancel = pipeline.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping the pipeline");
            cancel.cancel();
        }
    });

    let source = CsvLogReader::from_config(&cli.input, pipeline.config()).await;
    let result = match cli.format {
        OutputFormat::Text => {
            let sink = WriterSink::text(tokio::io::stdout(), ui::stdout_is_terminal());
            pipeline.run(source, sink.clone(), sink).await
        }
        OutputFormat::Json => {
            let sink = WriterSink::new(tokio::io::stdout(), JsonFormat);
            pipeline.run(source, sink.clone(), sink).await
        }
    };

    outcome(result)
}

fn outcome(result: Result<PipelineReport, MonitorError>) -> Result<Outcome> {
    match result {
        Ok(report) => {
            log_report(&report);
            Ok(Outcome::Completed)
        }
        Err(MonitorError::Cancelled) => {
            warn!("Monitoring cancelled before the input was exhausted");
            Ok(Outcome::Cancelled)
        }
        Err(e) => Err(e.into()),
    }
}

fn log_report(report: &PipelineReport) {
    info!(
        "Processed {} events ({} discarded): {} summaries, {} alerts",
        report.events_read,
        report.events_discarded,
        report.summaries_written,
        report.alerts_written
    );
}
