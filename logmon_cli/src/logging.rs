use crate::Cli;
use anyhow::{anyhow, Result};
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

fn level(cli: &Cli) -> Level {
    if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    }
}

/// Installs the global subscriber. Logs go to stderr, or to `--log-file`
/// through a non-blocking writer whose guard must outlive the program.
pub fn init(cli: &Cli) -> Result<Option<WorkerGuard>> {
    // RUST_LOG wins over the verbosity flags when set.
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level(cli)).into())
        .from_env_lossy();

    match &cli.log_file {
        Some(path) => {
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow!("Invalid log file path: {}", path.display()))?;
            let directory = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));

            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
                .try_init()
                .map_err(|e| anyhow!("Failed to set logger: {}", e))?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .try_init()
                .map_err(|e| anyhow!("Failed to set logger: {}", e))?;
            Ok(None)
        }
    }
}
