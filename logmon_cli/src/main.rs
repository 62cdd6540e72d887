mod logging;
mod monitor;
mod ui;

use clap::Parser;
use logmon_sinks::OutputFormat;
use monitor::Outcome;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

/// Legacy spelling of the threshold flag, with a single dash.
const LEGACY_THRESHOLD_FLAG: &str = "-alert_th";

#[derive(Parser, Debug)]
#[command(name = "logmon")]
#[command(about = "Windowed traffic summaries and alerts for HTTP access logs", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Access log to read (CSV with a header row), or - for stdin
    #[arg(default_value = "-")]
    pub input: String,

    /// Average hits per second over the alert window that raises an alert
    #[arg(long = "alert_th", value_name = "HITS", allow_hyphen_values = true)]
    pub alert_threshold: Option<String>,

    /// Monitor settings file (YAML, TOML, or JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Report format written to stdout
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Rewrites `-alert_th=N` as `--alert_th=N` so clap does not read it as a
/// cluster of short flags.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| match arg.to_str() {
            Some(s) if s == LEGACY_THRESHOLD_FLAG || s.starts_with("-alert_th=") => {
                OsString::from(format!("-{}", s))
            }
            _ => arg,
        })
        .collect()
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_from(normalize_args(std::env::args_os()));

    let log_guard = match logging::init(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            ui::print_error(&format!("{:#}", e));
            return ExitCode::FAILURE;
        }
    };

    match monitor::execute(cli).await {
        Ok(Outcome::Completed) => ExitCode::SUCCESS,
        Ok(Outcome::Cancelled) => {
            // Flushes the log file before the process exits.
            drop(log_guard);
            // A blocking stdin read would otherwise keep the runtime alive.
            std::process::exit(0);
        }
        Err(e) => {
            ui::print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        let args = std::iter::once("logmon")
            .chain(args.iter().copied())
            .map(OsString::from);
        Cli::try_parse_from(normalize_args(args))
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]).unwrap();
        assert_eq!(cli.input, "-");
        assert!(cli.alert_threshold.is_none());
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn test_legacy_threshold_flag() {
        let cli = parse(&["-alert_th=15", "access.csv"]).unwrap();
        assert_eq!(cli.input, "access.csv");
        assert_eq!(cli.alert_threshold.as_deref(), Some("15"));

        let cli = parse(&["access.csv", "--alert_th=3"]).unwrap();
        assert_eq!(cli.alert_threshold.as_deref(), Some("3"));
    }

    #[test]
    fn test_malformed_threshold_still_parses() {
        let cli = parse(&["-alert_th=-4"]).unwrap();
        assert_eq!(cli.alert_threshold.as_deref(), Some("-4"));

        let cli = parse(&["-alert_th=lots"]).unwrap();
        assert_eq!(cli.alert_threshold.as_deref(), Some("lots"));
    }

    #[test]
    fn test_too_many_inputs() {
        assert!(parse(&["a.csv", "b.csv"]).is_err());
    }

    #[test]
    fn test_normalize_leaves_other_args() {
        let args: Vec<OsString> = ["logmon", "-v", "--alert_th=2", "-"]
            .into_iter()
            .map(OsString::from)
            .collect();
        assert_eq!(normalize_args(args.clone()), args);
    }

    #[test]
    fn test_json_format() {
        let cli = parse(&["--format", "json", "-q"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.quiet);
        assert!(parse(&["-v", "-q"]).is_err());
    }
}
