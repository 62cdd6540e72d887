use crate::aggregators::alert::DEFAULT_ALERT_THRESHOLD;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_METRICS_WINDOW: Duration = Duration::from_secs(10);
pub const DEFAULT_ALERT_WINDOW: Duration = Duration::from_secs(120);
pub const DEFAULT_SETTLING_DELAY: Duration = Duration::from_secs(4);
pub const DEFAULT_DELIMITER: char = ',';

/// Tunables of the monitoring pipeline.
///
/// Durations are written in humantime form (`"10s"`, `"2m"`) in config files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    #[serde(with = "humantime_serde")]
    pub metrics_window: Duration,
    #[serde(with = "humantime_serde")]
    pub alert_window: Duration,
    /// How far the newest timestamp must be past a window's end before that
    /// window is evaluated.
    #[serde(with = "humantime_serde")]
    pub settling_delay: Duration,
    /// Average hits per second that raises a traffic alert.
    pub alert_threshold: u64,
    pub delimiter: char,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            metrics_window: DEFAULT_METRICS_WINDOW,
            alert_window: DEFAULT_ALERT_WINDOW,
            settling_delay: DEFAULT_SETTLING_DELAY,
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    monitor: MonitorConfig,
}

impl MonitorConfig {
    pub fn metrics_window_secs(&self) -> u64 {
        self.metrics_window.as_secs()
    }

    pub fn alert_window_secs(&self) -> u64 {
        self.alert_window.as_secs()
    }

    pub fn settling_delay_secs(&self) -> u64 {
        self.settling_delay.as_secs()
    }

    /// Overrides the alert threshold when `threshold` is positive.
    pub fn with_threshold_override(mut self, threshold: Option<u64>) -> Self {
        if let Some(threshold) = threshold.filter(|t| *t > 0) {
            self.alert_threshold = threshold;
        }
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, duration) in [
            ("metrics_window", self.metrics_window),
            ("alert_window", self.alert_window),
        ] {
            if duration.as_secs() == 0 {
                return Err(format!("{} must be at least 1s", name));
            }
        }

        for (name, duration) in [
            ("metrics_window", self.metrics_window),
            ("alert_window", self.alert_window),
            ("settling_delay", self.settling_delay),
        ] {
            if duration.subsec_nanos() != 0 {
                return Err(format!("{} must be a whole number of seconds", name));
            }
        }

        if self.alert_threshold == 0 {
            return Err("alert_threshold must be > 0".to_string());
        }

        if self.delimiter == '"' || self.delimiter == '\n' {
            return Err(format!("delimiter {:?} is not allowed", self.delimiter));
        }

        Ok(())
    }
}

pub async fn parse_config_from_file(path: impl AsRef<Path>) -> Result<MonitorConfig> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path).await?;

    let extension = path.extension().and_then(|s| s.to_str());

    match extension {
        Some("yaml") | Some("yml") => parse_config_from_str(&contents, "yaml"),
        Some("toml") => parse_config_from_str(&contents, "toml"),
        Some("json") => parse_config_from_str(&contents, "json"),
        _ => Err(anyhow::anyhow!(
            "Unsupported file format. Use .yaml, .yml, .toml, or .json"
        )),
    }
}

pub fn parse_config_from_str(content: &str, format: &str) -> Result<MonitorConfig> {
    let config: MonitorConfig = match format.to_lowercase().as_str() {
        "yaml" | "yml" => serde_yaml::from_str(content)?,
        "toml" => toml::from_str::<ConfigFile>(content)?.monitor,
        "json" => serde_json::from_str(content)?,
        _ => return Err(anyhow::anyhow!("Unsupported format: {}", format)),
    };
    config.validate().map_err(|e| anyhow::anyhow!(e))?;
    Ok(config)
}

/// Durations as humantime strings, or a bare integer meaning seconds.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&humantime::format_duration(*duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Raw::deserialize(deserializer)? {
            Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
            Raw::Text(text) => humantime::parse_duration(&text).map_err(serde::de::Error::custom),
        }
    }
}
