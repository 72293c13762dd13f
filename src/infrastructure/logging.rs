//! Logging initialization using tracing.

use std::io;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Output format for log records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Structured JSON, one record per line.
    Json,
    /// Human-readable output.
    #[default]
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LogConfig {
    /// Minimum level: trace, debug, info, warn, or error.
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format for stdout.
    #[serde(default)]
    pub format: LogFormat,

    /// Optional directory for daily-rolling JSON log files. When set, file
    /// output replaces stdout.
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            log_dir: None,
        }
    }
}

/// Installed logger; keep the returned value alive for the process
/// lifetime so buffered file output is flushed on shutdown.
pub struct Logger {
    _guard: Option<WorkerGuard>,
}

impl Logger {
    /// Install the global tracing subscriber.
    pub fn init(config: &LogConfig) -> Result<Self> {
        let level = parse_level(&config.level)?;
        let filter = EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy();

        let guard = if let Some(dir) = &config.log_dir {
            let appender = rolling::daily(Path::new(dir), "hivemind.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_filter(filter);
            tracing_subscriber::registry().with(file_layer).init();
            Some(guard)
        } else {
            match config.format {
                LogFormat::Json => {
                    let layer = tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(io::stdout)
                        .with_target(true)
                        .with_filter(filter);
                    tracing_subscriber::registry().with(layer).init();
                }
                LogFormat::Pretty => {
                    let layer = tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_writer(io::stdout)
                        .with_target(true)
                        .with_filter(filter);
                    tracing_subscriber::registry().with(layer).init();
                }
            }
            None
        };

        Ok(Self { _guard: guard })
    }
}

fn parse_level(level: &str) -> Result<Level> {
    match level.to_ascii_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => anyhow::bail!(
            "Invalid log level: {other}. Must be one of: trace, debug, info, warn, error"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_levels_case_insensitively() {
        assert_eq!(parse_level("info").unwrap(), Level::INFO);
        assert_eq!(parse_level("WARN").unwrap(), Level::WARN);
        assert!(parse_level("verbose").is_err());
    }

    #[test]
    fn format_deserializes_from_lowercase() {
        let format: LogFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, LogFormat::Json);
    }
}
