//! Tracing subscriber setup.
//!
//! Logs always go to stdout. With file logging enabled, daily-rotated
//! `combined.log` and `error.log` files are written under the configured
//! directory, the latter at error level only. The returned guards must be
//! held for the lifetime of the process or buffered lines are lost.

use crate::error::{TelemetryError, TelemetryResult};
use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default level directive; overridden by the `LOG_LEVEL` env var.
    #[serde(default = "default_level")]
    pub level: String,
    /// Write rotating log files in addition to stdout.
    #[serde(default)]
    pub file_logging: bool,
    /// Directory for `combined.log` and `error.log`.
    #[serde(default = "default_dir")]
    pub dir: String,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_dir() -> String {
    "logs".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging: false,
            dir: default_dir(),
        }
    }
}

/// Initialize the global subscriber.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<Vec<WorkerGuard>> {
    let directive = std::env::var("LOG_LEVEL").unwrap_or_else(|_| config.level.clone());
    let env_filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(true);

    if !config.file_logging {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stdout_layer)
            .try_init()
            .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;
        return Ok(Vec::new());
    }

    let (combined, combined_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&config.dir, "combined.log"));
    let (errors, error_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&config.dir, "error.log"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(fmt::layer().with_ansi(false).with_writer(combined))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(errors)
                .with_filter(LevelFilter::ERROR),
        )
        .try_init()
        .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;

    Ok(vec![combined_guard, error_guard])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.dir, "logs");
        assert!(!config.file_logging);
    }

    #[test]
    fn test_second_init_reports_already_initialized() {
        let config = LogConfig::default();
        // Whichever test initializes first wins; the second call must fail
        // with the structured error rather than panicking.
        let first = init_logging(&config);
        let second = init_logging(&config);
        assert!(first.is_ok() || matches!(first, Err(TelemetryError::AlreadyInitialized(_))));
        assert!(matches!(
            second,
            Err(TelemetryError::AlreadyInitialized(_))
        ));
    }
}
