//! Telemetry configuration from environment variables.

use std::env;
use std::path::PathBuf;

/// Default service name attached to every log line.
pub const DEFAULT_SERVICE_NAME: &str = "eth-dash";

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name for log lines
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error, or a directive list)
    pub log_level: String,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,

    /// Write logs to this file instead of stderr
    pub log_file: Option<PathBuf>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            log_file: None,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `ETH_DASH_SERVICE_NAME`: Service name (default: eth-dash)
    /// - `ETH_DASH_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `ETH_DASH_JSON_LOGS`: Enable JSON logs (default: false)
    /// - `ETH_DASH_LOG_FILE`: Log file path (default: stderr)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            service_name: lookup("ETH_DASH_SERVICE_NAME")
                .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),

            log_level: lookup("ETH_DASH_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or_else(|| "info".to_string()),

            json_logs: lookup("ETH_DASH_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),

            log_file: lookup("ETH_DASH_LOG_FILE")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    /// Route logs to `path`.
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }
}
