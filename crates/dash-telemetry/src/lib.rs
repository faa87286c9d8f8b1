//! # Dash Telemetry
//!
//! Structured logging for eth-dash.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dash_telemetry::{init_logging, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! let _guard = init_logging(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `ETH_DASH_LOG_LEVEL` | `RUST_LOG`, then `info` | Log level filter |
//! | `ETH_DASH_JSON_LOGS` | `false` | JSON formatted output |
//! | `ETH_DASH_LOG_FILE` | unset (stderr) | Log file path |
//! | `ETH_DASH_SERVICE_NAME` | `eth-dash` | Service name in log lines |

#![warn(missing_docs)]

mod config;
mod logging;

pub use config::{TelemetryConfig, DEFAULT_SERVICE_NAME};
pub use logging::{build_filter, init_logging, LoggingGuard};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The global subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    Init(String),

    /// The log file could not be opened.
    #[error("Failed to open log file {path}: {reason}")]
    LogFile {
        /// Path given
        path: String,
        /// OS error
        reason: String,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),
}
