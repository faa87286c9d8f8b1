//! Structured logging setup.
//!
//! Builds a `tracing_subscriber` registry with an `EnvFilter` and a single
//! `fmt` layer, plain or JSON, writing to stderr or to a log file. The
//! terminal dashboard always logs to a file so the screen stays clean.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing_subscriber::{
    layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::{TelemetryConfig, TelemetryError};

/// Guard returned by [`init_logging`]. Hold it for the lifetime of the
/// process.
#[derive(Debug)]
pub struct LoggingGuard {
    log_file: Option<PathBuf>,
}

impl LoggingGuard {
    /// File the logs are written to, if any.
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}

impl Drop for LoggingGuard {
    fn drop(&mut self) {
        tracing::debug!("Logging shut down");
    }
}

/// Parse the configured level into a filter.
pub fn build_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Config(format!("invalid log level {:?}: {}", config.log_level, e)))
}

fn open_log_file(path: &Path) -> Result<File, TelemetryError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| TelemetryError::LogFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
}

fn fmt_layer(
    config: &TelemetryConfig,
) -> Result<Box<dyn Layer<Registry> + Send + Sync>, TelemetryError> {
    let file = match &config.log_file {
        Some(path) => Some(Arc::new(open_log_file(path)?)),
        None => None,
    };

    let layer = match (config.json_logs, file) {
        (true, Some(file)) => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(file)
            .boxed(),
        (true, None) => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .boxed(),
        (false, Some(file)) => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_ansi(false)
            .with_writer(file)
            .boxed(),
        (false, None) => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_ansi(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };
    Ok(layer)
}

/// Install the global subscriber.
///
/// Fails if the level does not parse, the log file cannot be opened, or
/// a global subscriber is already set.
pub fn init_logging(config: &TelemetryConfig) -> Result<LoggingGuard, TelemetryError> {
    let env_filter = build_filter(config)?;
    let layer = fmt_layer(config)?;

    tracing_subscriber::registry()
        .with(layer)
        .with(env_filter)
        .try_init()
        .map_err(|e| TelemetryError::Init(e.to_string()))?;

    tracing::info!(
        service = %config.service_name,
        json = config.json_logs,
        log_file = ?config.log_file,
        "Logging initialized"
    );

    Ok(LoggingGuard {
        log_file: config.log_file.clone(),
    })
}
