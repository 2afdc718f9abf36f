//! Logging setup for the simulation drivers
//!
//! Human-readable events go to stderr. When a log directory is configured a
//! second JSON layer is written there through a daily-rolling non-blocking
//! appender, so long sweeps leave a machine-readable trail.

use crate::error::{ResilienceError, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Directory for JSON log files
    pub log_dir: Option<PathBuf>,
    /// Rotated files kept on disk
    pub max_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
            max_files: 7,
        }
    }
}

/// Install the global subscriber.
///
/// The returned guard flushes the file appender on drop and must be held for
/// the lifetime of the program. Installing twice is not an error; the second
/// call leaves the existing subscriber in place.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::Builder::new()
                .rotation(tracing_appender::rolling::Rotation::DAILY)
                .filename_prefix("mptn-resilience")
                .filename_suffix("log")
                .max_log_files(config.max_files.max(1))
                .build(dir)
                .map_err(|e| ResilienceError::InvalidConfig(format!("log appender: {}", e)))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().json().with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init();

    Ok(guard)
}
