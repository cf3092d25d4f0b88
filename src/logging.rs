//! Tracing subscriber setup.
//!
//! Events go to stderr so stdout stays machine-readable. When enabled, a
//! second layer writes a daily-rolling `pricegear.log` under
//! [`crate::pricegear_dirs::logs_dir`] through a non-blocking writer; the
//! returned [`WorkerGuard`] must be held until exit or buffered lines are
//! lost.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::config::LoggingConfig;
use crate::error::{AppError, Result};

const LOG_FILE_PREFIX: &str = "pricegear.log";

/// Build the event filter: `RUST_LOG` wins, then the configured directive.
fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new(LoggingConfig::default().filter))
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or a
/// subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    if config.file {
        init_with_file(config, &crate::pricegear_dirs::logs_dir()).map(Some)
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .compact()
                    .with_filter(env_filter(config)),
            )
            .try_init()
            .map_err(|e| AppError::Config(format!("logging: {e}")))?;
        Ok(None)
    }
}

fn init_with_file(config: &LoggingConfig, log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact()
                .with_filter(env_filter(config)),
        )
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(true)
                .with_filter(env_filter(config)),
        )
        .try_init()
        .map_err(|e| AppError::Config(format!("logging: {e}")))?;

    tracing::debug!(dir = %log_dir.display(), "file logging enabled");
    Ok(guard)
}
