//! Logging configuration and initialization for LandShare services
//!
//! This module provides centralized logging functionality with:
//! - Console logging (stderr) or daily rotating file logging
//! - Configurable log directories and file prefixes
//! - Safe error handling for logging setup
//! - Environment variable configuration

use anyhow::{Result, anyhow};
use std::env;
use std::path::PathBuf;
use tracing::info;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Where log lines are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDestination {
    Console,
    File,
}

impl LogDestination {
    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "file" => LogDestination::File,
            _ => LogDestination::Console,
        }
    }
}

/// Logging settings resolved from the environment
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub destination: LogDestination,
    pub log_dir: PathBuf,
    pub file_prefix: String,
    /// Used when `RUST_LOG` is not set or cannot be parsed
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            destination: LogDestination::Console,
            log_dir: PathBuf::from("./logs"),
            file_prefix: "landshare".to_string(),
            default_filter: "info".to_string(),
        }
    }
}

impl LogConfig {
    /// Read the logging settings from the process environment
    ///
    /// ## Environment Variables
    ///
    /// - `LOG_DESTINATION`: "console" or "file" (default: "console")
    /// - `LOG_DIR`: directory for log files (default: "./logs"), file destination only
    /// - `LOG_FILE_PREFIX`: prefix for log file names (default: "landshare"), file destination only
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`LogConfig::from_env`] with an explicit variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            destination: lookup("LOG_DESTINATION")
                .map(|value| LogDestination::parse(&value))
                .unwrap_or(defaults.destination),
            log_dir: lookup("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            file_prefix: lookup("LOG_FILE_PREFIX").unwrap_or(defaults.file_prefix),
            default_filter: defaults.default_filter,
        }
    }
}

/// Initialize tracing from environment variables
///
/// ```rust,no_run
/// use monitoring::init_logging;
///
/// fn main() -> anyhow::Result<()> {
///     init_logging()?;
///     tracing::info!("ready");
///     Ok(())
/// }
/// ```
pub fn init_logging() -> Result<()> {
    init_logging_with(&LogConfig::from_env())
}

/// Initialize tracing with an explicit configuration
pub fn init_logging_with(config: &LogConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_filter.as_str()));

    match config.destination {
        LogDestination::Console => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_ansi(true)
                        .with_target(false),
                )
                .try_init()
                .map_err(|e| anyhow!("Failed to initialize console tracing subscriber: {}", e))?;
        }
        LogDestination::File => {
            std::fs::create_dir_all(&config.log_dir).map_err(|e| {
                anyhow!(
                    "Failed to create log directory '{}': {}",
                    config.log_dir.display(),
                    e
                )
            })?;

            let file_appender = rolling::daily(&config.log_dir, &config.file_prefix);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(false),
                )
                .try_init()
                .map_err(|e| anyhow!("Failed to initialize file tracing subscriber: {}", e))?;

            info!(
                "Logging to daily rotating files: {}/{}.<YYYY-MM-DD>",
                config.log_dir.display(),
                config.file_prefix
            );

            // The guard keeps the writer thread alive for the lifetime of the process
            std::mem::forget(guard);
        }
    }

    Ok(())
}
