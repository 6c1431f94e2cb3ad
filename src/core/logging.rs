//! Subscriber setup. Stdout carries the MCP protocol, so logs go to stderr or a file.

use crate::core::config::{LogRotation, LoggingConfig};
use crate::core::error::SheetError;
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber. Returns `false` when one was already installed.
pub fn init(config: &LoggingConfig, file: Option<&Path>) -> Result<bool, SheetError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| {
            SheetError::ConfigError(format!("invalid log level '{}': {e}", config.level))
        })?;

    let installed = match file {
        Some(path) => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(file_appender(config, path)?),
            )
            .try_init(),
        None => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };
    Ok(installed.is_ok())
}

/// Rolling writer for `path`. The directory is created if missing; rolled files
/// are named `<file name>.<date>` and pruned to `max_files`.
pub fn file_appender(config: &LoggingConfig, path: &Path) -> Result<RollingFileAppender, SheetError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let prefix = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            SheetError::ConfigError(format!("log file '{}' has no file name", path.display()))
        })?;

    RollingFileAppender::builder()
        .rotation(rotation(config.rotation))
        .filename_prefix(prefix)
        .max_log_files(config.max_files)
        .build(dir)
        .map_err(|e| {
            SheetError::ConfigError(format!("cannot open log file '{}': {e}", path.display()))
        })
}

fn rotation(setting: LogRotation) -> Rotation {
    match setting {
        LogRotation::Minutely => Rotation::MINUTELY,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Daily => Rotation::DAILY,
        LogRotation::Never => Rotation::NEVER,
    }
}
