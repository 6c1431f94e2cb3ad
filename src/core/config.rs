//! Process configuration: where the sheet lives and how to log.
//!
//! Loaded from a TOML file (default `project-sheet.toml` in the working
//! directory). A missing file is not an error: defaults apply and the caller is
//! told so it can log it once logging is up.

use crate::core::error::SheetError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "project-sheet.toml";
pub const DEFAULT_SHEET_PATH: &str = "projects.xlsx";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_MAX_FILES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Backing spreadsheet. Relative paths resolve against the working directory.
    pub sheet_path: PathBuf,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing` filter directive; `RUST_LOG` wins when set.
    pub level: String,
    /// Append logs here instead of stderr. Rolled files get a date suffix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// How often the log file rolls over. Only used with `file`.
    pub rotation: LogRotation,
    /// Rolled files kept on disk, the current one included.
    pub max_files: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            sheet_path: PathBuf::from(DEFAULT_SHEET_PATH),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
            rotation: LogRotation::default(),
            max_files: DEFAULT_LOG_MAX_FILES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

impl Config {
    pub fn load(path: &Path) -> Result<(Config, ConfigSource), SheetError> {
        if !path.exists() {
            return Ok((Config::default(), ConfigSource::Defaults));
        }
        let content = fs::read_to_string(path)?;
        let config = Config::from_toml_str(&content).map_err(|e| match e {
            SheetError::ConfigError(msg) => {
                SheetError::ConfigError(format!("{}: {msg}", path.display()))
            }
            other => other,
        })?;
        Ok((config, ConfigSource::File(path.to_path_buf())))
    }

    pub fn from_toml_str(content: &str) -> Result<Config, SheetError> {
        let config: Config =
            toml::from_str(content).map_err(|e| SheetError::ConfigError(e.to_string()))?;
        if config.sheet_path.as_os_str().is_empty() {
            return Err(SheetError::ConfigError("sheet_path must not be empty".into()));
        }
        if config.logging.max_files == 0 {
            return Err(SheetError::ConfigError(
                "logging.max_files must be at least 1".into(),
            ));
        }
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, SheetError> {
        toml::to_string_pretty(self).map_err(|e| SheetError::ConfigError(e.to_string()))
    }

    pub fn resolved_sheet_path(&self) -> Result<PathBuf, SheetError> {
        absolutize(&self.sheet_path)
    }

    pub fn resolved_log_file(&self) -> Result<Option<PathBuf>, SheetError> {
        self.logging.file.as_deref().map(absolutize).transpose()
    }
}

fn absolutize(path: &Path) -> Result<PathBuf, SheetError> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
