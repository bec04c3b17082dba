//! Declarative logging configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::level::Level;

/// Errors produced by [`LogConfig::validate`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown log level {0:?}")]
    UnknownLevel(String),
    #[error("log file name {0:?} must not contain path separators")]
    LogFileIsPath(String),
    #[error("max_size must be positive when a log file is configured")]
    ZeroMaxSize,
}

/// Logging subsystem configuration.
///
/// Every field has a serde default so partial TOML sections work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Minimum severity emitted, "crit" through "trace". Unknown names
    /// fall back to "info" at setup.
    #[serde(default = "default_level")]
    pub level: String,

    /// Live log file name inside `<data_dir>/log`. Empty means
    /// console-only output.
    #[serde(default)]
    pub log_file: String,

    /// Size in megabytes at which the live file is rotated.
    #[serde(default = "default_max_size")]
    pub max_size: u64,

    /// Number of rotated files to keep; 0 keeps all.
    #[serde(default = "default_max_backups")]
    pub max_backups: u64,

    /// Age in days after which rotated files are pruned by a one-shot
    /// pass at setup; 0 disables the pass.
    #[serde(default)]
    pub max_age: u64,

    /// Gzip-compress rotated files.
    #[serde(default)]
    pub compress: bool,

    /// Name rotated files with local time instead of UTC.
    #[serde(default)]
    pub local_time: bool,

    /// Write the file sink as JSON instead of plain text.
    #[serde(default)]
    pub json_format: bool,

    /// Echo records to standard output in addition to the file sink.
    #[serde(default = "default_console")]
    pub console: bool,

    /// Aggregate size cap in bytes for rotated files; 0 disables the
    /// retention manager.
    #[serde(default)]
    pub total_size_cap: u64,
}

fn default_level() -> String {
    "info".to_string()
}

pub(crate) fn default_max_size() -> u64 {
    100
}

fn default_max_backups() -> u64 {
    10
}

fn default_console() -> bool {
    true
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            log_file: String::new(),
            max_size: default_max_size(),
            max_backups: default_max_backups(),
            max_age: 0,
            compress: false,
            local_time: false,
            json_format: false,
            console: default_console(),
            total_size_cap: 0,
        }
    }
}

impl LogConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).context("Failed to read logging config file")?;
        toml::from_str(&content).context("Failed to parse logging config file")
    }

    /// Check the configuration for values setup cannot honor. Setup treats
    /// a failure here as a warning and proceeds with defaults.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.level
            .parse::<Level>()
            .map_err(|_| ConfigError::UnknownLevel(self.level.clone()))?;
        if !self.log_file.is_empty() {
            if self.log_file.contains(['/', '\\']) {
                return Err(ConfigError::LogFileIsPath(self.log_file.clone()));
            }
            if self.max_size == 0 {
                return Err(ConfigError::ZeroMaxSize);
            }
        }
        Ok(())
    }
}

/// Default base data directory (`~/.nodekit`), falling back to a relative
/// directory when the home directory cannot be determined.
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".nodekit"))
        .unwrap_or_else(|| PathBuf::from(".nodekit"))
}
