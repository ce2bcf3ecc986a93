// src/config.rs
//! Session configuration.
//!
//! Resolution order: explicit path, then `CALL_DETAIL_CONFIG`, then built-in
//! defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::ConfigError;

pub const ENV_CONFIG_PATH: &str = "CALL_DETAIL_CONFIG";
pub const DEFAULT_CALL_LOG_URI: &str = "content://call_log/calls";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter level when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Human,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailConfig {
    /// Base uri row ids are appended to.
    pub call_log_uri: String,
    /// Preselected "notify lookup provider" choice in the block confirmation.
    pub notify_lookup_provider: bool,
    pub log: LogConfig,
}

impl Default for DetailConfig {
    fn default() -> Self {
        Self {
            call_log_uri: DEFAULT_CALL_LOG_URI.to_string(),
            notify_lookup_provider: false,
            log: LogConfig::default(),
        }
    }
}

/// Where the active configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    CliArgument(PathBuf),
    Environment(PathBuf),
    BuiltinDefault,
}

impl DetailConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads configuration. An explicit path must exist; a path from the
    /// environment that cannot be read falls back to defaults.
    pub fn resolve(cli_path: Option<&Path>) -> Result<(Self, ConfigSource), ConfigError> {
        if let Some(path) = cli_path {
            return Ok((Self::from_file(path)?, ConfigSource::CliArgument(path.to_path_buf())));
        }

        if let Some(path) = std::env::var_os(ENV_CONFIG_PATH).map(PathBuf::from) {
            match Self::from_file(&path) {
                Ok(config) => return Ok((config, ConfigSource::Environment(path))),
                Err(e) => warn!(error = %e, "ignoring {ENV_CONFIG_PATH}, using defaults"),
            }
        }

        Ok((Self::default(), ConfigSource::BuiltinDefault))
    }
}
