use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::git::chunk::MAX_CLI_LENGTH;
use crate::git::encoding;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Config directory not found")]
    DirectoryNotFound,

    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub git: GitConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct GitConfig {
    /// Executables tried, in order, before the platform default lookup
    pub path_hints: Vec<PathBuf>,
    /// Extra environment passed to every git process
    pub env: BTreeMap<String, String>,
    /// Combined path length allowed per invocation before chunking
    pub max_cli_length: usize,
    /// Maximum number of status entries read before the stream is stopped
    pub status_limit: usize,
    /// Concurrent git processes used by `clean`
    pub clean_concurrency: usize,
    pub default_encoding: String,
    pub log_commands: bool,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            path_hints: Vec::new(),
            env: BTreeMap::new(),
            max_cli_length: MAX_CLI_LENGTH,
            status_limit: 5000,
            clean_concurrency: 5,
            default_encoding: "utf8".to_string(),
            log_commands: true,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AuditConfig {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub max_size_bytes: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: None,
            max_size_bytes: crate::audit::logger::DEFAULT_MAX_LOG_SIZE,
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        let home = std::env::var("HOME").map_err(|_| ConfigError::DirectoryNotFound)?;
        Ok(PathBuf::from(home).join(".config").join("gitbridge"))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::config_path()?)
    }

    /// Load the default location, or fall back to defaults when no file exists
    pub fn load_or_default() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default_config());
        }
        Self::load_from(path)
    }

    /// Load configuration from an explicit file
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::ReadError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Config file not found",
            )));
        }

        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        self.validate()?;

        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;

        Ok(())
    }

    /// Create default configuration
    pub fn default_config() -> Self {
        Config {
            git: GitConfig::default(),
            audit: AuditConfig::default(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.git.max_cli_length == 0 {
            return Err(ConfigError::InvalidValue(
                "max_cli_length must be greater than 0".to_string(),
            ));
        }

        if self.git.status_limit == 0 {
            return Err(ConfigError::InvalidValue(
                "status_limit must be greater than 0".to_string(),
            ));
        }

        if self.git.clean_concurrency == 0 {
            return Err(ConfigError::InvalidValue(
                "clean_concurrency must be greater than 0".to_string(),
            ));
        }

        if !encoding::exists(&self.git.default_encoding) {
            return Err(ConfigError::InvalidValue(format!(
                "Unknown encoding: {}",
                self.git.default_encoding
            )));
        }

        if self.audit.enabled && self.audit.max_size_bytes == 0 {
            return Err(ConfigError::InvalidValue(
                "max_size_bytes must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
