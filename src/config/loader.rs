use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::types::EngineConfig;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

impl EngineConfig {
    /// Returns the path to the configuration file.
    ///
    /// Uses `~/.config/stepgate/config.toml` on Unix/macOS,
    /// or equivalent on other platforms via `dirs::config_dir()`.
    /// Falls back to current directory if config_dir is unavailable.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("stepgate").join("config.toml")
    }

    /// Loads configuration from the default config file.
    ///
    /// - If the file doesn't exist, returns `EngineConfig::default()`.
    /// - If the file exists, parses it as TOML and validates.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();

        if !path.exists() {
            return Ok(EngineConfig::default());
        }

        Self::load_from(&path)
    }

    /// Loads and validates configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: EngineConfig = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - Code and passcode lengths are positive
    /// - The resend countdown and tick interval are positive
    /// - `max_attempts`, when set, is positive
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |message: &str| -> Result<(), ConfigError> {
            Err(ConfigError::ValidationError {
                message: message.to_string(),
            })
        };

        if self.code.length == 0 {
            return fail("code.length must be at least 1");
        }
        if self.passcode.length == 0 {
            return fail("passcode.length must be at least 1");
        }
        if self.resend.duration_ticks == 0 {
            return fail("resend.duration_ticks must be at least 1");
        }
        if self.resend.tick_interval_ms == 0 {
            return fail("resend.tick_interval_ms must be at least 1");
        }
        if self.submit.max_attempts == Some(0) {
            return fail("submit.max_attempts must be at least 1 when set");
        }

        Ok(())
    }
}
