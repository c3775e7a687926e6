//! Host configuration loaded from TOML.
//!
//! ```toml
//! [logging]
//! level = "info"
//!
//! [search.enrichment]
//! top_n = 5
//!
//! [search.providers.stackoverflow]
//! api_key = ""
//! ```
//!
//! Every field is optional. A missing file yields defaults.

use std::path::{Path, PathBuf};

use codeseek_search::SearchConfig;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Environment variable that fills an empty Stack Exchange API key.
pub const API_KEY_ENV: &str = "STACKEXCHANGE_API_KEY";

/// Top-level host configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Query pipeline settings, passed through to `codeseek-search`.
    pub search: SearchConfig,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive. `RUST_LOG` overrides it.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Load `path` if it exists, otherwise return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/codeseek/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("codeseek").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("codeseek")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/codeseek-config/config.toml")
        }
    }

    /// Fill unset values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Fill unset values using `lookup` in place of the environment.
    ///
    /// An API key already present in the file wins over the environment.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let stackoverflow = &mut self.search.providers.stackoverflow;
        if stackoverflow.api_key.trim().is_empty() {
            if let Some(key) = lookup(API_KEY_ENV).filter(|key| !key.trim().is_empty()) {
                stackoverflow.api_key = key.trim().to_owned();
            }
        }
    }
}
