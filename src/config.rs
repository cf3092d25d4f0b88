//! Application configuration, persisted as TOML.
//!
//! The `[scrape]` section is the library's [`ScrapeConfig`] verbatim; the
//! `[logging]` section controls the subscriber set up by
//! [`crate::logging::init`]. Every field has a default, so an empty or
//! partial file is valid.

use std::path::{Path, PathBuf};

use pricegear_scrape::ScrapeConfig;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Environment variable overriding `scrape.browser.endpoint`.
pub const BROWSER_ENDPOINT_ENV: &str = "PRICEGEAR_BROWSER_ENDPOINT";
/// Environment variable overriding `scrape.browser.token`.
pub const BROWSER_TOKEN_ENV: &str = "PRICEGEAR_BROWSER_TOKEN";

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Also write a daily-rolling log file under the data directory.
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "pricegear=info,pricegear_scrape=info".to_owned(),
            file: false,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Aggregation settings.
    pub scrape: ScrapeConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| AppError::Config(format!("{}: {e}", path.display())))
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

    /// Returns the default config file path: `<config dir>/pricegear/config.toml`.
    pub fn default_config_path() -> PathBuf {
        crate::pricegear_dirs::config_file()
    }

    /// Resolve the effective configuration.
    ///
    /// An explicit `path` must exist. Without one, the default path is used
    /// if present, otherwise built-in defaults. Environment overrides are
    /// applied last and the result is validated.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be loaded or the result is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Self::default_config_path();
                if default_path.is_file() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(
            std::env::var(BROWSER_ENDPOINT_ENV).ok(),
            std::env::var(BROWSER_TOKEN_ENV).ok(),
        );
        config.scrape.validate()?;
        Ok(config)
    }

    /// Apply browser endpoint/token overrides. Blank values are ignored.
    pub fn apply_overrides(&mut self, endpoint: Option<String>, token: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|v| !v.trim().is_empty()) {
            self.scrape.browser.endpoint = Some(endpoint.trim().to_owned());
        }
        if let Some(token) = token.filter(|v| !v.trim().is_empty()) {
            self.scrape.browser.token = Some(token.trim().to_owned());
        }
    }
}
