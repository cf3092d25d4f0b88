//! Centralized application directory paths.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | App data | `~/Library/Application Support/pricegear/` | `~/.local/share/pricegear/` |
//! | Config | `~/Library/Application Support/pricegear/` | `~/.config/pricegear/` |
//!
//! # Environment Overrides
//!
//! - `PRICEGEAR_DATA_DIR` overrides [`data_dir`]
//! - `PRICEGEAR_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

/// Application data root directory, home of the log files.
///
/// Resolves to `dirs::data_dir()/pricegear/` by default.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("PRICEGEAR_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("pricegear"))
        .unwrap_or_else(|| PathBuf::from("/tmp/pricegear-data"))
}

/// Application config directory.
///
/// Resolves to `dirs::config_dir()/pricegear/` by default.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("PRICEGEAR_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("pricegear"))
        .unwrap_or_else(|| PathBuf::from("/tmp/pricegear-config"))
}

/// Log file directory (`data_dir()/logs/`).
#[must_use]
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_is_nonempty() {
        assert!(!data_dir().as_os_str().is_empty());
    }

    #[test]
    fn config_dir_is_nonempty() {
        assert!(!config_dir().as_os_str().is_empty());
    }

    #[test]
    fn logs_dir_is_under_data_dir() {
        assert!(logs_dir().starts_with(data_dir()));
        assert!(logs_dir().ends_with("logs"));
    }

    #[test]
    fn config_file_is_toml_in_config_dir() {
        let file = config_file();
        assert!(file.starts_with(config_dir()));
        assert_eq!(file.extension().and_then(|e| e.to_str()), Some("toml"));
    }
}
