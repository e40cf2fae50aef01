//! Persistent user settings for cfscopy
//!
//! Settings are stored in a TOML configuration file at:
//! - Linux: `~/.config/cfscopy/cfscopy_config.toml`
//! - macOS: `~/Library/Application Support/cfscopy/cfscopy_config.toml`
//! - Windows: `%APPDATA%\cfscopy\cfscopy_config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! [copy]
//! block_size = "16K"
//! write_mode = "buffered"
//! retry_attempts = 3
//! retry_delay_secs = 10
//! verify = false
//!
//! [log]
//! directory = "."
//!
//! [notify]
//! enabled = true
//! smtp = "mail.example.com:25"
//! sender = "cfscopy@example.com"
//! recipients = ["storage-qa@example.com"]
//! ```

use crate::config::{WriteMode, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY_SECS};
use crate::error::{Error, Result};
use crate::notify::SmtpTarget;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration file name
const CONFIG_FILE_NAME: &str = "cfscopy_config.toml";

/// Application name for config directory
const APP_NAME: &str = "cfscopy";

/// Default block size string
const DEFAULT_BLOCK_SIZE_STR: &str = "16K";

/// User settings loaded from configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Copy settings
    pub copy: CopySettings,

    /// Run log settings
    pub log: LogSettings,

    /// E-mail notification settings
    pub notify: NotifySettings,
}

/// Settings for copy operations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CopySettings {
    /// Default block size (e.g., "16K", "1M")
    pub block_size: String,

    /// Default durable writer strategy
    pub write_mode: WriteMode,

    /// Attempts per operation
    pub retry_attempts: u32,

    /// Seconds between attempts
    pub retry_delay_secs: u64,

    /// Whether to verify copies by default
    pub verify: bool,
}

/// Settings for the run log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogSettings {
    /// Directory where timestamped run logs are created
    pub directory: PathBuf,
}

/// Settings for e-mail notification
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotifySettings {
    /// Whether to send a message when a run ends
    pub enabled: bool,

    /// SMTP relay as `host` or `host:port`
    pub smtp: String,

    /// Sender address
    pub sender: String,

    /// Recipient addresses
    pub recipients: Vec<String>,
}

impl Default for CopySettings {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE_STR.to_string(),
            write_mode: WriteMode::Buffered,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
            verify: false,
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
        }
    }
}

impl NotifySettings {
    /// Relay and addresses in the form the notifier takes
    pub fn smtp_target(&self) -> SmtpTarget {
        SmtpTarget {
            relay: self.smtp.clone(),
            sender: self.sender.clone(),
            recipients: self.recipients.clone(),
        }
    }
}

impl Settings {
    /// Load settings from the configuration file
    ///
    /// Returns default settings if the file doesn't exist or can't be parsed
    pub fn load() -> Self {
        Self::load_from_path(Self::config_path())
    }

    /// Load settings from a specific path
    pub fn load_from_path(path: Option<PathBuf>) -> Self {
        let Some(path) = path else {
            tracing::debug!("No config path available, using defaults");
            return Self::default();
        };

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(settings) => {
                    tracing::debug!("Loaded settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config file {:?}: {}", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config file {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Save settings to a specific path
    pub fn save_to_path(&self, path: Option<PathBuf>) -> std::result::Result<PathBuf, SettingsError> {
        let path = path.ok_or(SettingsError::NoConfigDir)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let contents = toml::to_string_pretty(self).map_err(SettingsError::Serialize)?;

        std::fs::write(&path, contents).map_err(|e| SettingsError::Io {
            path: path.clone(),
            source: e,
        })?;

        tracing::info!("Saved settings to {:?}", path);
        Ok(path)
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Option<PathBuf> {
        dirs_next::config_dir().map(|p| p.join(APP_NAME).join(CONFIG_FILE_NAME))
    }

    /// Block size in bytes from the `[copy]` section
    pub fn block_size_bytes(&self) -> Result<usize> {
        parse_size(&self.copy.block_size)
    }

    /// Generate a default configuration file content as a string
    pub fn default_config_string() -> String {
        let default = Self::default();
        toml::to_string_pretty(&default)
            .unwrap_or_else(|_| String::from("# Failed to generate default config"))
    }
}

/// Parse a size like "16K", "4M", "1G" or a plain byte count
pub fn parse_size(s: &str) -> Result<usize> {
    let s = s.trim().to_uppercase();
    let invalid = || Error::InvalidConfig(format!("invalid size '{}'", s));

    let (digits, multiplier) = match s.chars().last() {
        Some('K') => (&s[..s.len() - 1], 1024),
        Some('M') => (&s[..s.len() - 1], 1024 * 1024),
        Some('G') => (&s[..s.len() - 1], 1024 * 1024 * 1024),
        Some(c) if c.is_ascii_digit() => (s.as_str(), 1),
        _ => return Err(invalid()),
    };

    let value: usize = digits.trim().parse().map_err(|_| invalid())?;
    value.checked_mul(multiplier).ok_or_else(invalid)
}

/// Errors that can occur when working with settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// No configuration directory available
    #[error("Could not determine configuration directory")]
    NoConfigDir,

    /// Failed to read or write config file
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path that caused the error
        path: PathBuf,
        /// The underlying error
        source: std::io::Error,
    },

    /// Failed to serialize settings
    #[error("Failed to serialize settings: {0}")]
    Serialize(toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.copy.block_size, "16K");
        assert_eq!(settings.copy.write_mode, WriteMode::Buffered);
        assert_eq!(settings.copy.retry_attempts, 3);
        assert_eq!(settings.copy.retry_delay_secs, 10);
        assert!(!settings.copy.verify);
        assert_eq!(settings.log.directory, PathBuf::from("."));
        assert!(!settings.notify.enabled);
        assert!(settings.notify.recipients.is_empty());
    }

    #[test]
    fn test_settings_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("cfscopy_config.toml");

        let settings = Settings {
            copy: CopySettings {
                block_size: "1M".to_string(),
                write_mode: WriteMode::Sync,
                retry_attempts: 7,
                retry_delay_secs: 2,
                verify: true,
            },
            log: LogSettings {
                directory: PathBuf::from("/var/log/cfscopy"),
            },
            notify: NotifySettings {
                enabled: true,
                smtp: "relay:25".to_string(),
                sender: "a@example.com".to_string(),
                recipients: vec!["b@example.com".to_string()],
            },
        };

        settings.save_to_path(Some(config_path.clone())).unwrap();
        assert!(config_path.exists());

        let loaded = Settings::load_from_path(Some(config_path));
        assert_eq!(settings, loaded);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let settings =
            Settings::load_from_path(Some(PathBuf::from("/nonexistent/cfscopy_config.toml")));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_no_path() {
        assert_eq!(Settings::load_from_path(None), Settings::default());
    }

    #[test]
    fn test_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("cfscopy_config.toml");

        let partial_config = r#"
[copy]
write_mode = "sync"

[notify]
recipients = ["ops@example.com"]
"#;
        std::fs::write(&config_path, partial_config).unwrap();

        let settings = Settings::load_from_path(Some(config_path));

        assert_eq!(settings.copy.write_mode, WriteMode::Sync);
        assert_eq!(settings.notify.recipients, vec!["ops@example.com"]);
        // Unspecified values should use defaults
        assert_eq!(settings.copy.retry_attempts, 3);
        assert_eq!(settings.copy.block_size, "16K");
        assert!(!settings.notify.enabled);
    }

    #[test]
    fn test_load_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("cfscopy_config.toml");
        std::fs::write(&config_path, "this is not valid toml {{{{").unwrap();

        let settings = Settings::load_from_path(Some(config_path));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_to_none_path() {
        let result = Settings::default().save_to_path(None);
        assert!(matches!(result, Err(SettingsError::NoConfigDir)));
    }

    #[test]
    fn test_default_config_string() {
        let config_str = Settings::default_config_string();
        assert!(config_str.contains("[copy]"));
        assert!(config_str.contains("[log]"));
        assert!(config_str.contains("[notify]"));
        assert!(config_str.contains("write_mode = \"buffered\""));
    }

    #[test]
    fn test_config_path() {
        if let Some(p) = Settings::config_path() {
            assert!(p.to_string_lossy().contains("cfscopy"));
            assert!(p.to_string_lossy().ends_with("cfscopy_config.toml"));
        }
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("16K").unwrap(), 16 * 1024);
        assert_eq!(parse_size("4m").unwrap(), 4 * 1024 * 1024);
        assert_eq!(parse_size(" 1G ").unwrap(), 1024 * 1024 * 1024);
        assert_eq!(parse_size("8192").unwrap(), 8192);
        assert!(parse_size("").is_err());
        assert!(parse_size("K").is_err());
        assert!(parse_size("12Q").is_err());
        assert!(parse_size("-4K").is_err());
    }

    #[test]
    fn test_block_size_bytes() {
        let settings = Settings::default();
        assert_eq!(settings.block_size_bytes().unwrap(), 16 * 1024);
    }

    #[test]
    fn test_smtp_target() {
        let notify = NotifySettings {
            enabled: true,
            smtp: "relay".to_string(),
            sender: "s@example.com".to_string(),
            recipients: vec!["r@example.com".to_string()],
        };
        let target = notify.smtp_target();
        assert_eq!(target.relay, "relay");
        assert_eq!(target.recipients.len(), 1);
    }

    #[test]
    fn test_settings_error_display() {
        let err = SettingsError::NoConfigDir;
        assert!(err.to_string().contains("configuration directory"));

        let io_err = SettingsError::Io {
            path: PathBuf::from("/test/path"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(io_err.to_string().contains("/test/path"));
    }
}
