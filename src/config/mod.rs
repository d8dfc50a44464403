//! Configuration management for the RAC console
//!
//! This module handles:
//! - Loading and saving the TOML configuration file
//! - Managing the configuration directory
//! - Providing defaults for the gateway, reconnect policy, tunnel and clipboard
//! - Configuration validation

use crate::error::{ConfigError, ConfigResult};
use crate::logging::LogLevel;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.toml";

const DEFAULT_GATEWAY_HOST: &str = "localhost:9000";
const DEFAULT_INITIAL_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_STEADY_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_BACKOFF_STEP_MS: u64 = 500;
const DEFAULT_RECEIVE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CLIPBOARD_POLL_INTERVAL_MS: u64 = 500;
const MIN_CLIPBOARD_POLL_INTERVAL_MS: u64 = 50;
const DEFAULT_BRAND_TITLE: &str = "Remote Access";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Gateway the tunnel connects to
    pub gateway: GatewayConfig,

    /// Reconnection policy
    pub reconnect: ReconnectConfig,

    /// Tunnel transport settings
    pub tunnel: TunnelConfig,

    /// Clipboard synchronization
    pub clipboard: ClipboardConfig,

    /// Audio input forwarding
    pub audio: AudioConfig,

    /// Presentation settings
    pub ui: UiConfig,

    /// Default log level
    pub log_level: LogLevel,
}

/// Gateway configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Host (and optional port) serving `/ws/rac/`
    pub host: String,

    /// Use `wss` instead of `ws`
    pub secure: bool,
}

/// Reconnect policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Attempts allowed before the first successful connection
    pub initial_max_attempts: u32,

    /// Attempts allowed after a mid-session drop
    pub steady_max_attempts: u32,

    /// Linear backoff step in milliseconds
    pub backoff_step_ms: u64,
}

/// Tunnel configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunnelConfig {
    /// Idle receive timeout in seconds
    pub receive_timeout_secs: u64,
}

/// Clipboard configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipboardConfig {
    /// Enable clipboard synchronization
    pub enabled: bool,

    /// Local clipboard poll period in milliseconds
    pub poll_interval_ms: u64,
}

/// Audio configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Forward local audio input to the remote end
    pub input_enabled: bool,
}

/// UI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Title suffix shown after the endpoint name
    pub brand_title: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_GATEWAY_HOST.to_string(),
            secure: true,
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_max_attempts: DEFAULT_INITIAL_MAX_ATTEMPTS,
            steady_max_attempts: DEFAULT_STEADY_MAX_ATTEMPTS,
            backoff_step_ms: DEFAULT_BACKOFF_STEP_MS,
        }
    }
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            receive_timeout_secs: DEFAULT_RECEIVE_TIMEOUT_SECS,
        }
    }
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: DEFAULT_CLIPBOARD_POLL_INTERVAL_MS,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            brand_title: DEFAULT_BRAND_TITLE.to_string(),
        }
    }
}

impl Config {
    /// Validates configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.gateway.host.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "Gateway host must not be empty".to_string(),
            ));
        }

        if self.reconnect.initial_max_attempts == 0 || self.reconnect.steady_max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "Reconnect attempt limits must be at least 1".to_string(),
            ));
        }

        if self.reconnect.backoff_step_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "Backoff step must be greater than 0".to_string(),
            ));
        }

        if self.tunnel.receive_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "Tunnel receive timeout must be greater than 0".to_string(),
            ));
        }

        if self.clipboard.poll_interval_ms < MIN_CLIPBOARD_POLL_INTERVAL_MS {
            return Err(ConfigError::InvalidValue(format!(
                "Clipboard poll interval must be at least {} ms",
                MIN_CLIPBOARD_POLL_INTERVAL_MS
            )));
        }

        Ok(())
    }
}

/// Configuration manager
pub struct ConfigManager {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigManager {
    /// Creates a ConfigManager for the platform configuration directory
    ///
    /// # Errors
    ///
    /// Returns error if project directory cannot be determined
    pub fn new() -> ConfigResult<Self> {
        let config_dir = ProjectDirs::from("io", "rac-console", "RacConsole")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or_else(|| {
                ConfigError::DirectoryNotFound(
                    "Could not determine configuration directory".to_string(),
                )
            })?;

        Ok(Self::with_directory(config_dir))
    }

    /// Creates a ConfigManager rooted at an explicit directory
    pub fn with_directory(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        let config_file = config_dir.join(CONFIG_FILE_NAME);
        Self {
            config_dir,
            config_file,
        }
    }

    fn ensure_config_directory(&self) -> ConfigResult<()> {
        if !self.config_dir.exists() {
            fs::create_dir_all(&self.config_dir).map_err(|e| {
                ConfigError::DirectoryCreationFailed(format!(
                    "Failed to create config directory at {:?}: {}",
                    self.config_dir, e
                ))
            })?;
        }
        Ok(())
    }

    /// Loads configuration from file, or writes and returns the default
    ///
    /// # Errors
    ///
    /// Returns error if configuration cannot be loaded or created
    pub fn load_or_create_default(&self) -> ConfigResult<Config> {
        self.ensure_config_directory()?;

        if self.config_file.exists() {
            self.load()
        } else {
            let config = Config::default();
            self.save(&config)?;
            Ok(config)
        }
    }

    /// Loads and validates the configuration file
    pub fn load(&self) -> ConfigResult<Config> {
        let content = fs::read_to_string(&self.config_file).map_err(|e| {
            ConfigError::LoadFailed(format!("Failed to read config file: {}", e))
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            ConfigError::LoadFailed(format!("Failed to parse config file: {}", e))
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Saves configuration to file
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or cannot be written
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        self.ensure_config_directory()?;
        config.validate()?;

        let content = toml::to_string_pretty(config).map_err(|e| {
            ConfigError::SaveFailed(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(&self.config_file, content).map_err(|e| {
            ConfigError::SaveFailed(format!("Failed to write config file: {}", e))
        })?;

        Ok(())
    }

    /// Gets the configuration directory path
    pub fn config_directory(&self) -> &Path {
        &self.config_dir
    }

    /// Gets the configuration file path
    pub fn config_file(&self) -> &Path {
        &self.config_file
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.reconnect.initial_max_attempts, 5);
        assert_eq!(config.reconnect.steady_max_attempts, 5);
        assert_eq!(config.reconnect.backoff_step_ms, 500);
        assert_eq!(config.tunnel.receive_timeout_secs, 10);
        assert_eq!(config.clipboard.poll_interval_ms, 500);
        assert!(config.clipboard.enabled);
        assert!(!config.audio.input_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.reconnect.initial_max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.clipboard.poll_interval_ms = 10;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.gateway.host = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            log_level = "debug"

            [gateway]
            host = "rac.example.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.gateway.host, "rac.example.com");
        assert!(config.gateway.secure);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.reconnect, ReconnectConfig::default());
    }

    #[test]
    fn test_load_or_create_default_round_trip() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_directory(dir.path().join("rac"));

        let created = manager.load_or_create_default().unwrap();
        assert!(manager.config_file().exists());

        let mut changed = created.clone();
        changed.ui.brand_title = "Acme".to_string();
        manager.save(&changed).unwrap();

        assert_eq!(manager.load_or_create_default().unwrap(), changed);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_directory(dir.path());
        fs::write(
            manager.config_file(),
            "[reconnect]\nbackoff_step_ms = 0\n",
        )
        .unwrap();

        assert!(matches!(
            manager.load(),
            Err(ConfigError::InvalidValue(_))
        ));
    }
}
