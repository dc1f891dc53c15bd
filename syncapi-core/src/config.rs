//! Configuration management for syncapi
//!
//! Config files are stored in platform-appropriate locations:
//! - Linux: ~/.config/syncapi/
//! - macOS: ~/Library/Application Support/syncapi/
//! - Windows: %APPDATA%\syncapi\
//!
//! `SYNCAPI_HOST`, `SYNCAPI_PORT`, `SYNCAPI_USERNAME` and `SYNCAPI_PASSWORD`
//! override the file when set.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Config directory not found")]
    NoDirFound,

    #[error("Invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("Invalid daemon address: {0}")]
    InvalidAddress(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Daemon connection settings
    #[serde(default)]
    pub daemon: DaemonConfig,
}

/// Which of the daemon's two HTTP APIs to authenticate against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiVariant {
    /// `/api/v2` token API
    #[default]
    V2,
    /// `/gui` session-cookie API
    Legacy,
}

/// Daemon connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Basic auth username, applied to every request
    pub username: Option<String>,

    /// Basic auth password (only sent alongside a username)
    pub password: Option<String>,

    /// Pre-supplied GUID; skips the legacy identity request
    pub identity: Option<String>,

    /// Pre-supplied token; skips the legacy token request
    pub token: Option<String>,

    #[serde(default)]
    pub api: ApiVariant,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_host() -> String {
    crate::DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    crate::DEFAULT_PORT
}
fn default_timeout() -> u64 {
    30
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: None,
            password: None,
            identity: None,
            token: None,
            api: ApiVariant::default(),
            timeout_secs: default_timeout(),
        }
    }
}

impl DaemonConfig {
    /// Root URL of the daemon, e.g. `http://localhost:8888/`
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let raw = format!("http://{}:{}/", self.host, self.port);
        Url::parse(&raw).map_err(|e| ConfigError::InvalidAddress(format!("{raw}: {e}")))
    }
}

impl Config {
    /// Get config directory path
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|p| p.join("syncapi"))
            .ok_or(ConfigError::NoDirFound)
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from default location
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load config from specific path
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to default location
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    /// Save config to specific path
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `SYNCAPI_*` environment overrides
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(host) = lookup("SYNCAPI_HOST") {
            self.daemon.host = host;
        }
        if let Some(port) = lookup("SYNCAPI_PORT") {
            self.daemon.port = port.parse().map_err(|_| ConfigError::InvalidEnv {
                var: "SYNCAPI_PORT",
                value: port.clone(),
            })?;
        }
        if let Some(username) = lookup("SYNCAPI_USERNAME") {
            self.daemon.username = Some(username);
        }
        if let Some(password) = lookup("SYNCAPI_PASSWORD") {
            self.daemon.password = Some(password);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.daemon.host, "localhost");
        assert_eq!(config.daemon.port, crate::DEFAULT_PORT);
        assert_eq!(config.daemon.api, ApiVariant::V2);
        assert!(config.daemon.username.is_none());
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.daemon.api = ApiVariant::Legacy;
        config.daemon.username = Some("admin".to_string());

        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[daemon]"));
        assert!(toml.contains("api = \"legacy\""));

        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.daemon.api, ApiVariant::Legacy);
        assert_eq!(parsed.daemon.username.as_deref(), Some("admin"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: Config = toml::from_str("[daemon]\nport = 9999\n").unwrap();
        assert_eq!(parsed.daemon.port, 9999);
        assert_eq!(parsed.daemon.host, "localhost");
        assert_eq!(parsed.daemon.timeout_secs, 30);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("SYNCAPI_HOST", "192.0.2.10"),
            ("SYNCAPI_PORT", "9999"),
            ("SYNCAPI_USERNAME", "admin"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|var| env.get(var).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.daemon.host, "192.0.2.10");
        assert_eq!(config.daemon.port, 9999);
        assert_eq!(config.daemon.username.as_deref(), Some("admin"));
        assert!(config.daemon.password.is_none());
    }

    #[test]
    fn test_invalid_port_override() {
        let mut config = Config::default();
        let result = config.apply_overrides(|var| {
            (var == "SYNCAPI_PORT").then(|| "not-a-port".to_string())
        });
        assert!(matches!(result, Err(ConfigError::InvalidEnv { var: "SYNCAPI_PORT", .. })));
    }

    #[test]
    fn test_base_url() {
        let config = DaemonConfig::default();
        assert_eq!(config.base_url().unwrap().as_str(), "http://localhost:8888/");
    }
}
