//! Configuration management for MCP Switchboard

mod client;

pub use client::ClientConfig;

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mcp-switchboard")
}

/// Get the default configuration file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Get the default command history file path
pub fn default_history_path() -> PathBuf {
    default_config_dir().join("history.json")
}

/// Load configuration from a file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to a file
pub fn save_config<T: serde::Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConfigError::Invalid(format!("Failed to create config dir: {}", e)))?;
    }

    std::fs::write(path, content)
        .map_err(|e| ConfigError::Invalid(format!("Failed to write config: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_load_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        match load_config::<ClientConfig>(&path) {
            Err(ConfigError::NotFound(p)) => assert_eq!(p, path),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_save_then_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = ClientConfig {
            api_url: "http://10.0.0.5:8000".to_string(),
            dispatch_timeout: Duration::from_secs(5),
            ..ClientConfig::default()
        };
        save_config(&path, &config).unwrap();

        let loaded: ClientConfig = load_config(&path).unwrap();
        assert_eq!(loaded.api_url, "http://10.0.0.5:8000");
        assert_eq!(loaded.dispatch_timeout, Duration::from_secs(5));
        assert_eq!(loaded.history_capacity, config.history_capacity);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "client_id = 7\n").unwrap();

        let loaded: ClientConfig = load_config(&path).unwrap();
        assert_eq!(loaded.client_id, 7);
        assert_eq!(loaded.ws_url, ClientConfig::default().ws_url);
    }
}
