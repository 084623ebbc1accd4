//! Config command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::output::{print_error, print_info, print_success};
use sb_core::config::{self, ClientConfig};

/// Resolve the effective configuration.
///
/// An explicit `--config` path must load. Otherwise the default file is
/// used when present, and defaults when not.
pub fn load_client_config(config_path: Option<&PathBuf>) -> Result<ClientConfig> {
    if let Some(path) = config_path {
        return config::load_config(path)
            .with_context(|| format!("Failed to load config from {:?}", path));
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        Ok(config::load_config(&default_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config from {:?}: {}", default_path, e);
            ClientConfig::default()
        }))
    } else {
        tracing::debug!("Using default configuration");
        Ok(ClientConfig::default())
    }
}

fn resolve_path(config_path: Option<&PathBuf>) -> PathBuf {
    config_path
        .cloned()
        .unwrap_or_else(config::default_config_path)
}

/// Show the effective configuration as TOML
pub fn config_show(config_path: Option<&PathBuf>) -> Result<()> {
    let path = resolve_path(config_path);
    let config = load_client_config(config_path)?;

    if path.exists() {
        print_info(&format!("Configuration file: {:?}", path));
    } else {
        print_info(&format!("No configuration file at {:?}, showing defaults", path));
    }
    println!();
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

/// Print the configuration file path
pub fn config_path(config_path: Option<&PathBuf>) {
    println!("{}", resolve_path(config_path).display());
}

/// Write the default configuration file
pub fn config_init(config_path: Option<&PathBuf>, force: bool) -> Result<()> {
    let path = resolve_path(config_path);

    if path.exists() && !force {
        print_error(&format!("Config file already exists: {:?}", path));
        print_info("Use --force to overwrite");
        return Ok(());
    }

    write_default(&path)?;
    print_success(&format!("Created configuration file: {:?}", path));
    Ok(())
}

fn write_default(path: &Path) -> Result<()> {
    config::save_config(path, &ClientConfig::default())
        .with_context(|| format!("Failed to write config file: {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(load_client_config(Some(&path)).is_err());
    }

    #[test]
    fn test_init_writes_loadable_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        config_init(Some(&path), false).unwrap();
        let loaded = load_client_config(Some(&path)).unwrap();
        assert_eq!(loaded.api_url, ClientConfig::default().api_url);
        assert_eq!(loaded.client_id, 1);
    }
}
