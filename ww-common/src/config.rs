//! Configuration loading
//!
//! Resolution priority for the data directory and config file:
//! 1. Environment variable (highest priority)
//! 2. TOML config file
//! 3. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// TOML configuration file shape (`~/.config/wordwatch/config.toml`)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Data directory holding the SQLite database
    pub data_dir: Option<String>,
    /// HTTP listen port for the prediction daemon
    pub port: Option<u16>,
    /// Per-request network timeout in seconds
    pub request_timeout_secs: Option<u64>,
    /// Delay between backfill requests in milliseconds
    pub backfill_delay_ms: Option<u64>,
    /// Relay proxy URL templates for the authoritative fallback ladder
    pub relay_urls: Option<Vec<String>>,
}

/// Resolve the data directory following env -> TOML -> default priority
pub fn resolve_data_dir(env_var_name: &str) -> PathBuf {
    if let Ok(path) = std::env::var(env_var_name) {
        return PathBuf::from(path);
    }

    if let Ok(config) = load_toml_config() {
        if let Some(dir) = config.data_dir {
            return PathBuf::from(dir);
        }
    }

    default_data_dir()
}

/// Load the TOML config file from the platform config directory
pub fn load_toml_config() -> Result<TomlConfig> {
    let path = config_file_path()?;
    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Platform config file path (`<config dir>/wordwatch/config.toml`)
fn config_file_path() -> Result<PathBuf> {
    let path = dirs::config_dir()
        .map(|d| d.join("wordwatch").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

    if path.exists() {
        Ok(path)
    } else {
        Err(Error::Config(format!(
            "Config file not found: {}",
            path.display()
        )))
    }
}

/// OS-dependent default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("wordwatch"))
        .unwrap_or_else(|| PathBuf::from("./wordwatch_data"))
}

/// Database file path inside the data directory
pub fn database_path(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join("wordwatch.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_var_wins() {
        std::env::set_var("WW_TEST_DATA_DIR", "/tmp/ww-test-data");
        let dir = resolve_data_dir("WW_TEST_DATA_DIR");
        assert_eq!(dir, PathBuf::from("/tmp/ww-test-data"));
        std::env::remove_var("WW_TEST_DATA_DIR");
    }

    #[test]
    fn falls_back_to_default_without_env() {
        std::env::remove_var("WW_TEST_DATA_DIR_MISSING");
        let dir = resolve_data_dir("WW_TEST_DATA_DIR_MISSING");
        assert!(dir.to_string_lossy().contains("wordwatch"));
    }

    #[test]
    fn toml_parses_all_fields() {
        let config: TomlConfig = toml::from_str(
            r#"
            data_dir = "/var/lib/wordwatch"
            port = 5731
            request_timeout_secs = 15
            backfill_delay_ms = 1500
            relay_urls = ["https://relay.example/fetch?url="]
            "#,
        )
        .unwrap();
        assert_eq!(config.data_dir.as_deref(), Some("/var/lib/wordwatch"));
        assert_eq!(config.port, Some(5731));
        assert_eq!(config.request_timeout_secs, Some(15));
        assert_eq!(config.backfill_delay_ms, Some(1500));
        assert_eq!(config.relay_urls.as_ref().unwrap().len(), 1);
    }
}
