//! Pipeline configuration for ww-pd
//!
//! Compiled defaults overlaid with the shared TOML config file and
//! environment variables (env wins, matching the common resolution order).

use std::time::Duration;
use tracing::warn;
use ww_common::config::TomlConfig;

pub const DEFAULT_PORT: u16 = 5731;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_BACKFILL_DELAY_MS: u64 = 1500;

/// Resolved pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub port: u16,
    pub request_timeout: Duration,
    pub backfill_delay: Duration,
    /// Relay URL templates for the authoritative fallback ladder, tried in
    /// order after the direct rung. `{url}` is replaced with the feed URL.
    pub relay_urls: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            backfill_delay: Duration::from_millis(DEFAULT_BACKFILL_DELAY_MS),
            relay_urls: vec![
                "https://r.jina.ai/{url}".to_string(),
                "https://api.allorigins.win/raw?url={url}".to_string(),
            ],
        }
    }
}

impl PipelineConfig {
    /// Defaults, overlaid with the TOML file (if present), overlaid with env
    pub fn resolve() -> Self {
        let mut config = Self::default();

        match ww_common::config::load_toml_config() {
            Ok(toml) => config.apply_toml(&toml),
            Err(e) => warn!("No TOML config applied: {}", e),
        }
        config.apply_env();
        config
    }

    fn apply_toml(&mut self, toml: &TomlConfig) {
        if let Some(port) = toml.port {
            self.port = port;
        }
        if let Some(secs) = toml.request_timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = toml.backfill_delay_ms {
            self.backfill_delay = Duration::from_millis(ms);
        }
        if let Some(urls) = &toml.relay_urls {
            self.relay_urls = urls.clone();
        }
    }

    fn apply_env(&mut self) {
        if let Ok(port) = std::env::var("WORDWATCH_PORT") {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(_) => warn!("Ignoring non-numeric WORDWATCH_PORT={:?}", port),
            }
        }
        if let Ok(secs) = std::env::var("WORDWATCH_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                self.request_timeout = Duration::from_secs(secs);
            }
        }
    }
}
