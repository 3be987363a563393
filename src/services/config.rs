//! Persisted application configuration.
//!
//! TOML under the platform config directory; missing or invalid files
//! fall back to defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::availability::ProberConfig;
use crate::error::{IptvError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sources: SourceSettings,
    pub prober: ProberSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub fetch_timeout_secs: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProberSettings {
    pub max_concurrent: u32,
    pub check_timeout_secs: u64,
    pub startup_debounce_ms: u64,
    pub user_agent: String,
}

impl Default for ProberSettings {
    fn default() -> Self {
        let defaults = ProberConfig::default();
        Self {
            max_concurrent: defaults.max_concurrent,
            check_timeout_secs: defaults.check_timeout.as_secs(),
            startup_debounce_ms: defaults.startup_debounce.as_millis() as u64,
            user_agent: defaults.user_agent,
        }
    }
}

impl ProberSettings {
    pub fn to_prober_config(&self) -> ProberConfig {
        ProberConfig {
            max_concurrent: self.max_concurrent,
            check_timeout: Duration::from_secs(self.check_timeout_secs),
            startup_debounce: Duration::from_millis(self.startup_debounce_ms),
            user_agent: self.user_agent.clone(),
        }
    }
}

pub struct ConfigService {
    config: AppConfig,
    path: PathBuf,
}

impl ConfigService {
    pub fn new() -> Self {
        Self::with_path(default_config_path())
    }

    /// Load from an explicit path; a missing or unreadable file yields
    /// defaults.
    pub fn with_path(path: PathBuf) -> Self {
        let config = match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!(
                        "Invalid config at {}: {}; using defaults",
                        path.display(),
                        e
                    );
                    AppConfig::default()
                }
            },
            Err(_) => AppConfig::default(),
        };
        Self { config, path }
    }

    pub fn get(&self) -> AppConfig {
        self.config.clone()
    }

    /// Replace the configuration and persist it.
    pub fn update(&mut self, config: AppConfig) -> Result<()> {
        let contents = toml::to_string_pretty(&config)
            .map_err(|e| IptvError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                IptvError::ConfigError(format!("Failed to create config dir: {}", e))
            })?;
        }
        std::fs::write(&self.path, contents)
            .map_err(|e| IptvError::ConfigError(format!("Failed to write config: {}", e)))?;

        self.config = config;
        Ok(())
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|p| p.join("iptv-core").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from(".iptv-core/config.toml"))
}
