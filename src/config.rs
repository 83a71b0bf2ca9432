//! Tool configuration
//!
//! Handles loading and managing configuration from config.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::disc::TrackSelector;

/// Global application config
static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Get the global application config
pub fn get_config() -> &'static AppConfig {
    APP_CONFIG.get_or_init(AppConfig::load)
}

/// Root application configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub stream: StreamConfig,
}

/// Stream defaults
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StreamConfig {
    /// Track opened when none is given on the command line
    #[serde(default)]
    pub default_track: TrackSelector,
    /// Buffer size used when copying a track out
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_chunk_size() -> usize {
    64 * 1024
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            default_track: TrackSelector::default(),
            chunk_size: default_chunk_size(),
        }
    }
}

impl AppConfig {
    /// Load configuration from config.json
    pub fn load() -> Self {
        // Try to load from current directory first
        if let Ok(config) = Self::load_from_path("config.json") {
            log::info!("Loaded config from ./config.json");
            return config;
        }

        // Try to load from executable directory
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let config_path = exe_dir.join("config.json");
                if let Ok(config) = Self::load_from_path(&config_path) {
                    log::info!("Loaded config from {}", config_path.display());
                    return config;
                }
            }
        }

        log::info!("No config.json found, using defaults");
        Self::default()
    }

    pub fn load_from_path(path: impl Into<PathBuf>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.into();
        let content = fs::read_to_string(&path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.stream.default_track, TrackSelector::Primary);
        assert_eq!(config.stream.chunk_size, 65536);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "stream": { "default_track": "first-data" } }"#).unwrap();
        assert_eq!(config.stream.default_track, TrackSelector::FirstData);
        assert_eq!(config.stream.chunk_size, 65536);

        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(br#"{ "stream": { "default_track": "2", "chunk_size": 4096 } }"#)
            .unwrap();
        file.flush().unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.stream.default_track, TrackSelector::Number(2));
        assert_eq!(config.stream.chunk_size, 4096);
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let result: Result<AppConfig, _> =
            serde_json::from_str(r#"{ "stream": { "default_track": "0" } }"#);
        assert!(result.is_err());
    }
}
