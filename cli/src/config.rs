//! Daemon and operator configuration, read from TOML

use anyhow::{Context, Result};
use kirbec_ledger::PresenceSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "$HOME/.kirbec/config.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub presence: PresenceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sled,
    /// Nothing survives a restart
    Memory,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: Backend,
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Sled,
            path: "$HOME/.kirbec/data".to_string(),
        }
    }
}

impl StorageConfig {
    pub fn resolved_path(&self) -> PathBuf {
        PathBuf::from(expand_path(&self.path))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PresenceConfig {
    pub interval_secs: u64,
    pub points_per_tick: u64,
    pub day_rollover_hours: i64,
    /// Voice snapshot written by the gateway adapter
    pub snapshot_path: String,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        let settings = PresenceSettings::default();
        Self {
            interval_secs: 60,
            points_per_tick: settings.points_per_tick,
            day_rollover_hours: settings.day_rollover_hours,
            snapshot_path: "$HOME/.kirbec/voice.json".to_string(),
        }
    }
}

impl PresenceConfig {
    pub fn settings(&self) -> PresenceSettings {
        PresenceSettings {
            points_per_tick: self.points_per_tick,
            day_rollover_hours: self.day_rollover_hours,
        }
    }

    /// Sampling period, never shorter than one second
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn resolved_snapshot_path(&self) -> PathBuf {
        PathBuf::from(expand_path(&self.snapshot_path))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

pub fn expand_path(path: &str) -> String {
    path.replace("$HOME", &std::env::var("HOME").unwrap_or_default())
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from(expand_path(DEFAULT_CONFIG_PATH))
}

pub fn load_config(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("Invalid config {}", path.display()))
}

pub fn parse_config(contents: &str) -> Result<Config> {
    Ok(toml::from_str(contents)?)
}

/// Load `path`, or defaults if the file does not exist. The second value is
/// set when defaults were used.
pub fn load_or_default(path: &Path) -> Result<(Config, bool)> {
    if !path.exists() {
        return Ok((Config::default(), true));
    }
    Ok((load_config(path)?, false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.presence.interval(), Duration::from_secs(60));
        assert_eq!(config.presence.settings(), PresenceSettings::default());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_sections() {
        let config = parse_config(
            r#"
            [storage]
            backend = "memory"

            [presence]
            points_per_tick = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.backend, Backend::Memory);
        assert_eq!(config.storage.path, StorageConfig::default().path);
        assert_eq!(config.presence.points_per_tick, 3);
        assert_eq!(config.presence.day_rollover_hours, 6);
    }

    #[test]
    fn test_example_config_matches_defaults() {
        let config = parse_config(include_str!("../config.example.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_unknown_backend_rejected() {
        assert!(parse_config("[storage]\nbackend = \"postgres\"").is_err());
    }

    #[test]
    fn test_zero_interval_clamped() {
        let config = parse_config("[presence]\ninterval_secs = 0").unwrap();
        assert_eq!(config.presence.interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let (config, defaulted) = load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert!(defaulted);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[logging]\nlevel = \"debug\"\n").unwrap();

        let (config, defaulted) = load_or_default(&path).unwrap();
        assert!(!defaulted);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_expand_home() {
        let home = std::env::var("HOME").unwrap_or_default();
        assert_eq!(expand_path("$HOME/x"), format!("{}/x", home));
        assert_eq!(expand_path("/abs/path"), "/abs/path");
    }
}
