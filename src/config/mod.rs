//! Settings management for Stratum

pub mod schema;

pub use schema::{CacheConfig, LogFormat, LoggingConfig, Settings};

use crate::error::{StratumError, StratumResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Settings file manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stratum")
            .join("config.toml")
    }

    /// Load settings, using defaults if the file does not exist
    pub async fn load(&self) -> StratumResult<Settings> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Settings::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load settings from a specific file
    pub async fn load_from_file(&self, path: &Path) -> StratumResult<Settings> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| StratumError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| StratumError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save settings to file
    pub async fn save(&self, settings: &Settings) -> StratumResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                StratumError::io(format!("creating config directory {}", parent.display()), e)
            })?;
        }

        let content = toml::to_string_pretty(settings)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            StratumError::io(format!("writing config to {}", self.config_path.display()), e)
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::HasherKind;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_default_when_missing() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp.path().join("nonexistent.toml"));

        let settings = manager.load().await.unwrap();
        assert!(settings.cache.enabled);
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp.path().join("nested/config.toml"));

        let mut settings = Settings::default();
        settings.cache.hasher = HasherKind::Full;
        settings.cache.concurrent_hashing = true;

        manager.save(&settings).await.unwrap();
        let loaded = manager.load().await.unwrap();

        assert_eq!(loaded.cache.hasher, HasherKind::Full);
        assert!(loaded.cache.concurrent_hashing);
    }

    #[tokio::test]
    async fn invalid_file_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[cache]\nenabled = \"sometimes\"\n").unwrap();

        let err = ConfigManager::with_path(path.clone()).load().await.unwrap_err();
        match err {
            StratumError::ConfigInvalid { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("unexpected error: {other}"),
        }
    }
}
