//! Application configuration management.
//!
//! This module handles loading and saving the client configuration: backend
//! URL, request timeout, navigation targets, where the session is persisted
//! and the last email used to sign in.
//!
//! Configuration is stored at `~/.config/learnhub/config.json`.
//! `LEARNHUB_API_URL` and `LEARNHUB_STORAGE` override the file.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, ReqwestTransport};
use crate::auth::{
    FileStore, KeyValueStore, KeyringStore, MemoryStore, Navigator, SessionManager,
    SessionOptions, SessionStorage,
};

/// Application name used for config/storage directory paths
const APP_NAME: &str = "learnhub";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_API_URL: &str = "http://localhost:8000";

/// HTTP request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub const API_URL_ENV: &str = "LEARNHUB_API_URL";
pub const STORAGE_ENV: &str = "LEARNHUB_STORAGE";

/// Where the session tokens are kept between runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StorageBackend::File),
            "keyring" | "keychain" => Ok(StorageBackend::Keyring),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(anyhow::anyhow!("Unknown storage backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub timeout_secs: u64,
    pub landing_path: String,
    pub login_path: String,
    pub storage: StorageBackend,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let options = SessionOptions::default();
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            landing_path: options.landing_path,
            login_path: options.login_path,
            storage: StorageBackend::default(),
            last_email: None,
        }
    }
}

impl Config {
    /// Load the config file (defaults if absent), then apply environment overrides
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path).context("Failed to read config file")?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_overrides(
            std::env::var(API_URL_ENV).ok(),
            std::env::var(STORAGE_ENV).ok(),
        )?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn apply_overrides(&mut self, api_url: Option<String>, storage: Option<String>) -> Result<()> {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.api_url = url.trim().to_string();
        }
        if let Some(storage) = storage.filter(|s| !s.trim().is_empty()) {
            self.storage = storage.parse()?;
        }
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for the file-backed session store
    pub fn storage_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            landing_path: self.landing_path.clone(),
            login_path: self.login_path.clone(),
        }
    }

    pub fn session_storage(&self) -> Result<SessionStorage> {
        let store: Box<dyn KeyValueStore> = match self.storage {
            StorageBackend::File => Box::new(FileStore::new(self.storage_dir()?)),
            StorageBackend::Keyring => Box::new(KeyringStore::new()),
            StorageBackend::Memory => Box::new(MemoryStore::new()),
        };
        Ok(SessionStorage::new(store))
    }

    /// Build the shared client and the session that drives it
    pub fn connect(&self, navigator: Arc<dyn Navigator>) -> Result<SessionManager> {
        let transport = ReqwestTransport::new(self.timeout()).context("Failed to build HTTP client")?;
        let client = ApiClient::new(&self.api_url, Arc::new(transport));
        Ok(SessionManager::new(
            client,
            self.session_storage()?,
            navigator,
            self.session_options(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_url, "http://localhost:8000");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.landing_path, "/dashboard");
        assert_eq!(config.login_path, "/login");
        assert_eq!(config.storage, StorageBackend::File);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"api_url": "https://api.learnhub.dev", "storage": "keyring"}"#)
                .expect("Failed to parse config JSON");
        assert_eq!(config.api_url, "https://api.learnhub.dev");
        assert_eq!(config.storage, StorageBackend::Keyring);
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(Some(" https://staging.learnhub.dev ".to_string()), Some("Memory".to_string()))
            .unwrap();
        assert_eq!(config.api_url, "https://staging.learnhub.dev");
        assert_eq!(config.storage, StorageBackend::Memory);

        // Blank values are ignored
        config.apply_overrides(Some("".to_string()), Some(" ".to_string())).unwrap();
        assert_eq!(config.storage, StorageBackend::Memory);

        assert!(config.apply_overrides(None, Some("cloud".to_string())).is_err());
    }

    #[test]
    fn test_memory_storage_backend_builds() {
        let config = Config {
            storage: StorageBackend::Memory,
            ..Config::default()
        };
        let storage = config.session_storage().unwrap();
        assert!(storage.is_empty().unwrap());
    }
}
