//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the API base URL, the storage backend for the session
//! mirror, and the last email used to log in.
//!
//! Configuration is stored at `~/.config/crewznation/config.json`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::client::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::storage::{FileStore, KeyValueStore, KeyringStore};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "crewznation";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variables checked for the API base URL, in order
pub const API_URL_ENV_VARS: [&str; 2] = ["CREWZ_API_URL", "EXPO_PUBLIC_BACKEND_URL"];

/// Where the session mirror is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_url: Option<String>,
    #[serde(default)]
    pub storage: StorageBackend,
    pub request_timeout_secs: Option<u64>,
    pub last_email: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
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

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// API base URL from the environment, falling back to the config file
    pub fn api_url(&self) -> Result<String> {
        self.resolve_api_url(url_from_env(|var| std::env::var(var).ok()))
    }

    fn resolve_api_url(&self, from_env: Option<String>) -> Result<String> {
        from_env
            .into_iter()
            .chain(self.api_url.clone())
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .find(|url| !url.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No API URL configured. Set {} or api_url in the config file",
                    API_URL_ENV_VARS[0]
                )
            })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    /// Open the configured storage backend
    pub fn open_storage(&self) -> Result<Arc<dyn KeyValueStore>> {
        let storage: Arc<dyn KeyValueStore> = match self.storage {
            StorageBackend::File => Arc::new(FileStore::new(self.cache_dir()?)),
            StorageBackend::Keyring => Arc::new(KeyringStore::default()),
        };
        Ok(storage)
    }
}

/// First non-blank value among `API_URL_ENV_VARS`
fn url_from_env(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    API_URL_ENV_VARS
        .iter()
        .find_map(|var| lookup(*var).filter(|value| !value.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_url_wins_over_file() {
        let config = Config {
            api_url: Some("https://file.example".to_string()),
            ..Default::default()
        };
        let url = config
            .resolve_api_url(Some("https://env.example/".to_string()))
            .unwrap();
        assert_eq!(url, "https://env.example");
    }

    #[test]
    fn test_file_url_used_when_env_blank() {
        let config = Config {
            api_url: Some("https://file.example//".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_api_url(Some("  ".to_string())).unwrap(),
            "https://file.example"
        );
    }

    #[test]
    fn test_blank_env_var_falls_through_to_next() {
        let url = url_from_env(|var| match var {
            "CREWZ_API_URL" => Some(String::new()),
            "EXPO_PUBLIC_BACKEND_URL" => Some("https://expo.example".to_string()),
            _ => None,
        });
        assert_eq!(url.as_deref(), Some("https://expo.example"));

        assert_eq!(url_from_env(|_| Some(" ".to_string())), None);
    }

    #[test]
    fn test_missing_url_is_an_error() {
        let err = Config::default().resolve_api_url(None).unwrap_err();
        assert!(err.to_string().contains("CREWZ_API_URL"));
    }

    #[test]
    fn test_defaults_and_storage_backend_names() {
        let config: Config = serde_json::from_str(r#"{"storage":"keyring"}"#).unwrap();
        assert_eq!(config.storage, StorageBackend::Keyring);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));

        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.storage, StorageBackend::File);
    }
}
