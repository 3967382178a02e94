use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use dietsync_core::sync::DEFAULT_PUSH_DEBOUNCE;

const ENV_DATA_DIR: &str = "DIETSYNC_DATA_DIR";
const ENV_USER_ID: &str = "DIETSYNC_USER_ID";
const ENV_SYNC_URL: &str = "DIETSYNC_SYNC_URL";
const ENV_SYNC_API_KEY: &str = "DIETSYNC_SYNC_API_KEY";
const ENV_SYNC_DEBOUNCE_MS: &str = "DIETSYNC_SYNC_DEBOUNCE_MS";

/// Where a setting was taken from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// The `sync:` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SyncConfig {
    pub server_url: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Pull before and push after every command
    #[serde(default)]
    pub auto_sync: bool,
    /// Quiet period after the last edit before a push, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u64>,
}

impl SyncConfig {
    /// Both a server URL and an API key are needed to talk to the remote.
    pub fn is_configured(&self) -> bool {
        self.server_url.is_some() && self.api_key.is_some()
    }

    pub fn debounce(&self) -> Duration {
        self.debounce_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_PUSH_DEBOUNCE)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Holds diet-state.json and diet-state-meta.json
    pub data_dir: ConfigValue<PathBuf>,
    /// Remote document this device syncs with
    pub user_id: ConfigValue<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    pub sync: SyncConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    user_id: Option<String>,
    sync: Option<SyncConfig>,
}

impl Config {
    /// Environment variables win over the config file, which wins over defaults.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::load_with_env(config_path, |key| std::env::var(key).ok())
    }

    fn load_with_env(
        config_path: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self {
            data_dir: ConfigValue::new(Self::default_data_dir(), ConfigSource::Default),
            user_id: ConfigValue::new("default".to_string(), ConfigSource::Default),
            config_file: None,
            sync: SyncConfig::default(),
        };

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            config.merge_file(path)?;
        }
        config.apply_env(env);
        Ok(config)
    }

    fn merge_file(&mut self, path: PathBuf) -> Result<(), ConfigError> {
        let contents =
            std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError(path.clone(), e))?;
        let file: ConfigFile = serde_yaml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

        if let Some(dir) = file.data_dir {
            let dir = match path.parent() {
                Some(base) if dir.is_relative() => base.join(dir),
                _ => dir,
            };
            self.data_dir = ConfigValue::new(dir, ConfigSource::File);
        }
        if let Some(user) = file.user_id {
            self.user_id = ConfigValue::new(user, ConfigSource::File);
        }
        if let Some(sync) = file.sync {
            self.sync = sync;
        }
        self.config_file = Some(path);
        Ok(())
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = env(ENV_DATA_DIR) {
            self.data_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Some(user) = env(ENV_USER_ID) {
            self.user_id = ConfigValue::new(user, ConfigSource::Environment);
        }
        if let Some(url) = env(ENV_SYNC_URL) {
            self.sync.server_url = Some(url);
        }
        if let Some(key) = env(ENV_SYNC_API_KEY) {
            self.sync.api_key = Some(key);
        }
        if let Some(raw) = env(ENV_SYNC_DEBOUNCE_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.sync.debounce_ms = Some(ms),
                Err(_) => {
                    tracing::warn!("Ignoring {}={:?}: not a number", ENV_SYNC_DEBOUNCE_MS, raw)
                }
            }
        }
    }

    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dietsync")
    }

    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dietsync")
    }

    /// `<config dir>/dietsync/config.yaml`
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {}", .0.display(), .1)]
    ReadError(PathBuf, std::io::Error),
    #[error("Failed to parse config file '{}': {}", .0.display(), .1)]
    ParseError(PathBuf, serde_yaml::Error),
}
