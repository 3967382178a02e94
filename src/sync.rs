//! Sync glue for one-shot CLI invocations.
//!
//! Every command builds a [`SyncEngine`] over the on-disk store. When
//! `auto_sync` is enabled the engine logs in (pull + reconcile) before the
//! command runs, and any push armed by the command is flushed before the
//! process exits instead of waiting for the debounce.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use dietsync_core::remote::{check_server, HttpRemote, RemoteDocument, RemoteError, RemoteStore};
use dietsync_core::sync::{LoginOutcome, PushOutcome, SyncSettings};
use dietsync_core::{DietSession, FileStore, SyncEngine, SystemClock};

use crate::config::{Config, SyncConfig};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub type Engine = SyncEngine<FileStore, CliRemote>;

/// The remote store as configured, or a placeholder that refuses every call.
pub enum CliRemote {
    Http(HttpRemote),
    Offline,
}

impl CliRemote {
    pub fn from_config(sync: &SyncConfig) -> Self {
        let (Some(url), Some(key)) = (&sync.server_url, &sync.api_key) else {
            return CliRemote::Offline;
        };
        let remote = HttpRemote::new(url.as_str(), key.as_str());
        match remote.clone().with_timeout(REQUEST_TIMEOUT) {
            Ok(remote) => CliRemote::Http(remote),
            Err(e) => {
                tracing::warn!("Failed to configure HTTP client timeout: {}", e);
                CliRemote::Http(remote)
            }
        }
    }
}

#[async_trait]
impl RemoteStore for CliRemote {
    async fn fetch(&self, user_id: &str) -> Result<Option<RemoteDocument>, RemoteError> {
        match self {
            CliRemote::Http(remote) => remote.fetch(user_id).await,
            CliRemote::Offline => Err(RemoteError::Unavailable("sync not configured".into())),
        }
    }

    async fn upsert(&self, user_id: &str, state: &Value) -> Result<(), RemoteError> {
        match self {
            CliRemote::Http(remote) => remote.upsert(user_id, state).await,
            CliRemote::Offline => Err(RemoteError::Unavailable("sync not configured".into())),
        }
    }
}

/// Opens the local store and wraps it in an engine.
pub fn open_engine(config: &Config) -> Engine {
    let store = FileStore::new(config.data_dir.value.clone());
    let session = DietSession::load(store, Arc::new(SystemClock));
    let settings = SyncSettings {
        push_debounce: config.sync.debounce(),
    };
    SyncEngine::new(session, CliRemote::from_config(&config.sync), settings)
}

/// Logs in if sync is configured and the server answers.
///
/// Returns `None` when nothing was attempted.
pub async fn connect(engine: &Engine, config: &Config) -> Option<LoginOutcome> {
    let url = config.sync.server_url.as_ref()?;
    if !config.sync.is_configured() {
        return None;
    }
    if !check_server(url).await {
        tracing::info!("Server {} unreachable, working offline", url);
        return None;
    }
    Some(engine.login(&config.user_id.value).await)
}

/// Pull before a command when auto-sync is enabled. Failures degrade to
/// offline operation.
pub async fn try_auto_pull(engine: &Engine, config: &Config) {
    if !config.sync.auto_sync {
        return;
    }
    match connect(engine, config).await {
        None => eprintln!("Auto-sync: server unreachable, skipping"),
        Some(LoginOutcome::FetchFailed) => eprintln!("Auto-sync: failed to fetch remote state"),
        Some(_) if engine.is_conflict_open() => {
            eprintln!("Auto-sync: local and remote diet state conflict.");
            eprintln!("  Changes stay local until you run: dietsync sync --resolve <remote|local>");
        }
        Some(_) => {}
    }
}

/// Sends whatever push the command armed.
pub async fn try_auto_push(engine: &Engine) {
    if engine.flush().await == PushOutcome::Failed {
        eprintln!("Auto-sync: push failed, changes will be sent next time");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigSource, ConfigValue};
    use tempfile::tempdir;

    fn config(data_dir: std::path::PathBuf, sync: SyncConfig) -> Config {
        Config {
            data_dir: ConfigValue::new(data_dir, ConfigSource::Default),
            user_id: ConfigValue::new("ana".to_string(), ConfigSource::Default),
            config_file: None,
            sync,
        }
    }

    #[tokio::test]
    async fn test_offline_remote_refuses_calls() {
        let remote = CliRemote::from_config(&SyncConfig::default());
        assert!(matches!(remote, CliRemote::Offline));
        assert!(remote.fetch("ana").await.is_err());
    }

    #[tokio::test]
    async fn test_unconfigured_sync_does_not_connect() {
        let dir = tempdir().unwrap();
        let config = config(dir.path().to_path_buf(), SyncConfig::default());
        let engine = open_engine(&config);
        assert!(connect(&engine, &config).await.is_none());
        assert!(engine.user_id().is_none());
    }

    #[tokio::test]
    async fn test_offline_edits_are_persisted() {
        let dir = tempdir().unwrap();
        let config = config(dir.path().to_path_buf(), SyncConfig::default());

        let engine = open_engine(&config);
        assert!(engine.rename_diet("diet-2", "Cutting"));
        try_auto_push(&engine).await;

        let reopened = open_engine(&config);
        assert_eq!(reopened.snapshot().diets()[1].name, "Cutting");
        assert!(reopened.metadata().has_unsynced_changes());
    }
}
