//! Durable local persistence for the diet state and its sync metadata.
//!
//! Two fixed keys are stored:
//! - `diet-state`: the [`DietState`](crate::models::DietState) document
//! - `diet-state-meta`: the [`SyncMetadata`](crate::meta::SyncMetadata) document
//!
//! Loading fails soft (missing or malformed documents yield `None`) and saving
//! is best-effort: errors are logged and swallowed.

mod file;
mod memory;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Documents that can be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    DietState,
    SyncMeta,
}

impl StoreKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::DietState => "diet-state",
            StoreKey::SyncMeta => "diet-state-meta",
        }
    }

    /// Returns the filename used by file-backed stores.
    pub fn filename(&self) -> &'static str {
        match self {
            StoreKey::DietState => "diet-state.json",
            StoreKey::SyncMeta => "diet-state-meta.json",
        }
    }
}

impl std::fmt::Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur reading or writing raw documents.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error for {0}: {1}")]
    Io(PathBuf, #[source] io::Error),

    #[error("Failed to encode {0}: {1}")]
    Encode(StoreKey, #[source] serde_json::Error),
}

/// A key-value facility holding serialized documents.
pub trait LocalStore: Send + 'static {
    /// Reads the raw document. `Ok(None)` when nothing is stored under `key`.
    fn read(&self, key: StoreKey) -> Result<Option<String>, StoreError>;

    fn write(&self, key: StoreKey, contents: &str) -> Result<(), StoreError>;

    /// Loads and decodes a document. Missing, unreadable or malformed
    /// documents all yield `None`.
    fn load<T: DeserializeOwned>(&self, key: StoreKey) -> Option<T>
    where
        Self: Sized,
    {
        let raw = match self.read(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring malformed {} document: {}", key, e);
                None
            }
        }
    }

    /// Encodes and writes a document. Failures are logged, never returned.
    fn save<T: Serialize>(&self, key: StoreKey, value: &T)
    where
        Self: Sized,
    {
        let result = serde_json::to_string(value)
            .map_err(|e| StoreError::Encode(key, e))
            .and_then(|json| self.write(key, &json));

        if let Err(e) = result {
            tracing::warn!("Failed to persist {}: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_key_names() {
        assert_eq!(StoreKey::DietState.as_str(), "diet-state");
        assert_eq!(StoreKey::SyncMeta.as_str(), "diet-state-meta");
        assert_eq!(StoreKey::SyncMeta.filename(), "diet-state-meta.json");
    }

    #[test]
    fn test_load_malformed_json_returns_none() {
        let store = MemoryStore::new();
        store.write(StoreKey::SyncMeta, "{not json").unwrap();
        let loaded: Option<crate::meta::SyncMetadata> = store.load(StoreKey::SyncMeta);
        assert!(loaded.is_none());
    }

    #[test]
    fn test_save_then_load() {
        let store = MemoryStore::new();
        let meta = crate::meta::SyncMetadata::new(42);
        store.save(StoreKey::SyncMeta, &meta);
        let loaded: Option<crate::meta::SyncMetadata> = store.load(StoreKey::SyncMeta);
        assert_eq!(loaded, Some(meta));
    }
}
