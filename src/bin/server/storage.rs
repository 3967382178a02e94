//! Server-side diet state storage.
//!
//! One JSON document per user:
//! ```text
//! <DATA_DIR>/
//!   <user_id>.json    {"state": {...}, "updatedAt": "..."}
//! ```
//!
//! The server owns `updatedAt`. Every save assigns a timestamp strictly
//! greater than the previous one for that user.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

use dietsync_core::RemoteDocument;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error for {}: {}", .0.display(), .1)]
    Io(PathBuf, io::Error),

    #[error("Corrupt document {}: {}", .0.display(), .1)]
    Corrupt(PathBuf, serde_json::Error),

    #[error("Invalid user ID: {0}")]
    InvalidUserId(String),
}

#[derive(Debug)]
pub struct DocumentStore {
    data_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl DocumentStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Validates a user ID to prevent path traversal attacks.
    fn validate_user_id(user_id: &str) -> Result<(), StorageError> {
        if user_id.is_empty()
            || user_id.contains('/')
            || user_id.contains('\\')
            || user_id.contains("..")
            || user_id.starts_with('.')
        {
            return Err(StorageError::InvalidUserId(user_id.to_string()));
        }
        Ok(())
    }

    fn doc_path(&self, user_id: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", user_id))
    }

    /// Loads a user's document. `Ok(None)` if the user never pushed.
    pub fn load(&self, user_id: &str) -> Result<Option<RemoteDocument>, StorageError> {
        Self::validate_user_id(user_id)?;
        let path = self.doc_path(user_id);

        match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map(Some)
                .map_err(|e| StorageError::Corrupt(path, e)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(path, e)),
        }
    }

    /// Replaces a user's document and returns it with its new timestamp.
    pub fn save(&self, user_id: &str, state: Value) -> Result<RemoteDocument, StorageError> {
        Self::validate_user_id(user_id)?;
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let previous = match self.load(user_id) {
            Ok(doc) => doc,
            Err(StorageError::Corrupt(path, e)) => {
                tracing::warn!("Overwriting corrupt document {}: {}", path.display(), e);
                None
            }
            Err(e) => return Err(e),
        };

        let document = RemoteDocument {
            state,
            updated_at: next_timestamp(previous.map(|doc| doc.updated_at)),
        };

        fs::create_dir_all(&self.data_dir)
            .map_err(|e| StorageError::Io(self.data_dir.clone(), e))?;

        let path = self.doc_path(user_id);
        let temp_path = path.with_extension("json.tmp");
        let bytes =
            serde_json::to_vec(&document).map_err(|e| StorageError::Corrupt(path.clone(), e))?;
        fs::write(&temp_path, bytes).map_err(|e| StorageError::Io(temp_path.clone(), e))?;
        fs::rename(&temp_path, &path).map_err(|e| StorageError::Io(path, e))?;

        Ok(document)
    }
}

/// Current time at millisecond precision, strictly after `previous`.
fn next_timestamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    let now = DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now);
    match previous {
        Some(prev) if prev >= now => prev + Duration::milliseconds(1),
        _ => now,
    }
}
