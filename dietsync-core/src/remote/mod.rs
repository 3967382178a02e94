//! Remote store gateway.
//!
//! The remote side is a single-row-per-user document store that holds an
//! opaque diet state blob plus a server-assigned `updatedAt` timestamp. The
//! sync engine only needs two operations from it: read and upsert.

mod http;
mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use http::{check_server, HttpRemote};
pub use memory::MemoryRemote;

/// A user's document as held by the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDocument {
    /// Opaque diet-state-shaped blob.
    pub state: Value,
    /// Server-assigned modification time. Never generated by a client.
    pub updated_at: DateTime<Utc>,
}

/// Errors that can occur talking to the remote store.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Server returned status {0}")]
    Status(u16),

    #[error("Unauthorized: check the sync API key")]
    Unauthorized,

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Remote store unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            RemoteError::Decode(e.to_string())
        } else {
            RemoteError::Http(e.to_string())
        }
    }
}

#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    /// Fetches the user's document. `Ok(None)` when the user has never synced.
    async fn fetch(&self, user_id: &str) -> Result<Option<RemoteDocument>, RemoteError>;

    /// Creates or replaces the user's document. Idempotent per user.
    async fn upsert(&self, user_id: &str, state: &Value) -> Result<(), RemoteError>;
}
