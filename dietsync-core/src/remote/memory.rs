use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{RemoteDocument, RemoteError, RemoteStore};
use crate::clock::{Clock, SystemClock};

#[derive(Default)]
struct Inner {
    docs: HashMap<String, RemoteDocument>,
    upserts: Vec<(String, Value)>,
    fetches: usize,
    fail_fetch: bool,
    fail_upsert: bool,
}

/// In-process remote store. Assigns `updated_at` from its own clock, the way
/// a real server would. Clones share the same documents.
#[derive(Clone)]
pub struct MemoryRemote {
    inner: Arc<Mutex<Inner>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl MemoryRemote {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seeds a document with an explicit server timestamp.
    pub fn insert(&self, user_id: &str, state: Value, updated_at: DateTime<Utc>) {
        self.lock()
            .docs
            .insert(user_id.to_string(), RemoteDocument { state, updated_at });
    }

    pub fn document(&self, user_id: &str) -> Option<RemoteDocument> {
        self.lock().docs.get(user_id).cloned()
    }

    /// Every upsert received, in order.
    pub fn upserts(&self) -> Vec<(String, Value)> {
        self.lock().upserts.clone()
    }

    pub fn upsert_count(&self) -> usize {
        self.lock().upserts.len()
    }

    pub fn fetch_count(&self) -> usize {
        self.lock().fetches
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.lock().fail_fetch = fail;
    }

    pub fn set_fail_upsert(&self, fail: bool) {
        self.lock().fail_upsert = fail;
    }

    fn server_time(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.clock.now_ms()).unwrap_or_else(Utc::now)
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn fetch(&self, user_id: &str) -> Result<Option<RemoteDocument>, RemoteError> {
        let mut inner = self.lock();
        inner.fetches += 1;
        if inner.fail_fetch {
            return Err(RemoteError::Unavailable("fetch disabled".to_string()));
        }
        Ok(inner.docs.get(user_id).cloned())
    }

    async fn upsert(&self, user_id: &str, state: &Value) -> Result<(), RemoteError> {
        let updated_at = self.server_time();
        let mut inner = self.lock();
        if inner.fail_upsert {
            return Err(RemoteError::Unavailable("upsert disabled".to_string()));
        }
        inner.upserts.push((user_id.to_string(), state.clone()));
        inner.docs.insert(
            user_id.to_string(),
            RemoteDocument {
                state: state.clone(),
                updated_at,
            },
        );
        Ok(())
    }
}
