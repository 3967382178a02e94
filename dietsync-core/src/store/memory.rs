use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{LocalStore, StoreError, StoreKey};

/// In-memory store. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    docs: Arc<Mutex<HashMap<StoreKey, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: StoreKey) -> bool {
        self.docs
            .lock()
            .map(|docs| docs.contains_key(&key))
            .unwrap_or(false)
    }
}

impl LocalStore for MemoryStore {
    fn read(&self, key: StoreKey) -> Result<Option<String>, StoreError> {
        let docs = self.docs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(docs.get(&key).cloned())
    }

    fn write(&self, key: StoreKey, contents: &str) -> Result<(), StoreError> {
        let mut docs = self.docs.lock().unwrap_or_else(|e| e.into_inner());
        docs.insert(key, contents.to_string());
        Ok(())
    }
}
