//! Local-only sync bookkeeping.
//!
//! Three timestamps drive every synchronization decision:
//! - `local_modified_at_ms`: last local edit
//! - `last_synced_at_ms`: last successful pull or push
//! - `last_known_remote_modified_at`: server time of the last remote document we saw

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetadata {
    pub local_modified_at_ms: i64,
    #[serde(default)]
    pub last_synced_at_ms: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_known_remote_modified_at: Option<DateTime<Utc>>,
}

impl SyncMetadata {
    /// Fresh metadata for a device that has never synced.
    pub fn new(now_ms: i64) -> Self {
        Self {
            local_modified_at_ms: now_ms,
            last_synced_at_ms: 0,
            last_known_remote_modified_at: None,
        }
    }

    /// True when there are local edits the remote has not seen.
    pub fn has_unsynced_changes(&self) -> bool {
        self.local_modified_at_ms > self.last_synced_at_ms
    }

    /// Edit times never move backwards.
    pub fn record_local_edit(&mut self, now_ms: i64) {
        self.local_modified_at_ms = self.local_modified_at_ms.max(now_ms);
    }

    pub fn record_sync(&mut self, at_ms: i64) {
        self.last_synced_at_ms = at_ms;
    }

    /// Records a sync at `at_ms` that did not carry the latest local edits.
    ///
    /// Those edits are re-dated to just after the sync point so they stay
    /// pending.
    pub fn record_sync_behind_edits(&mut self, at_ms: i64) {
        self.last_synced_at_ms = at_ms;
        self.local_modified_at_ms = self.local_modified_at_ms.max(at_ms + 1);
    }

    pub fn record_remote(&mut self, remote_updated_at: DateTime<Utc>) {
        self.last_known_remote_modified_at = Some(remote_updated_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_metadata_is_unsynced() {
        let meta = SyncMetadata::new(1_000);
        assert_eq!(meta.last_synced_at_ms, 0);
        assert!(meta.has_unsynced_changes());
    }

    #[test]
    fn test_record_sync_clears_pending() {
        let mut meta = SyncMetadata::new(1_000);
        meta.record_sync(1_000);
        assert!(!meta.has_unsynced_changes());
        meta.record_local_edit(1_001);
        assert!(meta.has_unsynced_changes());
    }

    #[test]
    fn test_edit_time_is_monotonic() {
        let mut meta = SyncMetadata::new(2_000);
        meta.record_local_edit(1_500);
        assert_eq!(meta.local_modified_at_ms, 2_000);
    }

    #[test]
    fn test_sync_behind_edits_keeps_them_pending() {
        let mut meta = SyncMetadata::new(1_000);
        meta.record_local_edit(1_020);
        meta.record_sync_behind_edits(1_020);
        assert_eq!(meta.last_synced_at_ms, 1_020);
        assert_eq!(meta.local_modified_at_ms, 1_021);
        assert!(meta.has_unsynced_changes());
    }

    #[test]
    fn test_json_shape() {
        let mut meta = SyncMetadata::new(5);
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["localModifiedAtMs"], 5);
        assert!(json.get("lastKnownRemoteModifiedAt").is_none());

        meta.record_remote(DateTime::from_timestamp_millis(2_000).unwrap());
        let json = serde_json::to_string(&meta).unwrap();
        let parsed: SyncMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, meta);
    }
}
