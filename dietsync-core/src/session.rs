//! The explicit application-state object owned by a running session.
//!
//! A [`DietSession`] pairs the current [`DietState`] with its
//! [`SyncMetadata`] and persists both through a [`LocalStore`] after every
//! change. Writes carry an [`Origin`] so that applying a remote document is
//! never mistaken for a fresh local edit.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::clock::Clock;
use crate::meta::SyncMetadata;
use crate::models::DietState;
use crate::store::{LocalStore, StoreKey};

/// Where a state write came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A user edit on this device. Bumps `local_modified_at_ms`.
    Local,
    /// A document received from the remote store. Leaves the edit clock alone.
    Remote,
}

pub struct DietSession<S: LocalStore> {
    store: S,
    clock: Arc<dyn Clock>,
    state: DietState,
    meta: SyncMetadata,
}

impl<S: LocalStore> DietSession<S> {
    /// Hydrates a session from the store, falling back to defaults.
    ///
    /// Hydration is not an edit: the metadata is taken as stored.
    pub fn load(store: S, clock: Arc<dyn Clock>) -> Self {
        let state = store
            .load::<DietState>(StoreKey::DietState)
            .unwrap_or_default();
        let meta = store
            .load::<SyncMetadata>(StoreKey::SyncMeta)
            .unwrap_or_else(|| SyncMetadata::new(clock.now_ms()));

        tracing::debug!(
            active = %state.active_diet_id,
            local_modified_at_ms = meta.local_modified_at_ms,
            last_synced_at_ms = meta.last_synced_at_ms,
            "Hydrated diet session"
        );

        Self {
            store,
            clock,
            state,
            meta,
        }
    }

    pub fn state(&self) -> &DietState {
        &self.state
    }

    pub fn metadata(&self) -> &SyncMetadata {
        &self.meta
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Replaces the state. Returns false (and writes nothing) when `next`
    /// equals the current state.
    pub fn apply(&mut self, next: DietState, origin: Origin) -> bool {
        if next == self.state {
            return false;
        }
        match origin {
            Origin::Local => {
                let now_ms = self.clock.now_ms();
                let at = DateTime::from_timestamp_millis(now_ms).unwrap_or_default();
                self.state = next.touch_changed(&self.state, at);
                self.store.save(StoreKey::DietState, &self.state);
                self.meta.record_local_edit(now_ms);
                self.save_meta();
            }
            Origin::Remote => {
                self.state = next;
                self.store.save(StoreKey::DietState, &self.state);
            }
        }
        true
    }

    /// Applies a local edit computed from the current state.
    pub fn update(&mut self, f: impl FnOnce(&DietState) -> DietState) -> bool {
        let next = f(&self.state);
        self.apply(next, Origin::Local)
    }

    pub fn mark_synced(&mut self, at_ms: i64) {
        self.meta.record_sync(at_ms);
        self.save_meta();
    }

    /// Marks a push as delivered while newer local edits are still pending.
    pub fn mark_synced_behind_edits(&mut self, at_ms: i64) {
        self.meta.record_sync_behind_edits(at_ms);
        self.save_meta();
    }

    pub fn mark_remote_seen(&mut self, remote_updated_at: DateTime<Utc>) {
        self.meta.record_remote(remote_updated_at);
        self.save_meta();
    }

    fn save_meta(&self) {
        self.store.save(StoreKey::SyncMeta, &self.meta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::FoodRef;
    use crate::store::MemoryStore;

    fn new_session(store: MemoryStore, clock: &ManualClock) -> DietSession<MemoryStore> {
        DietSession::load(store, Arc::new(clock.clone()))
    }

    #[test]
    fn test_load_empty_store_uses_defaults() {
        let clock = ManualClock::new(1_000);
        let session = new_session(MemoryStore::new(), &clock);
        assert_eq!(session.state().diets().len(), 4);
        assert_eq!(session.metadata().local_modified_at_ms, 1_000);
        assert_eq!(session.metadata().last_synced_at_ms, 0);
    }

    #[test]
    fn test_local_edit_bumps_and_persists() {
        let clock = ManualClock::new(1_000);
        let store = MemoryStore::new();
        let mut session = new_session(store.clone(), &clock);

        clock.set(2_000);
        assert!(session.update(|s| s.set_hydration_goal(3000.0)));
        assert_eq!(session.metadata().local_modified_at_ms, 2_000);

        let reloaded = DietSession::load(store, Arc::new(clock.clone()));
        assert_eq!(reloaded.state().hydration_goal, 3000.0);
        assert_eq!(reloaded.metadata().local_modified_at_ms, 2_000);
    }

    #[test]
    fn test_local_edit_stamps_diet_from_clock() {
        let clock = ManualClock::new(1_000);
        let mut session = new_session(MemoryStore::new(), &clock);

        clock.set(4_200);
        session.update(|s| s.rename_diet("diet-3", "Bulking"));
        let stamped = DateTime::from_timestamp_millis(4_200).unwrap();
        assert_eq!(session.state().diet("diet-3").unwrap().updated_at, stamped);
        assert_eq!(
            session.state().diet("diet-1").unwrap().updated_at,
            DateTime::<Utc>::default()
        );
    }

    #[test]
    fn test_remote_apply_does_not_bump() {
        let clock = ManualClock::new(1_000);
        let mut session = new_session(MemoryStore::new(), &clock);

        clock.set(5_000);
        let remote = session.state().rename_diet("diet-1", "From phone");
        assert!(session.apply(remote, Origin::Remote));
        assert_eq!(session.metadata().local_modified_at_ms, 1_000);
        assert_eq!(session.state().diets()[0].name, "From phone");
    }

    #[test]
    fn test_noop_edit_is_not_recorded() {
        let clock = ManualClock::new(1_000);
        let store = MemoryStore::new();
        let mut session = new_session(store.clone(), &clock);

        clock.set(2_000);
        assert!(!session.update(|s| s.switch_diet("missing")));
        assert_eq!(session.metadata().local_modified_at_ms, 1_000);
        assert!(!store.contains(StoreKey::DietState));
    }

    #[test]
    fn test_hydration_keeps_stored_metadata() {
        let clock = ManualClock::new(1_000);
        let store = MemoryStore::new();
        {
            let mut session = new_session(store.clone(), &clock);
            session.update(|s| s.add_meal_item(FoodRef::new("ovo", "Ovo"), 50.0, "lanche"));
            session.mark_synced(1_000);
        }

        clock.set(9_000);
        let session = new_session(store, &clock);
        assert_eq!(session.metadata().local_modified_at_ms, 1_000);
        assert_eq!(session.metadata().last_synced_at_ms, 1_000);
        assert_eq!(session.state().active_diet().meal_entries.len(), 1);
    }
}
