//! Pull-time reconciliation between the local state and the remote document.

use crate::meta::SyncMetadata;
use crate::models::DietState;
use crate::remote::RemoteDocument;

/// Outcome of comparing local and remote state.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Contents are equal. Only the sync point moves.
    InSync,
    /// Both sides changed since the last sync and differ.
    Conflict(DietState),
    /// Remote is strictly newer and there are no competing local edits.
    AdoptRemote(DietState),
    /// Local is newer; the pending push delivers it.
    PushLocal,
    /// Contents differ but neither side is newer. Left alone.
    Unchanged,
}

impl Decision {
    pub fn name(&self) -> &'static str {
        match self {
            Decision::InSync => "in-sync",
            Decision::Conflict(_) => "conflict",
            Decision::AdoptRemote(_) => "adopt-remote",
            Decision::PushLocal => "push-local",
            Decision::Unchanged => "unchanged",
        }
    }
}

/// Decides what to do with a freshly pulled remote document.
///
/// Content equality is structural and is checked first, so equal documents
/// never conflict regardless of timestamps. A conflict requires both sides to
/// have moved past `last_synced_at_ms`.
pub fn reconcile(local: &DietState, meta: &SyncMetadata, remote: &RemoteDocument) -> Decision {
    let remote_state = DietState::from_value(remote.state.clone());
    if remote_state == *local {
        return Decision::InSync;
    }

    let remote_ms = remote.updated_at.timestamp_millis();
    let remote_changed = remote_ms > meta.last_synced_at_ms;
    let local_changed = meta.local_modified_at_ms > meta.last_synced_at_ms;

    if remote_changed && local_changed {
        Decision::Conflict(remote_state)
    } else if remote_ms > meta.local_modified_at_ms {
        Decision::AdoptRemote(remote_state)
    } else if meta.local_modified_at_ms > remote_ms || local_changed {
        Decision::PushLocal
    } else {
        Decision::Unchanged
    }
}
