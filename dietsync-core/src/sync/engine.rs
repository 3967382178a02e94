//! The sync orchestrator.
//!
//! [`SyncEngine`] owns the [`DietSession`] and mediates every write to it:
//!
//! 1. `login` pulls the remote document once per session and reconciles it
//!    against the local state and metadata.
//! 2. Local mutations bump the edit clock and (re)arm a trailing-edge
//!    debounced push.
//! 3. A conflict opens the gate, which makes the debounced push inert until
//!    `use_remote` or `keep_local` is called.
//!
//! All mutable state sits behind one mutex that is never held across an
//! `.await`, so the gate check and the push snapshot happen atomically.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::watch;

use super::conflict::{ConflictGate, ConflictView, RemoteCandidate, Resolution};
use super::debounce::Debouncer;
use super::reconcile::{reconcile, Decision};
use crate::meta::SyncMetadata;
use crate::models::{DietState, FoodRef, MealCategoryPatch, MealEntry};
use crate::remote::{RemoteError, RemoteStore};
use crate::session::{DietSession, Origin};
use crate::store::LocalStore;

/// Delay between the last local edit and the push that carries it.
pub const DEFAULT_PUSH_DEBOUNCE: Duration = Duration::from_millis(1200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub push_debounce: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            push_debounce: DEFAULT_PUSH_DEBOUNCE,
        }
    }
}

/// Observable state of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    PullPending,
    Reconciling,
    ConflictOpen,
    PushScheduled,
    PushInFlight,
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SyncPhase::Idle => "idle",
            SyncPhase::PullPending => "pull pending",
            SyncPhase::Reconciling => "reconciling",
            SyncPhase::ConflictOpen => "conflict open",
            SyncPhase::PushScheduled => "push scheduled",
            SyncPhase::PushInFlight => "push in flight",
        };
        f.write_str(name)
    }
}

/// Result of [`SyncEngine::login`].
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    /// This user's session is already reconciled or being reconciled.
    AlreadyActive,
    /// No remote document existed; the local state was uploaded as the first one.
    Initialized,
    /// No remote document existed and the initial upload failed.
    InitializeFailed,
    /// The remote document was compared with the local state.
    Reconciled(Decision),
    /// The remote document could not be fetched. A later login retries.
    FetchFailed,
    /// The session ended while the pull was in flight.
    Cancelled,
}

/// Result of a push attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Pushed,
    Failed,
    /// The conflict gate is open.
    Suppressed,
    /// Nothing to push, or no reconciled session to push for.
    Skipped,
}

/// Result of resolving a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    NoConflict,
    UsedRemote,
    KeptLocal { pushed: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Login {
    LoggedOut,
    Pulling(String),
    Reconciling(String),
    Ready(String),
}

impl Login {
    fn user(&self) -> Option<&str> {
        match self {
            Login::LoggedOut => None,
            Login::Pulling(u) | Login::Reconciling(u) | Login::Ready(u) => Some(u),
        }
    }

    fn ready_user(&self) -> Option<&str> {
        match self {
            Login::Ready(u) => Some(u),
            _ => None,
        }
    }
}

/// A snapshot on its way to the remote store.
struct OutboundPush {
    user: String,
    value: Value,
    snapshot: DietState,
}

struct Core<S: LocalStore> {
    session: DietSession<S>,
    gate: ConflictGate,
    login: Login,
    debouncer: Debouncer,
    pushes_in_flight: usize,
}

impl<S: LocalStore> Core<S> {
    fn phase(&self) -> SyncPhase {
        if self.gate.is_open() {
            return SyncPhase::ConflictOpen;
        }
        match self.login {
            Login::Pulling(_) => SyncPhase::PullPending,
            Login::Reconciling(_) => SyncPhase::Reconciling,
            _ if self.pushes_in_flight > 0 => SyncPhase::PushInFlight,
            _ if self.debouncer.is_pending() => SyncPhase::PushScheduled,
            _ => SyncPhase::Idle,
        }
    }

    /// Takes the snapshot for an outbound push, or explains why there is none.
    fn prepare_push(&mut self) -> Result<OutboundPush, PushOutcome> {
        if self.gate.is_open() {
            tracing::debug!("Conflict open; push suppressed");
            return Err(PushOutcome::Suppressed);
        }
        let user = self
            .login
            .ready_user()
            .ok_or(PushOutcome::Skipped)?
            .to_string();
        let value = serde_json::to_value(self.session.state()).map_err(|e| {
            tracing::warn!("Failed to encode diet state for push: {}", e);
            PushOutcome::Failed
        })?;
        self.pushes_in_flight += 1;
        Ok(OutboundPush {
            user,
            value,
            snapshot: self.session.state().clone(),
        })
    }

    /// Records the result of a push. Edits made while the upsert was in
    /// flight are not part of `snapshot` and stay pending.
    fn finish_push(
        &mut self,
        snapshot: &DietState,
        result: Result<(), RemoteError>,
    ) -> PushOutcome {
        self.pushes_in_flight = self.pushes_in_flight.saturating_sub(1);
        match result {
            Ok(()) => {
                let now = self.session.now_ms();
                if self.session.state() == snapshot {
                    let edited = self.session.metadata().local_modified_at_ms;
                    self.session.mark_synced(now.max(edited));
                    tracing::info!(synced_at_ms = now, "Pushed diet state");
                } else {
                    self.session.mark_synced_behind_edits(now);
                    tracing::info!(
                        synced_at_ms = now,
                        "Pushed diet state; edits made during the push are still pending"
                    );
                }
                PushOutcome::Pushed
            }
            Err(e) => {
                tracing::warn!("Push failed, will retry on next change: {}", e);
                PushOutcome::Failed
            }
        }
    }
}

struct Inner<S: LocalStore, R: RemoteStore> {
    remote: R,
    settings: SyncSettings,
    core: Mutex<Core<S>>,
    phase: watch::Sender<SyncPhase>,
}

impl<S: LocalStore, R: RemoteStore> Inner<S, R> {
    fn lock(&self) -> MutexGuard<'_, Core<S>> {
        self.core.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, core: &Core<S>) {
        self.phase.send_replace(core.phase());
    }

    /// (Re)arms the debounced push. Must be called with the core locked.
    fn schedule_push(self: &Arc<Self>, core: &mut Core<S>) {
        let weak = Arc::downgrade(self);
        core.debouncer.schedule(move |generation| async move {
            if let Some(inner) = weak.upgrade() {
                inner.run_scheduled_push(generation).await;
            }
        });
    }

    async fn run_scheduled_push(&self, generation: u64) {
        let prepared = {
            let mut core = self.lock();
            if !core.debouncer.complete(generation) {
                return;
            }
            let prepared = core.prepare_push();
            self.publish(&core);
            prepared
        };

        if let Ok(push) = prepared {
            self.deliver(push).await;
        }
    }

    async fn deliver(&self, push: OutboundPush) -> PushOutcome {
        let result = self.remote.upsert(&push.user, &push.value).await;
        let mut core = self.lock();
        let outcome = core.finish_push(&push.snapshot, result);
        self.publish(&core);
        outcome
    }
}

/// Offline-first diet state with pull-on-login, debounced push and
/// user-mediated conflict resolution. Cheap to clone.
pub struct SyncEngine<S: LocalStore, R: RemoteStore> {
    inner: Arc<Inner<S, R>>,
}

impl<S: LocalStore, R: RemoteStore> Clone for SyncEngine<S, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: LocalStore, R: RemoteStore> SyncEngine<S, R> {
    pub fn new(session: DietSession<S>, remote: R, settings: SyncSettings) -> Self {
        let core = Core {
            session,
            gate: ConflictGate::default(),
            login: Login::LoggedOut,
            debouncer: Debouncer::new(settings.push_debounce),
            pushes_in_flight: 0,
        };
        let (phase, _) = watch::channel(SyncPhase::Idle);

        Self {
            inner: Arc::new(Inner {
                remote,
                settings,
                core: Mutex::new(core),
                phase,
            }),
        }
    }

    pub fn settings(&self) -> SyncSettings {
        self.inner.settings
    }

    pub fn phase(&self) -> SyncPhase {
        self.inner.lock().phase()
    }

    /// Receives every phase change.
    pub fn subscribe(&self) -> watch::Receiver<SyncPhase> {
        self.inner.phase.subscribe()
    }

    pub fn snapshot(&self) -> DietState {
        self.inner.lock().session.state().clone()
    }

    pub fn metadata(&self) -> SyncMetadata {
        self.inner.lock().session.metadata().clone()
    }

    pub fn user_id(&self) -> Option<String> {
        self.inner.lock().login.user().map(str::to_string)
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Pulls and reconciles the remote document for `user_id`.
    ///
    /// Runs once per session: a repeated or concurrent call for the same user
    /// returns [`LoginOutcome::AlreadyActive`]. Logging in as a different user
    /// ends the previous session first.
    pub async fn login(&self, user_id: &str) -> LoginOutcome {
        {
            let mut core = self.inner.lock();
            if core.login.user() == Some(user_id) {
                return LoginOutcome::AlreadyActive;
            }
            if core.login.user().is_some() {
                Self::end_session(&mut core);
            }
            core.login = Login::Pulling(user_id.to_string());
            self.inner.publish(&core);
        }
        tracing::debug!(user = user_id, "Pulling remote diet state");

        let fetched = self.inner.remote.fetch(user_id).await;

        let initial_push = {
            let mut core = self.inner.lock();
            if core.login != Login::Pulling(user_id.to_string()) {
                return LoginOutcome::Cancelled;
            }

            match fetched {
                Err(e) => {
                    tracing::warn!(user = user_id, "Failed to fetch remote diet state: {}", e);
                    core.login = Login::LoggedOut;
                    self.inner.publish(&core);
                    return LoginOutcome::FetchFailed;
                }
                Ok(Some(doc)) => {
                    core.login = Login::Reconciling(user_id.to_string());
                    self.inner.publish(&core);

                    let decision = reconcile(core.session.state(), core.session.metadata(), &doc);
                    tracing::info!(
                        user = user_id,
                        decision = decision.name(),
                        remote_updated_at = %doc.updated_at,
                        "Reconciled remote diet state"
                    );
                    Self::apply_decision(&mut core, &decision, doc.updated_at);
                    core.login = Login::Ready(user_id.to_string());

                    // Edits made while the pull was in flight, or a newer
                    // local state, go out through the regular debounced push.
                    if !core.gate.is_open() && core.session.metadata().has_unsynced_changes() {
                        self.inner.schedule_push(&mut core);
                    }
                    self.inner.publish(&core);
                    return LoginOutcome::Reconciled(decision);
                }
                Ok(None) => {
                    tracing::info!(user = user_id, "No remote diet state, uploading local copy");
                    core.login = Login::Ready(user_id.to_string());
                    let prepared = core.prepare_push();
                    self.inner.publish(&core);
                    prepared
                }
            }
        };

        let pushed = match initial_push {
            Ok(push) => self.inner.deliver(push).await,
            Err(outcome) => outcome,
        };
        if pushed == PushOutcome::Pushed {
            LoginOutcome::Initialized
        } else {
            LoginOutcome::InitializeFailed
        }
    }

    fn apply_decision(core: &mut Core<S>, decision: &Decision, remote_updated_at: DateTime<Utc>) {
        match decision {
            Decision::InSync => {
                let now = core.session.now_ms();
                core.session.mark_synced(now);
                core.session.mark_remote_seen(remote_updated_at);
            }
            Decision::AdoptRemote(state) => {
                core.session.apply(state.clone(), Origin::Remote);
                core.session.mark_synced(remote_updated_at.timestamp_millis());
                core.session.mark_remote_seen(remote_updated_at);
            }
            Decision::Conflict(state) => {
                core.debouncer.cancel();
                let local_ms = core.session.metadata().local_modified_at_ms;
                core.gate.open(
                    RemoteCandidate {
                        state: state.clone(),
                        updated_at: remote_updated_at,
                    },
                    local_ms,
                );
            }
            Decision::PushLocal | Decision::Unchanged => {}
        }
    }

    fn end_session(core: &mut Core<S>) {
        core.debouncer.cancel();
        core.gate.close();
        core.login = Login::LoggedOut;
    }

    /// Ends the session. Any pending push is dropped.
    pub fn logout(&self) {
        let mut core = self.inner.lock();
        if let Some(user) = core.login.user() {
            tracing::debug!(user, "Ending sync session");
        }
        Self::end_session(&mut core);
        self.inner.publish(&core);
    }

    /// Sends a pending debounced push immediately instead of waiting.
    pub async fn flush(&self) -> PushOutcome {
        let prepared = {
            let mut core = self.inner.lock();
            if !core.debouncer.cancel() {
                return PushOutcome::Skipped;
            }
            let prepared = core.prepare_push();
            self.inner.publish(&core);
            prepared
        };

        match prepared {
            Ok(push) => self.inner.deliver(push).await,
            Err(outcome) => outcome,
        }
    }

    // ------------------------------------------------------------------
    // Conflict gate
    // ------------------------------------------------------------------

    pub fn is_conflict_open(&self) -> bool {
        self.inner.lock().gate.is_open()
    }

    pub fn conflict(&self) -> Option<ConflictView> {
        let core = self.inner.lock();
        core.gate.view(core.session.state())
    }

    /// Replaces the local state with the remote candidate and closes the gate.
    pub fn use_remote(&self) -> bool {
        let mut core = self.inner.lock();
        let Some(candidate) = core.gate.close() else {
            return false;
        };
        core.debouncer.cancel();
        core.session.apply(candidate.state, Origin::Remote);
        let now = core.session.now_ms();
        core.session.mark_synced(now);
        core.session.mark_remote_seen(candidate.updated_at);
        tracing::info!("Conflict resolved with remote state");
        self.inner.publish(&core);
        true
    }

    /// Closes the gate, then force-pushes the local state.
    pub async fn keep_local(&self) -> ResolveOutcome {
        let prepared = {
            let mut core = self.inner.lock();
            if core.gate.close().is_none() {
                return ResolveOutcome::NoConflict;
            }
            core.debouncer.cancel();
            tracing::info!("Conflict resolved with local state");
            let prepared = core.prepare_push();
            self.inner.publish(&core);
            prepared
        };

        let outcome = match prepared {
            Ok(push) => self.inner.deliver(push).await,
            Err(outcome) => outcome,
        };
        ResolveOutcome::KeptLocal {
            pushed: outcome == PushOutcome::Pushed,
        }
    }

    pub async fn resolve(&self, resolution: Resolution) -> ResolveOutcome {
        match resolution {
            Resolution::UseRemote => {
                if self.use_remote() {
                    ResolveOutcome::UsedRemote
                } else {
                    ResolveOutcome::NoConflict
                }
            }
            Resolution::KeepLocal => self.keep_local().await,
        }
    }

    // ------------------------------------------------------------------
    // Mutation API
    // ------------------------------------------------------------------

    /// Applies a local edit. Returns false if it changed nothing.
    pub fn update(&self, f: impl FnOnce(&DietState) -> DietState) -> bool {
        let mut core = self.inner.lock();
        if !core.session.update(f) {
            return false;
        }
        if core.login.ready_user().is_some()
            && !core.gate.is_open()
            && core.session.metadata().has_unsynced_changes()
        {
            self.inner.schedule_push(&mut core);
        }
        self.inner.publish(&core);
        true
    }

    pub fn switch_diet(&self, diet_id: &str) -> bool {
        self.update(|s| s.switch_diet(diet_id))
    }

    pub fn rename_diet(&self, diet_id: &str, name: &str) -> bool {
        self.update(|s| s.rename_diet(diet_id, name))
    }

    pub fn clear_diet(&self, diet_id: &str) -> bool {
        self.update(|s| s.clear_diet(diet_id))
    }

    pub fn clone_diet(&self, source_id: &str, target_id: &str) -> bool {
        self.update(|s| s.clone_diet(source_id, target_id))
    }

    pub fn add_meal_item(&self, food: FoodRef, quantity: f64, meal_category_id: &str) -> bool {
        self.update(|s| s.add_meal_item(food, quantity, meal_category_id))
    }

    pub fn add_meal_entry(&self, entry: MealEntry) -> bool {
        self.update(|s| s.add_meal_entry(entry))
    }

    pub fn remove_meal_item(&self, entry_id: &str) -> bool {
        self.update(|s| s.remove_meal_item(entry_id))
    }

    pub fn update_meal_item_quantity(&self, entry_id: &str, quantity: f64) -> bool {
        self.update(|s| s.update_meal_item_quantity(entry_id, quantity))
    }

    pub fn clear_meals(&self) -> bool {
        self.update(|s| s.clear_meals())
    }

    pub fn add_meal_type(&self, display_name: &str, icon: &str, color_tag: &str) -> bool {
        self.update(|s| s.add_meal_type(display_name, icon, color_tag))
    }

    pub fn update_meal_type(&self, category_id: &str, patch: &MealCategoryPatch) -> bool {
        self.update(|s| s.update_meal_type(category_id, patch))
    }

    pub fn remove_meal_type(&self, category_id: &str) -> bool {
        self.update(|s| s.remove_meal_type(category_id))
    }

    pub fn reorder_meal_types(&self, ordered_ids: &[String]) -> bool {
        self.update(|s| s.reorder_meal_types(ordered_ids))
    }

    pub fn toggle_favorite(&self, food_id: &str) -> bool {
        self.update(|s| s.toggle_favorite(food_id))
    }

    pub fn set_hydration_goal(&self, goal_ml: f64) -> bool {
        self.update(|s| s.set_hydration_goal(goal_ml))
    }
}
