//! Synchronization between the local diet state and the remote store.
//!
//! ## Flow
//!
//! 1. On login the engine pulls the user's remote document once
//! 2. [`reconcile`] decides between adopting it, pushing local, or opening
//!    the [`ConflictGate`]
//! 3. Local edits arm a trailing-edge [`Debouncer`]; when it fires the whole
//!    state is upserted
//! 4. While a conflict is open, pushes are suppressed until the user picks a
//!    [`Resolution`]

mod conflict;
mod debounce;
mod engine;
mod reconcile;

pub use conflict::{ConflictGate, ConflictView, RemoteCandidate, Resolution};
pub use debounce::Debouncer;
pub use engine::{
    LoginOutcome, PushOutcome, ResolveOutcome, SyncEngine, SyncPhase, SyncSettings,
    DEFAULT_PUSH_DEBOUNCE,
};
pub use reconcile::{reconcile, Decision};
