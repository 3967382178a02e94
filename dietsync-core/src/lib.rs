//! Dietsync Core Library
//!
//! Diet state model, local persistence and the sync engine shared by the
//! dietsync CLI and server.

pub mod clock;
pub mod meta;
pub mod models;
pub mod remote;
pub mod session;
pub mod store;
pub mod sync;

pub use clock::{Clock, ManualClock, SystemClock};
pub use meta::SyncMetadata;
pub use models::{
    Diet, DietState, FoodRef, Macros, MealCategory, MealCategoryPatch, MealEntry,
    DEFAULT_HYDRATION_GOAL_ML, DIET_SLOTS, MAX_MEAL_CATEGORIES,
};
pub use remote::{check_server, HttpRemote, MemoryRemote, RemoteDocument, RemoteError, RemoteStore};
pub use session::{DietSession, Origin};
pub use store::{FileStore, LocalStore, MemoryStore, StoreError, StoreKey};
pub use sync::{
    ConflictView, Decision, LoginOutcome, PushOutcome, Resolution, ResolveOutcome, SyncEngine,
    SyncPhase, SyncSettings,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
