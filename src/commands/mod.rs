mod config_cmd;
mod diet;
mod meal;
mod meal_type;
mod prefs;
mod sync_cmd;

use clap::ValueEnum;
use thiserror::Error;

use dietsync_core::DietState;

pub use config_cmd::ConfigCommand;
pub use diet::DietCommand;
pub use meal::MealCommand;
pub use meal_type::MealTypeCommand;
pub use prefs::{FavoriteCommand, HydrationCommand};
pub use sync_cmd::SyncCommand;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Errors from CLI commands
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Diet not found: {0}")]
    UnknownDiet(String),

    #[error("Meal entry not found: {0}")]
    UnknownEntry(String),

    #[error("Meal type not found: {0}")]
    UnknownMealType(String),

    #[error("{0}")]
    Invalid(String),

    #[error("Sync is not configured (set sync.server_url and sync.api_key)")]
    SyncNotConfigured,

    #[error("Sync server unreachable: {0}")]
    Unreachable(String),

    #[error("Failed to fetch remote diet state")]
    FetchFailed,

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub(crate) fn require_diet(state: &DietState, diet_id: &str) -> Result<(), CommandError> {
    if state.diet(diet_id).is_some() {
        Ok(())
    } else {
        Err(CommandError::UnknownDiet(diet_id.to_string()))
    }
}

pub(crate) fn report(changed: bool, message: &str) {
    if changed {
        println!("{}", message);
    } else {
        println!("No changes.");
    }
}
