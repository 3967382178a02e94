use clap::Args;

use super::{report, CommandError};
use crate::sync::Engine;

#[derive(Args)]
pub struct FavoriteCommand {
    /// Food ID to add or remove (lists favorites when omitted)
    pub food_id: Option<String>,
}

impl FavoriteCommand {
    pub fn run(&self, engine: &Engine) -> Result<(), CommandError> {
        let Some(food_id) = &self.food_id else {
            let state = engine.snapshot();
            if state.favorites.is_empty() {
                println!("No favorites");
            }
            for food_id in &state.favorites {
                println!("{}", food_id);
            }
            return Ok(());
        };

        if food_id.trim().is_empty() {
            return Err(CommandError::Invalid("Food ID cannot be empty".into()));
        }
        let was_favorite = engine.snapshot().is_favorite(food_id.trim());
        let message = if was_favorite {
            format!("Removed {} from favorites", food_id.trim())
        } else {
            format!("Added {} to favorites", food_id.trim())
        };
        report(engine.toggle_favorite(food_id), &message);
        Ok(())
    }
}

#[derive(Args)]
pub struct HydrationCommand {
    /// Daily goal in ml (shows the current goal when omitted)
    pub goal_ml: Option<f64>,
}

impl HydrationCommand {
    pub fn run(&self, engine: &Engine) -> Result<(), CommandError> {
        let Some(goal) = self.goal_ml else {
            println!("Hydration goal: {} ml", engine.snapshot().hydration_goal);
            return Ok(());
        };

        if !goal.is_finite() || goal < 0.0 {
            return Err(CommandError::Invalid(format!(
                "Hydration goal must be a non-negative number, got {}",
                goal
            )));
        }
        report(
            engine.set_hydration_goal(goal),
            &format!("Hydration goal: {} ml", goal),
        );
        Ok(())
    }
}
