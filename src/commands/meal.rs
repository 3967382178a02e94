use clap::{Args, Subcommand};

use dietsync_core::{DietState, FoodRef};

use super::{report, CommandError};
use crate::sync::Engine;

#[derive(Args)]
pub struct MealCommand {
    #[command(subcommand)]
    pub command: MealSubcommand,
}

#[derive(Subcommand)]
pub enum MealSubcommand {
    /// Add a food to a meal type of the active diet
    Add {
        /// Food ID
        food_id: String,

        /// Quantity in the food's unit
        quantity: f64,

        /// Meal type ID (e.g. almoco)
        #[arg(long = "type", short = 't', value_name = "TYPE")]
        meal_type: String,

        /// Display name (defaults to the food ID)
        #[arg(long)]
        name: Option<String>,

        /// Unit the quantity is measured in
        #[arg(long, default_value = "g")]
        unit: String,

        /// kcal per 100 units
        #[arg(long, default_value_t = 0.0)]
        kcal: f64,

        /// Protein (g) per 100 units
        #[arg(long, default_value_t = 0.0)]
        protein: f64,

        /// Carbohydrates (g) per 100 units
        #[arg(long, default_value_t = 0.0)]
        carbs: f64,

        /// Fat (g) per 100 units
        #[arg(long, default_value_t = 0.0)]
        fat: f64,

        /// Mark the food as user-created
        #[arg(long)]
        custom: bool,
    },

    /// Remove a meal entry from the active diet
    Remove {
        /// Entry ID
        entry_id: String,
    },

    /// Change the quantity of a meal entry
    Quantity {
        /// Entry ID
        entry_id: String,

        /// New quantity
        quantity: f64,
    },

    /// Remove every meal entry from the active diet
    Clear,
}

impl MealCommand {
    pub fn run(&self, engine: &Engine) -> Result<(), CommandError> {
        let state = engine.snapshot();

        match &self.command {
            MealSubcommand::Add {
                food_id,
                quantity,
                meal_type,
                name,
                unit,
                kcal,
                protein,
                carbs,
                fat,
                custom,
            } => {
                if !state.active_diet().has_category(meal_type) {
                    return Err(CommandError::UnknownMealType(meal_type.clone()));
                }
                check_quantity(*quantity)?;

                let display_name = name.as_deref().unwrap_or(food_id.as_str());
                let mut food = FoodRef::new(food_id.as_str(), display_name)
                    .with_macros(*kcal, *protein, *carbs, *fat)
                    .with_unit(unit.as_str());
                if *custom {
                    food = food.custom();
                }
                if !food.is_valid() {
                    return Err(CommandError::Invalid("Food ID and name are required".into()));
                }

                let label = format!("{} {}{}", food.name, quantity, food.unit);
                report(
                    engine.add_meal_item(food, *quantity, meal_type),
                    &format!("Added {} to {}", label, meal_type),
                );
                Ok(())
            }

            MealSubcommand::Remove { entry_id } => {
                require_entry(&state, entry_id)?;
                report(
                    engine.remove_meal_item(entry_id),
                    &format!("Removed entry {}", entry_id),
                );
                Ok(())
            }

            MealSubcommand::Quantity { entry_id, quantity } => {
                require_entry(&state, entry_id)?;
                check_quantity(*quantity)?;
                report(
                    engine.update_meal_item_quantity(entry_id, *quantity),
                    &format!("Set entry {} to {}", entry_id, quantity),
                );
                Ok(())
            }

            MealSubcommand::Clear => {
                report(
                    engine.clear_meals(),
                    &format!("Cleared {}", state.active_diet().name),
                );
                Ok(())
            }
        }
    }
}

fn require_entry(state: &DietState, entry_id: &str) -> Result<(), CommandError> {
    let found = state
        .active_diet()
        .meal_entries
        .iter()
        .any(|e| e.id == entry_id);
    if found {
        Ok(())
    } else {
        Err(CommandError::UnknownEntry(entry_id.to_string()))
    }
}

fn check_quantity(quantity: f64) -> Result<(), CommandError> {
    if quantity.is_finite() && quantity > 0.0 {
        Ok(())
    } else {
        Err(CommandError::Invalid(format!(
            "Quantity must be a positive number, got {}",
            quantity
        )))
    }
}
