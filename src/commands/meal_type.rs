use clap::{Args, Subcommand};

use dietsync_core::{MealCategoryPatch, MAX_MEAL_CATEGORIES};

use super::{report, CommandError, OutputFormat};
use crate::sync::Engine;

#[derive(Args)]
pub struct MealTypeCommand {
    #[command(subcommand)]
    pub command: MealTypeSubcommand,
}

#[derive(Subcommand)]
pub enum MealTypeSubcommand {
    /// List the meal types of the active diet
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Add a meal type to the active diet
    Add {
        /// Display name
        name: String,

        /// Icon shown next to the name
        #[arg(long, default_value = "")]
        icon: String,

        /// Color tag
        #[arg(long, default_value = "")]
        color: String,
    },

    /// Update a meal type
    Update {
        /// Meal type ID
        id: String,

        /// New display name
        #[arg(long)]
        name: Option<String>,

        /// New icon
        #[arg(long)]
        icon: Option<String>,

        /// New color tag
        #[arg(long)]
        color: Option<String>,
    },

    /// Remove a meal type and every entry assigned to it
    Remove {
        /// Meal type ID
        id: String,
    },

    /// Reorder meal types; unlisted ones keep their relative order after these
    Reorder {
        /// Meal type IDs in the new order
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },
}

impl MealTypeCommand {
    pub fn run(&self, engine: &Engine) -> Result<(), CommandError> {
        let state = engine.snapshot();
        let diet = state.active_diet();

        match &self.command {
            MealTypeSubcommand::List { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&diet.meal_categories)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<5}  {:<44}  {:<20}  COLOR", "ORDER", "ID", "NAME");
                        println!("{}", "-".repeat(80));
                        for category in &diet.meal_categories {
                            println!(
                                "{:<5}  {:<44}  {:<20}  {}",
                                category.order,
                                category.id,
                                category.to_string(),
                                category.color_tag
                            );
                        }
                    }
                }
                Ok(())
            }

            MealTypeSubcommand::Add { name, icon, color } => {
                if name.trim().is_empty() {
                    return Err(CommandError::Invalid("Meal type name cannot be empty".into()));
                }
                if diet.meal_categories.len() >= MAX_MEAL_CATEGORIES {
                    return Err(CommandError::Invalid(format!(
                        "A diet holds at most {} meal types",
                        MAX_MEAL_CATEGORIES
                    )));
                }
                report(
                    engine.add_meal_type(name, icon, color),
                    &format!("Added meal type '{}'", name.trim()),
                );
                Ok(())
            }

            MealTypeSubcommand::Update {
                id,
                name,
                icon,
                color,
            } => {
                if !diet.has_category(id) {
                    return Err(CommandError::UnknownMealType(id.clone()));
                }
                let patch = MealCategoryPatch {
                    display_name: name.clone(),
                    icon: icon.clone(),
                    color_tag: color.clone(),
                };
                if patch.is_empty() {
                    return Err(CommandError::Invalid(
                        "Nothing to update (use --name, --icon or --color)".into(),
                    ));
                }
                report(
                    engine.update_meal_type(id, &patch),
                    &format!("Updated meal type {}", id),
                );
                Ok(())
            }

            MealTypeSubcommand::Remove { id } => {
                if !diet.has_category(id) {
                    return Err(CommandError::UnknownMealType(id.clone()));
                }
                let entries = diet.entries_for(id).count();
                report(
                    engine.remove_meal_type(id),
                    &format!("Removed meal type {} and {} entr(y/ies)", id, entries),
                );
                Ok(())
            }

            MealTypeSubcommand::Reorder { ids } => {
                if let Some(unknown) = ids.iter().find(|id| !diet.has_category(id)) {
                    return Err(CommandError::UnknownMealType(unknown.clone()));
                }
                report(engine.reorder_meal_types(ids), "Reordered meal types");
                Ok(())
            }
        }
    }
}
