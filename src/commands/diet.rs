use clap::{Args, Subcommand};

use super::{report, require_diet, CommandError, OutputFormat};
use crate::sync::Engine;

#[derive(Args)]
pub struct DietCommand {
    #[command(subcommand)]
    pub command: DietSubcommand,
}

#[derive(Subcommand)]
pub enum DietSubcommand {
    /// List the diet slots
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a diet's meals
    Show {
        /// Diet ID (defaults to the active diet)
        id: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Make a diet the active one
    Switch {
        /// Diet ID
        id: String,
    },

    /// Rename a diet
    Rename {
        /// Diet ID
        id: String,

        /// New name
        name: String,
    },

    /// Remove every meal entry from a diet
    Clear {
        /// Diet ID
        id: String,
    },

    /// Copy a diet's meal types and entries over another diet
    Clone {
        /// Diet to copy from
        source: String,

        /// Diet to overwrite
        target: String,
    },
}

impl DietCommand {
    pub fn run(&self, engine: &Engine) -> Result<(), CommandError> {
        let state = engine.snapshot();

        match &self.command {
            DietSubcommand::List { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(state.diets())?);
                    }
                    OutputFormat::Text => {
                        println!("   {:<8}  {:<24}  {:>7}  {:>9}", "ID", "NAME", "ENTRIES", "KCAL");
                        println!("{}", "-".repeat(56));
                        for diet in state.diets() {
                            let marker = if diet.id == state.active_diet_id {
                                "*"
                            } else {
                                " "
                            };
                            println!(
                                "{}  {:<8}  {:<24}  {:>7}  {:>9.0}",
                                marker,
                                diet.id,
                                diet.name,
                                diet.meal_entries.len(),
                                diet.totals().kcal
                            );
                        }
                    }
                }
                Ok(())
            }

            DietSubcommand::Show { id, format } => {
                let diet = match id {
                    Some(id) => state
                        .diet(id)
                        .ok_or_else(|| CommandError::UnknownDiet(id.clone()))?,
                    None => state.active_diet(),
                };
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(diet)?),
                    OutputFormat::Text => print!("{}", diet),
                }
                Ok(())
            }

            DietSubcommand::Switch { id } => {
                require_diet(&state, id)?;
                report(engine.switch_diet(id), &format!("Active diet: {}", id));
                Ok(())
            }

            DietSubcommand::Rename { id, name } => {
                require_diet(&state, id)?;
                if name.trim().is_empty() {
                    return Err(CommandError::Invalid("Diet name cannot be empty".into()));
                }
                report(
                    engine.rename_diet(id, name),
                    &format!("Renamed {} to '{}'", id, name.trim()),
                );
                Ok(())
            }

            DietSubcommand::Clear { id } => {
                require_diet(&state, id)?;
                report(engine.clear_diet(id), &format!("Cleared {}", id));
                Ok(())
            }

            DietSubcommand::Clone { source, target } => {
                require_diet(&state, source)?;
                require_diet(&state, target)?;
                if source == target {
                    return Err(CommandError::Invalid(
                        "Source and target must be different diets".into(),
                    ));
                }
                report(
                    engine.clone_diet(source, target),
                    &format!("Copied {} over {}", source, target),
                );
                Ok(())
            }
        }
    }
}
