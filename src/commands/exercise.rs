use clap::{Args, Subcommand};

use liftlog_core::{ExerciseDescriptor, RemoteStore};

use super::{confirm, find_exercise, truncate, OutputFormat};
use crate::app::App;

#[derive(Args)]
pub struct ExerciseCommand {
    #[command(subcommand)]
    pub command: ExerciseSubcommand,
}

#[derive(Subcommand)]
pub enum ExerciseSubcommand {
    /// Add an exercise to the catalog
    Add {
        /// Name of the exercise
        name: String,

        /// Category (e.g. Chest, Legs)
        #[arg(long, short)]
        category: String,

        /// Notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// List exercises grouped by category
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only show this category
        #[arg(long, short)]
        category: Option<String>,
    },

    /// Remove an exercise from the catalog
    Remove {
        /// Exercise ID or name
        identifier: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Add the built-in exercises to an empty catalog
    Seed,
}

impl ExerciseCommand {
    pub fn run<R: RemoteStore>(&self, app: &mut App<R>) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ExerciseSubcommand::Add {
                name,
                category,
                notes,
            } => {
                let mut descriptor = ExerciseDescriptor::new(name, category);
                if let Some(notes) = notes {
                    descriptor = descriptor.with_notes(notes);
                }

                let created = app.store_mut().add_exercise(descriptor)?;
                println!("Added exercise: {} ({})", created, created.id);
                Ok(())
            }

            ExerciseSubcommand::List { format, category } => {
                let groups: Vec<_> = app
                    .store()
                    .catalog()
                    .exercises_by_category()
                    .into_iter()
                    .filter(|(name, _)| match category {
                        Some(wanted) => name.eq_ignore_ascii_case(wanted),
                        None => true,
                    })
                    .collect();

                if groups.is_empty() {
                    println!("No exercises found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        let exercises: Vec<_> =
                            groups.iter().flat_map(|(_, list)| list.iter()).collect();
                        println!("{}", serde_json::to_string_pretty(&exercises)?);
                    }
                    OutputFormat::Text => {
                        let mut total = 0;
                        for (name, exercises) in &groups {
                            println!("{}", name);
                            for exercise in exercises {
                                println!("  {:<36}  {}", exercise.id, truncate(&exercise.name, 30));
                            }
                            println!();
                            total += exercises.len();
                        }
                        println!("Total: {} exercise(s)", total);
                    }
                }
                Ok(())
            }

            ExerciseSubcommand::Remove { identifier, force } => {
                let exercise = match find_exercise(app.store().catalog(), identifier) {
                    Some(e) => e.clone(),
                    None => return Err(format!("Exercise not found: {}", identifier).into()),
                };

                // Confirm deletion unless --force is used
                if !force && !confirm(&format!("Remove exercise '{}'?", exercise.name))? {
                    println!("Removal cancelled.");
                    return Ok(());
                }

                app.store_mut().remove_exercise(&exercise.id)?;
                println!("Removed exercise: {}", exercise.name);
                Ok(())
            }

            ExerciseSubcommand::Seed => {
                let added = app.store_mut().seed_default_exercises();
                if added == 0 {
                    println!("Catalog already has exercises; nothing added.");
                } else {
                    println!("Added {} default exercises.", added);
                }
                Ok(())
            }
        }
    }
}
