use clap::{Args, Subcommand};
use serde::Serialize;

use liftlog_core::{Exercise, RemoteStore, Routine, RoutineDescriptor};

use super::{confirm, find_exercise, find_routine, truncate, OutputFormat};
use crate::app::App;

#[derive(Args)]
pub struct RoutineCommand {
    #[command(subcommand)]
    pub command: RoutineSubcommand,
}

#[derive(Subcommand)]
pub enum RoutineSubcommand {
    /// Create a routine from catalog exercises
    Add {
        /// Name of the routine
        name: String,

        /// Exercise ID or name (can be repeated, kept in order)
        #[arg(long = "exercise", short, value_name = "EXERCISE", required = true)]
        exercises: Vec<String>,

        /// Notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// List all routines
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a routine and its exercises
    Show {
        /// Routine ID or name
        identifier: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Remove a routine
    Remove {
        /// Routine ID or name
        identifier: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

#[derive(Serialize)]
struct RoutineDetails<'a> {
    #[serde(flatten)]
    routine: &'a Routine,
    exercises: Vec<&'a Exercise>,
}

impl RoutineCommand {
    pub fn run<R: RemoteStore>(&self, app: &mut App<R>) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            RoutineSubcommand::Add {
                name,
                exercises,
                notes,
            } => {
                let catalog = app.store().catalog();
                let mut exercise_ids = Vec::with_capacity(exercises.len());
                for identifier in exercises {
                    match find_exercise(catalog, identifier) {
                        Some(exercise) => exercise_ids.push(exercise.id.clone()),
                        None => return Err(format!("Exercise not found: {}", identifier).into()),
                    }
                }

                let mut descriptor = RoutineDescriptor::new(name, exercise_ids);
                if let Some(notes) = notes {
                    descriptor = descriptor.with_notes(notes);
                }

                let created = app.store_mut().add_routine(descriptor)?;
                println!("Created routine: {} ({})", created, created.id);
                Ok(())
            }

            RoutineSubcommand::List { format } => {
                let routines = app.store().catalog().routines();

                if routines.is_empty() {
                    println!("No routines found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&routines)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<36}  {:<30}  EXERCISES", "ID", "NAME");
                        println!("{}", "-".repeat(80));
                        for routine in &routines {
                            println!(
                                "{:<36}  {:<30}  {}",
                                routine.id,
                                truncate(&routine.name, 30),
                                routine.exercise_ids.len()
                            );
                        }
                        println!("\nTotal: {} routine(s)", routines.len());
                    }
                }
                Ok(())
            }

            RoutineSubcommand::Show { identifier, format } => {
                let catalog = app.store().catalog();
                let routine = match find_routine(catalog, identifier) {
                    Some(r) => r,
                    None => return Err(format!("Routine not found: {}", identifier).into()),
                };

                match format {
                    OutputFormat::Json => {
                        let details = RoutineDetails {
                            routine,
                            exercises: routine
                                .exercise_ids
                                .iter()
                                .filter_map(|id| catalog.exercise(id))
                                .collect(),
                        };
                        println!("{}", serde_json::to_string_pretty(&details)?);
                    }
                    OutputFormat::Text => {
                        println!("{}", routine.name);
                        println!("{}", "=".repeat(routine.name.chars().count()));
                        for (index, id) in routine.exercise_ids.iter().enumerate() {
                            match catalog.exercise(id) {
                                Some(exercise) => println!("{:>3}. {}", index + 1, exercise),
                                None => println!("{:>3}. (missing exercise {})", index + 1, id),
                            }
                        }
                        if let Some(notes) = &routine.notes {
                            println!("\nNotes: {}", notes);
                        }
                    }
                }
                Ok(())
            }

            RoutineSubcommand::Remove { identifier, force } => {
                let routine = match find_routine(app.store().catalog(), identifier) {
                    Some(r) => r.clone(),
                    None => return Err(format!("Routine not found: {}", identifier).into()),
                };

                if !force && !confirm(&format!("Remove routine '{}'?", routine.name))? {
                    println!("Removal cancelled.");
                    return Ok(());
                }

                app.store_mut().remove_routine(&routine.id)?;
                println!("Removed routine: {}", routine.name);
                Ok(())
            }
        }
    }
}
