use clap::{Args, Subcommand};

use liftlog_core::{format_duration, NewSet, RemoteStore, SessionError};

use super::{confirm, find_exercise, find_routine, find_workout_exercise, OutputFormat};
use crate::app::App;

#[derive(Args)]
pub struct WorkoutCommand {
    #[command(subcommand)]
    pub command: WorkoutSubcommand,
}

#[derive(Subcommand)]
pub enum WorkoutSubcommand {
    /// Start a workout, optionally from a routine
    Start {
        /// Workout name (a routine's name takes precedence)
        name: Option<String>,

        /// Routine ID or name to copy exercises from
        #[arg(long, short)]
        routine: Option<String>,
    },

    /// Add a catalog exercise to the active workout
    AddExercise {
        /// Exercise ID or name
        exercise: String,
    },

    /// Remove an exercise from the active workout
    RemoveExercise {
        /// Workout exercise ID or exercise name
        exercise: String,
    },

    /// Log a set for an exercise in the active workout
    AddSet {
        /// Workout exercise ID or exercise name
        exercise: String,

        /// Repetitions
        #[arg(long, short)]
        reps: u32,

        /// Weight in kg
        #[arg(long, short, default_value_t = 0.0)]
        weight: f64,

        /// Weight is for a single dumbbell
        #[arg(long)]
        single_dumbbell: bool,

        /// Log the set as not completed
        #[arg(long)]
        incomplete: bool,

        /// Notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// Remove a set from the active workout
    RemoveSet {
        /// Workout exercise ID or exercise name
        exercise: String,

        /// Set ID
        set_id: String,
    },

    /// Replace the active workout's notes
    Notes {
        /// New notes
        text: String,
    },

    /// Show the active workout
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Finish the active workout and add it to history
    Complete,

    /// Abandon the active workout
    Cancel {
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Delete the saved workout draft
    DiscardDraft,
}

impl WorkoutCommand {
    pub fn run<R: RemoteStore>(&self, app: &mut App<R>) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            WorkoutSubcommand::Start { name, routine } => {
                let routine_id = match routine {
                    Some(identifier) => match find_routine(app.store().catalog(), identifier) {
                        Some(r) => Some(r.id.clone()),
                        None => return Err(format!("Routine not found: {}", identifier).into()),
                    },
                    None => None,
                };

                let workout = app
                    .store_mut()
                    .start_workout(name.as_deref(), routine_id.as_deref())?;
                println!("Started workout: {} ({})", workout.name, workout.id);
                for exercise in &workout.exercises {
                    println!("  {:<36}  {}", exercise.id, exercise.name);
                }
                Ok(())
            }

            WorkoutSubcommand::AddExercise { exercise } => {
                let exercise_id = match find_exercise(app.store().catalog(), exercise) {
                    Some(e) => e.id.clone(),
                    None => return Err(SessionError::ExerciseNotFound(exercise.clone()).into()),
                };

                let added = app.store_mut().add_exercise_to_workout(&exercise_id)?;
                println!("Added {} ({})", added.name, added.id);
                Ok(())
            }

            WorkoutSubcommand::RemoveExercise { exercise } => {
                let instance_id = instance_id(app, exercise)?;
                let removed = app.store_mut().remove_exercise_from_workout(&instance_id)?;
                println!(
                    "Removed {} with {} set(s)",
                    removed.name,
                    removed.sets.len()
                );
                Ok(())
            }

            WorkoutSubcommand::AddSet {
                exercise,
                reps,
                weight,
                single_dumbbell,
                incomplete,
                notes,
            } => {
                let instance_id = instance_id(app, exercise)?;

                let mut set = NewSet::new(*reps, *weight).with_completed(!incomplete);
                if *single_dumbbell {
                    set = set.single_dumbbell();
                }
                if let Some(notes) = notes {
                    set = set.with_notes(notes);
                }

                let added = app.store_mut().add_set(&instance_id, set)?;
                println!("Logged set {} ({})", added, added.id);
                Ok(())
            }

            WorkoutSubcommand::RemoveSet { exercise, set_id } => {
                let instance_id = instance_id(app, exercise)?;
                let removed = app.store_mut().remove_set(&instance_id, set_id)?;
                println!("Removed set {}", removed);
                Ok(())
            }

            WorkoutSubcommand::Notes { text } => {
                app.store_mut().update_workout_notes(text.as_str())?;
                println!("Notes updated.");
                Ok(())
            }

            WorkoutSubcommand::Show { format } => {
                let workout = match app.store().active_workout() {
                    Some(w) => w,
                    None => {
                        println!("No workout in progress");
                        return Ok(());
                    }
                };

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(workout)?);
                    }
                    OutputFormat::Text => {
                        print!("{}", workout);
                        println!("Volume: {:.1}kg", workout.volume());
                    }
                }
                Ok(())
            }

            WorkoutSubcommand::Complete => {
                let workout = app.store_mut().complete_workout()?;
                println!(
                    "Completed {}: {} set(s), {:.1}kg in {}",
                    workout.name,
                    workout.set_count(),
                    workout.volume(),
                    format_duration(workout.duration)
                );
                Ok(())
            }

            WorkoutSubcommand::Cancel { force } => {
                let name = match app.store().active_workout() {
                    Some(w) => w.name.clone(),
                    None => return Err(SessionError::NoActiveWorkout.into()),
                };

                if !force && !confirm(&format!("Discard workout '{}'?", name))? {
                    println!("Workout kept.");
                    return Ok(());
                }

                app.store_mut().cancel_workout();
                println!("Cancelled workout: {}", name);
                Ok(())
            }

            WorkoutSubcommand::DiscardDraft => {
                if !app.store().has_draft() {
                    return Err(SessionError::NoDraft.into());
                }
                app.store_mut().discard_draft();
                println!("Discarded saved workout draft.");
                Ok(())
            }
        }
    }
}

/// Resolves a workout exercise in the active workout to its instance ID.
fn instance_id<R: RemoteStore>(app: &App<R>, identifier: &str) -> Result<String, SessionError> {
    let workout = app
        .store()
        .active_workout()
        .ok_or(SessionError::NoActiveWorkout)?;
    find_workout_exercise(workout, identifier)
        .map(|e| e.id.clone())
        .ok_or_else(|| SessionError::WorkoutExerciseNotFound(identifier.to_string()))
}
