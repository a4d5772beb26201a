mod backup;
mod config_cmd;
mod exercise;
mod history;
mod routine;
mod sync_cmd;
mod workout;

pub use backup::BackupCommand;
pub use config_cmd::ConfigCommand;
pub use exercise::ExerciseCommand;
pub use history::HistoryCommand;
pub use routine::RoutineCommand;
pub use sync_cmd::SyncCommand;
pub use workout::WorkoutCommand;

use clap::ValueEnum;
use std::io::{self, Write};

use liftlog_core::{Catalog, Exercise, Routine, Workout, WorkoutExercise};

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Finds an exercise by ID, falling back to a case-insensitive name match.
pub fn find_exercise<'a>(catalog: &'a Catalog, identifier: &str) -> Option<&'a Exercise> {
    catalog
        .exercise(identifier)
        .or_else(|| catalog.find_exercise_by_name(identifier))
}

/// Finds a routine by ID, falling back to a case-insensitive name match.
pub fn find_routine<'a>(catalog: &'a Catalog, identifier: &str) -> Option<&'a Routine> {
    catalog.routine(identifier).or_else(|| {
        let name = identifier.trim().to_lowercase();
        catalog
            .routines()
            .into_iter()
            .find(|r| r.name.to_lowercase() == name)
    })
}

/// Finds an exercise in the workout by instance ID or exercise name.
pub fn find_workout_exercise<'a>(
    workout: &'a Workout,
    identifier: &str,
) -> Option<&'a WorkoutExercise> {
    workout.exercise(identifier).or_else(|| {
        let name = identifier.trim().to_lowercase();
        workout
            .exercises
            .iter()
            .find(|e| e.name.to_lowercase() == name)
    })
}

/// Shortens `text` to `width` characters for table output.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let kept: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}

/// Asks a yes/no question on stdin. Anything but "y" is a no.
pub fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}
