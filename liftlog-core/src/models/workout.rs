use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::workout_set::WorkoutSet;

/// An exercise as performed inside one workout.
///
/// `name` is copied from the catalog when the exercise is added and is never
/// refreshed afterwards, so history keeps the name it was logged under.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutExercise {
    /// Instance id, unique within the workout.
    pub id: String,
    pub exercise_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sets: Vec<WorkoutSet>,
}

impl WorkoutExercise {
    pub fn new(
        id: impl Into<String>,
        exercise_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            exercise_id: exercise_id.into(),
            name: name.into(),
            sets: Vec::new(),
        }
    }

    pub fn volume(&self) -> f64 {
        self.sets
            .iter()
            .map(WorkoutSet::volume)
            .fold(0.0, |total, volume| total + volume)
    }
}

/// A workout, either the active one or a completed history record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    pub id: String,
    pub name: String,
    /// Start time.
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub exercises: Vec<WorkoutExercise>,
    /// Whole minutes between start and completion; 0 while active.
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub notes: String,
}

impl Workout {
    pub fn new(id: impl Into<String>, name: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            date,
            exercises: Vec::new(),
            duration: 0,
            notes: String::new(),
        }
    }

    pub fn with_exercises(mut self, exercises: Vec<WorkoutExercise>) -> Self {
        self.exercises = exercises;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn exercise(&self, instance_id: &str) -> Option<&WorkoutExercise> {
        self.exercises.iter().find(|e| e.id == instance_id)
    }

    /// Sum of `weight × reps` over every set.
    pub fn volume(&self) -> f64 {
        self.exercises
            .iter()
            .map(WorkoutExercise::volume)
            .fold(0.0, |total, volume| total + volume)
    }

    pub fn set_count(&self) -> usize {
        self.exercises.iter().map(|e| e.sets.len()).sum()
    }
}

/// Renders a duration in minutes the way history lists show it.
pub fn format_duration(minutes: u32) -> String {
    if minutes < 60 {
        return format!("{} min", minutes);
    }
    let hours = minutes / 60;
    let mins = minutes % 60;
    if mins > 0 {
        format!("{}h {}m", hours, mins)
    } else {
        format!("{}h", hours)
    }
}

impl fmt::Display for Workout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", "=".repeat(self.name.chars().count()))?;
        writeln!(f, "Started: {}", self.date.format("%Y-%m-%d %H:%M"))?;
        if self.duration > 0 {
            writeln!(f, "Duration: {}", format_duration(self.duration))?;
        }
        writeln!(
            f,
            "{} exercises, {} sets",
            self.exercises.len(),
            self.set_count()
        )?;

        for exercise in &self.exercises {
            writeln!(f, "\n{} ({})", exercise.name, exercise.id)?;
            for set in &exercise.sets {
                writeln!(f, "  - {} ({})", set, set.id)?;
            }
        }

        if !self.notes.is_empty() {
            writeln!(f, "\nNotes: {}", self.notes)?;
        }

        Ok(())
    }
}
