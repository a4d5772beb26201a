mod exercise;
mod personal_record;
mod routine;
mod workout;
mod workout_set;

pub use exercise::{Exercise, ExerciseDescriptor};
pub use personal_record::PersonalRecord;
pub use routine::{Routine, RoutineDescriptor};
pub use workout::{format_duration, Workout, WorkoutExercise};
pub use workout_set::{NewSet, WorkoutSet};

/// Entities addressable by a string id inside a collection.
pub trait Entity {
    fn id(&self) -> &str;
}

impl Entity for Exercise {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Routine {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Workout {
    fn id(&self) -> &str {
        &self.id
    }
}
