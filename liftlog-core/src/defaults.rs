//! Built-in exercise catalog offered to new users.

use crate::models::ExerciseDescriptor;

const DEFAULT_EXERCISES: &[(&str, &str)] = &[
    // Chest
    ("Flat Bench Press", "Chest"),
    ("Incline Bench Press", "Chest"),
    ("Dumbbell Flyes", "Chest"),
    ("Parallel Bar Dips", "Chest"),
    ("Dumbbell Press", "Chest"),
    ("Cable Crossover", "Chest"),
    // Back
    ("Pull-ups", "Back"),
    ("Lat Pulldown", "Back"),
    ("Barbell Row", "Back"),
    ("Dumbbell Row", "Back"),
    ("Machine Row", "Back"),
    ("Pullover", "Back"),
    ("Deadlift", "Back"),
    // Legs
    ("Squat", "Legs"),
    ("Leg Press", "Legs"),
    ("Leg Extension", "Legs"),
    ("Leg Curl", "Legs"),
    ("Bulgarian Split Squat", "Legs"),
    ("Lunges", "Legs"),
    ("Hip Thrust", "Legs"),
    ("Romanian Deadlift", "Legs"),
    ("Standing Calf Raise", "Legs"),
    ("Seated Calf Raise", "Legs"),
    // Shoulders
    ("Overhead Press", "Shoulders"),
    ("Lateral Raises", "Shoulders"),
    ("Front Raises", "Shoulders"),
    ("Reverse Flyes", "Shoulders"),
    ("Arnold Press", "Shoulders"),
    ("Shrugs", "Shoulders"),
    // Biceps
    ("Barbell Curl", "Biceps"),
    ("Dumbbell Curl", "Biceps"),
    ("Hammer Curl", "Biceps"),
    ("Preacher Curl", "Biceps"),
    ("Concentration Curl", "Biceps"),
    ("Cable Curl", "Biceps"),
    // Triceps
    ("Triceps Extension", "Triceps"),
    ("Bench Dips", "Triceps"),
    ("Skull Crushers", "Triceps"),
    ("Triceps Kickback", "Triceps"),
    ("Overhead Cable Extension", "Triceps"),
    ("Triceps Pushdown", "Triceps"),
    // Core
    ("Crunch", "Core"),
    ("Plank", "Core"),
    ("Leg Raises", "Core"),
    ("Russian Twist", "Core"),
    ("Ab Wheel", "Core"),
    ("Mountain Climbers", "Core"),
    // Cardio
    ("Running", "Cardio"),
    ("Stationary Bike", "Cardio"),
    ("Elliptical", "Cardio"),
    ("Rowing", "Cardio"),
    ("Jump Rope", "Cardio"),
];

pub fn default_exercises() -> Vec<ExerciseDescriptor> {
    DEFAULT_EXERCISES
        .iter()
        .map(|(name, category)| ExerciseDescriptor::new(*name, *category))
        .collect()
}
