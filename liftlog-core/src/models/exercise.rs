use serde::{Deserialize, Serialize};
use std::fmt;

/// An exercise in the catalog.
///
/// Exercises are immutable once created; the only way to change one is to
/// delete it and add a new one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: String,
    pub name: String,
    /// Free-form grouping label (chest, back, legs, ...).
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// The caller-supplied part of a new exercise. The catalog assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseDescriptor {
    pub name: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ExerciseDescriptor {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

impl Exercise {
    pub fn from_descriptor(id: impl Into<String>, descriptor: ExerciseDescriptor) -> Self {
        Self {
            id: id.into(),
            name: descriptor.name,
            category: descriptor.category,
            notes: descriptor.notes,
        }
    }
}

impl fmt::Display for Exercise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_descriptor() {
        let descriptor = ExerciseDescriptor::new("Squat", "Legs").with_notes("low bar");
        let exercise = Exercise::from_descriptor("e1", descriptor);

        assert_eq!(exercise.id, "e1");
        assert_eq!(exercise.name, "Squat");
        assert_eq!(exercise.category, "Legs");
        assert_eq!(exercise.notes.as_deref(), Some("low bar"));
    }

    #[test]
    fn test_display() {
        let exercise = Exercise::from_descriptor("e1", ExerciseDescriptor::new("Squat", "Legs"));
        assert_eq!(exercise.to_string(), "Squat [Legs]");
    }

    #[test]
    fn test_missing_category_defaults_to_empty() {
        let exercise: Exercise = serde_json::from_str(r#"{"id":"e1","name":"Plank"}"#).unwrap();
        assert_eq!(exercise.category, "");
        assert!(exercise.notes.is_none());
    }
}
