use serde::{Deserialize, Serialize};
use std::fmt;

/// A named, ordered list of exercises used to pre-populate a workout.
///
/// Exercises are referenced weakly by id. A routine may outlive the
/// exercises it points at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Routine {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub exercise_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoutineDescriptor {
    pub name: String,
    pub exercise_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl RoutineDescriptor {
    pub fn new(name: impl Into<String>, exercise_ids: Vec<String>) -> Self {
        Self {
            name: name.into(),
            exercise_ids,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

impl Routine {
    pub fn from_descriptor(id: impl Into<String>, descriptor: RoutineDescriptor) -> Self {
        Self {
            id: id.into(),
            name: descriptor.name,
            exercise_ids: descriptor.exercise_ids,
            notes: descriptor.notes,
        }
    }
}

impl fmt::Display for Routine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} exercises)", self.name, self.exercise_ids.len())
    }
}
