use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// One logged set. Sets are never edited in place, only removed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSet {
    pub id: String,
    #[serde(default, deserialize_with = "lenient_reps")]
    pub reps: u32,
    #[serde(default, deserialize_with = "lenient_weight")]
    pub weight: f64,
    #[serde(default)]
    pub is_single_dumbbell: bool,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Reads a number that may be stored as a number or numeric text.
/// Anything else, `null` included, counts as zero.
fn lenient_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn lenient_reps<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(lenient_number(&value)
        .filter(|n| *n >= 0.0 && *n <= f64::from(u32::MAX))
        .map(|n| n as u32)
        .unwrap_or(0))
}

fn lenient_weight<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(lenient_number(&value).unwrap_or(0.0))
}

/// The caller-supplied part of a set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewSet {
    pub reps: u32,
    pub weight: f64,
    #[serde(default)]
    pub is_single_dumbbell: bool,
    #[serde(default = "default_completed")]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn default_completed() -> bool {
    true
}

impl NewSet {
    /// A completed two-handed set.
    pub fn new(reps: u32, weight: f64) -> Self {
        Self {
            reps,
            weight,
            is_single_dumbbell: false,
            completed: true,
            notes: None,
        }
    }

    pub fn single_dumbbell(mut self) -> Self {
        self.is_single_dumbbell = true;
        self
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Checks the structural rules a stored set must satisfy.
    ///
    /// Returns a description of the first violated rule.
    pub fn validate(&self) -> Result<(), String> {
        if self.reps == 0 {
            return Err("reps must be a positive integer".to_string());
        }
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(format!("weight must be non-negative, got {}", self.weight));
        }
        Ok(())
    }
}

impl WorkoutSet {
    pub fn from_new(id: impl Into<String>, set: NewSet) -> Self {
        Self {
            id: id.into(),
            reps: set.reps,
            weight: set.weight,
            is_single_dumbbell: set.is_single_dumbbell,
            completed: set.completed,
            notes: set.notes,
        }
    }

    /// `weight × reps`, with non-finite weights counting as zero.
    pub fn volume(&self) -> f64 {
        let volume = self.weight * f64::from(self.reps);
        if volume.is_finite() {
            volume
        } else {
            0.0
        }
    }
}

impl fmt::Display for WorkoutSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}kg×{}", self.weight, self.reps)?;
        if self.is_single_dumbbell {
            write!(f, "(1)")?;
        }
        Ok(())
    }
}
