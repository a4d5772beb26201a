use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Best-ever set for one exercise name: heaviest weight, then most reps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersonalRecord {
    pub exercise_name: String,
    pub weight: f64,
    pub reps: u32,
    /// Start date of the workout the set was logged in.
    pub date: DateTime<Utc>,
}

impl PersonalRecord {
    /// True when a set of `weight × reps` beats this record.
    pub fn is_beaten_by(&self, weight: f64, reps: u32) -> bool {
        weight > self.weight || (weight == self.weight && reps > self.reps)
    }
}

impl fmt::Display for PersonalRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}kg × {} ({})",
            self.exercise_name,
            self.weight,
            self.reps,
            self.date.format("%Y-%m-%d")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(weight: f64, reps: u32) -> PersonalRecord {
        PersonalRecord {
            exercise_name: "Bench".into(),
            weight,
            reps,
            date: Utc::now(),
        }
    }

    #[test]
    fn test_heavier_beats() {
        assert!(record(100.0, 5).is_beaten_by(102.5, 1));
        assert!(!record(100.0, 5).is_beaten_by(97.5, 12));
    }

    #[test]
    fn test_more_reps_beats_on_equal_weight() {
        assert!(record(100.0, 5).is_beaten_by(100.0, 8));
        assert!(!record(100.0, 5).is_beaten_by(100.0, 5));
    }
}
