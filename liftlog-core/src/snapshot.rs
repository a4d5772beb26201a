//! Export/import blob for backups.
//!
//! ```json
//! {
//!   "workouts": [...],
//!   "routines": [...],
//!   "exercises": [...],
//!   "exportDate": "2025-03-01T10:00:00Z"
//! }
//! ```
//!
//! All three arrays must be present, even if empty. Entries that fail to
//! decode are skipped.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::id::IdGenerator;
use crate::models::{Exercise, Routine, Workout};

/// Default file name for user backups.
pub const DEFAULT_BACKUP_FILE: &str = "workout-backup.json";

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Backup is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Backup is missing the `{0}` array")]
    MissingCollection(&'static str),

    #[error("I/O error for {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSnapshot {
    pub workouts: Vec<Workout>,
    pub routines: Vec<Routine>,
    pub exercises: Vec<Exercise>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_date: Option<DateTime<Utc>>,
}

/// How many entities an import created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub exercises: usize,
    pub routines: usize,
    pub workouts: usize,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} exercises, {} routines, {} workouts",
            self.exercises, self.routines, self.workouts
        )
    }
}

impl ExportSnapshot {
    pub fn new(
        workouts: Vec<Workout>,
        routines: Vec<Routine>,
        exercises: Vec<Exercise>,
        export_date: DateTime<Utc>,
    ) -> Self {
        Self {
            workouts,
            routines,
            exercises,
            export_date: Some(export_date),
        }
    }

    pub fn summary(&self) -> ImportSummary {
        ImportSummary {
            exercises: self.exercises.len(),
            routines: self.routines.len(),
            workouts: self.workouts.len(),
        }
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a blob, rejecting it unless all three arrays are present.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let value: Value = serde_json::from_str(json)?;

        let workouts = collection(&value, "workouts")?;
        let routines = collection(&value, "routines")?;
        let exercises = collection(&value, "exercises")?;
        let export_date = value
            .get("exportDate")
            .cloned()
            .and_then(|date| serde_json::from_value(date).ok());

        Ok(Self {
            workouts: decode_entries("workouts", workouts),
            routines: decode_entries("routines", routines),
            exercises: decode_entries("exercises", exercises),
            export_date,
        })
    }

    pub fn write_file(&self, path: &Path) -> Result<(), SnapshotError> {
        let json = self.to_json()?;
        fs::write(path, json).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn read_file(path: &Path) -> Result<Self, SnapshotError> {
        let json = fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Copies every entity under a new id.
    ///
    /// Routine `exerciseIds` and workout `exerciseId` references that point
    /// at an exercise in this snapshot are rewritten to its new id; other
    /// references are kept as they are.
    pub fn with_fresh_ids(&self, ids: &dyn IdGenerator) -> Self {
        let mut remap: HashMap<&str, String> = HashMap::new();
        let exercises = self
            .exercises
            .iter()
            .map(|exercise| {
                let id = ids.new_id();
                remap.insert(exercise.id.as_str(), id.clone());
                Exercise {
                    id,
                    ..exercise.clone()
                }
            })
            .collect();

        let resolve = |id: &str| remap.get(id).cloned().unwrap_or_else(|| id.to_string());

        let routines = self
            .routines
            .iter()
            .map(|routine| Routine {
                id: ids.new_id(),
                exercise_ids: routine.exercise_ids.iter().map(|id| resolve(id)).collect(),
                ..routine.clone()
            })
            .collect();

        let workouts = self
            .workouts
            .iter()
            .map(|workout| {
                let mut copy = workout.clone();
                copy.id = ids.new_id();
                for exercise in &mut copy.exercises {
                    exercise.id = ids.new_id();
                    exercise.exercise_id = resolve(&exercise.exercise_id);
                    for set in &mut exercise.sets {
                        set.id = ids.new_id();
                    }
                }
                copy
            })
            .collect();

        Self {
            workouts,
            routines,
            exercises,
            export_date: self.export_date,
        }
    }
}

fn collection<'a>(value: &'a Value, key: &'static str) -> Result<&'a Vec<Value>, SnapshotError> {
    value
        .get(key)
        .and_then(Value::as_array)
        .ok_or(SnapshotError::MissingCollection(key))
}

fn decode_entries<T: DeserializeOwned>(key: &str, entries: &[Value]) -> Vec<T> {
    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry.clone()) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!("Skipping {} entry {} in backup: {}", key, index, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::SequentialIds;
    use crate::models::{NewSet, WorkoutExercise, WorkoutSet};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn sample() -> ExportSnapshot {
        let date = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();
        let squat = Exercise {
            id: "e1".into(),
            name: "Squat".into(),
            category: "Legs".into(),
            notes: None,
        };
        let routine = Routine {
            id: "r1".into(),
            name: "Legs".into(),
            exercise_ids: vec!["e1".into(), "gone".into()],
            notes: None,
        };
        let mut we = WorkoutExercise::new("we1", "e1", "Squat");
        we.sets.push(WorkoutSet::from_new("s1", NewSet::new(5, 100.0)));
        let workout = Workout::new("w1", "Legs", date).with_exercises(vec![we]);

        ExportSnapshot::new(vec![workout], vec![routine], vec![squat], date)
    }

    #[test]
    fn test_json_uses_export_field_names() {
        let json = sample().to_json().unwrap();
        assert!(json.contains("\"exportDate\""));
        assert!(json.contains("\"exerciseIds\""));
        assert!(json.contains("\"isSingleDumbbell\""));

        let parsed = ExportSnapshot::from_json(&json).unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn test_missing_collection_is_rejected() {
        let err = ExportSnapshot::from_json(r#"{"workouts": [], "routines": []}"#).unwrap_err();
        assert!(matches!(err, SnapshotError::MissingCollection("exercises")));

        let err =
            ExportSnapshot::from_json(r#"{"workouts": {}, "routines": [], "exercises": []}"#)
                .unwrap_err();
        assert!(matches!(err, SnapshotError::MissingCollection("workouts")));
    }

    #[test]
    fn test_empty_collections_are_accepted() {
        let parsed =
            ExportSnapshot::from_json(r#"{"workouts": [], "routines": [], "exercises": []}"#)
                .unwrap();
        assert_eq!(parsed.summary(), ImportSummary::default());
        assert!(parsed.export_date.is_none());
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let json = r#"{
            "workouts": [{"id": "w1"}],
            "routines": [],
            "exercises": [{"id": "e1", "name": "Squat"}, 42]
        }"#;
        let parsed = ExportSnapshot::from_json(json).unwrap();
        assert!(parsed.workouts.is_empty());
        assert_eq!(parsed.exercises.len(), 1);
        assert_eq!(parsed.exercises[0].category, "");
    }

    #[test]
    fn test_null_set_weight_keeps_workout() {
        let json = r#"{
            "workouts": [{
                "id": "w1",
                "name": "Legs",
                "date": "2025-03-01T10:00:00Z",
                "exercises": [{
                    "id": "we1",
                    "exerciseId": "e1",
                    "name": "Squat",
                    "sets": [{"id": "s1", "reps": 5, "weight": null}]
                }]
            }],
            "routines": [],
            "exercises": []
        }"#;
        let parsed = ExportSnapshot::from_json(json).unwrap();
        assert_eq!(parsed.workouts.len(), 1);
        assert_eq!(parsed.workouts[0].exercises[0].sets[0].weight, 0.0);
        assert_eq!(parsed.workouts[0].exercises[0].sets[0].reps, 5);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            ExportSnapshot::from_json("not json"),
            Err(SnapshotError::Parse(_))
        ));
    }

    #[test]
    fn test_fresh_ids_remap_references() {
        let fresh = sample().with_fresh_ids(&SequentialIds::new("n"));

        let new_exercise_id = fresh.exercises[0].id.clone();
        assert_ne!(new_exercise_id, "e1");
        assert_eq!(
            fresh.routines[0].exercise_ids,
            vec![new_exercise_id.clone(), "gone".to_string()]
        );

        let workout = &fresh.workouts[0];
        assert_ne!(workout.id, "w1");
        assert_ne!(workout.exercises[0].id, "we1");
        assert_ne!(workout.exercises[0].sets[0].id, "s1");
        assert_eq!(workout.exercises[0].exercise_id, new_exercise_id);
        assert_eq!(workout.exercises[0].name, "Squat");
        assert_eq!(workout.date, sample().workouts[0].date);
    }

    #[test]
    fn test_file_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(DEFAULT_BACKUP_FILE);

        sample().write_file(&path).unwrap();
        assert_eq!(ExportSnapshot::read_file(&path).unwrap(), sample());

        let missing = temp_dir.path().join("missing.json");
        assert!(matches!(
            ExportSnapshot::read_file(&missing),
            Err(SnapshotError::Io { .. })
        ));
    }
}
