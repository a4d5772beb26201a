//! Exercise catalog and routine definitions.

use std::sync::Arc;

use thiserror::Error;

use crate::defaults::default_exercises;
use crate::id::IdGenerator;
use crate::layered::{Layered, PendingChange, Placement, SyncMode};
use crate::models::{Exercise, ExerciseDescriptor, Routine, RoutineDescriptor};

/// Reasons a catalog operation was a no-op.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Exercise not found: {0}")]
    ExerciseNotFound(String),

    #[error("Routine not found: {0}")]
    RoutineNotFound(String),
}

/// Owns the exercises and routines available for composing workouts.
pub struct Catalog {
    ids: Arc<dyn IdGenerator>,
    exercises: Layered<Exercise>,
    routines: Layered<Routine>,
}

impl Catalog {
    pub fn new(mode: SyncMode, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            ids,
            exercises: Layered::new(mode, Placement::Back),
            routines: Layered::new(mode, Placement::Back),
        }
    }

    /// Validates and adds an exercise, assigning it a new id.
    ///
    /// Name and category are trimmed and must not be blank.
    pub fn add_exercise(&mut self, descriptor: ExerciseDescriptor) -> Result<Exercise, CatalogError> {
        let name = descriptor.name.trim();
        let category = descriptor.category.trim();
        if name.is_empty() {
            return Err(CatalogError::Validation("exercise name is required".into()));
        }
        if category.is_empty() {
            return Err(CatalogError::Validation(
                "exercise category is required".into(),
            ));
        }

        let exercise = Exercise {
            id: self.ids.new_id(),
            name: name.to_string(),
            category: category.to_string(),
            notes: descriptor.notes,
        };
        tracing::debug!("Adding exercise {} ({})", exercise.name, exercise.id);
        self.exercises.insert(exercise.clone());
        Ok(exercise)
    }

    pub fn remove_exercise(&mut self, id: &str) -> Result<Exercise, CatalogError> {
        self.exercises
            .remove(id)
            .ok_or_else(|| CatalogError::ExerciseNotFound(id.to_string()))
    }

    /// Validates and adds a routine. Exercise ids are not checked against the
    /// catalog; unresolvable ids are skipped when a workout is started.
    pub fn add_routine(&mut self, descriptor: RoutineDescriptor) -> Result<Routine, CatalogError> {
        let name = descriptor.name.trim();
        if name.is_empty() {
            return Err(CatalogError::Validation("routine name is required".into()));
        }
        if descriptor.exercise_ids.is_empty() {
            return Err(CatalogError::Validation(
                "a routine needs at least one exercise".into(),
            ));
        }

        let routine = Routine {
            id: self.ids.new_id(),
            name: name.to_string(),
            exercise_ids: descriptor.exercise_ids,
            notes: descriptor.notes,
        };
        tracing::debug!("Adding routine {} ({})", routine.name, routine.id);
        self.routines.insert(routine.clone());
        Ok(routine)
    }

    pub fn remove_routine(&mut self, id: &str) -> Result<Routine, CatalogError> {
        self.routines
            .remove(id)
            .ok_or_else(|| CatalogError::RoutineNotFound(id.to_string()))
    }

    /// Adds the built-in exercises when the catalog has none.
    ///
    /// Returns the exercises that were added.
    pub fn seed_defaults(&mut self) -> Vec<Exercise> {
        if !self.exercises.is_empty() {
            return Vec::new();
        }
        default_exercises()
            .into_iter()
            .filter_map(|descriptor| self.add_exercise(descriptor).ok())
            .collect()
    }

    // ========== Read operations ==========

    pub fn exercise(&self, id: &str) -> Option<&Exercise> {
        self.exercises.get(id)
    }

    pub fn routine(&self, id: &str) -> Option<&Routine> {
        self.routines.get(id)
    }

    pub fn exercises(&self) -> Vec<&Exercise> {
        self.exercises.items()
    }

    pub fn routines(&self) -> Vec<&Routine> {
        self.routines.items()
    }

    /// Case-insensitive exact name match.
    pub fn find_exercise_by_name(&self, name: &str) -> Option<&Exercise> {
        let name = name.trim().to_lowercase();
        self.exercises
            .items()
            .into_iter()
            .find(|e| e.name.to_lowercase() == name)
    }

    /// Exercises grouped by category, categories in first-seen order.
    pub fn exercises_by_category(&self) -> Vec<(&str, Vec<&Exercise>)> {
        let mut groups: Vec<(&str, Vec<&Exercise>)> = Vec::new();
        for exercise in self.exercises.items() {
            match groups
                .iter()
                .position(|(category, _)| *category == exercise.category)
            {
                Some(index) => groups[index].1.push(exercise),
                None => groups.push((exercise.category.as_str(), vec![exercise])),
            }
        }
        groups
    }

    /// Exercises confirmed by the remote, or all exercises in local mode.
    pub fn confirmed_exercises(&self) -> &[Exercise] {
        self.exercises.confirmed()
    }

    pub fn confirmed_routines(&self) -> &[Routine] {
        self.routines.confirmed()
    }

    pub fn pending_exercises(&self) -> &[PendingChange<Exercise>] {
        self.exercises.pending()
    }

    pub fn pending_routines(&self) -> &[PendingChange<Routine>] {
        self.routines.pending()
    }

    // ========== Bulk replacement ==========

    pub fn replace_exercises(&mut self, exercises: Vec<Exercise>) {
        self.exercises.replace_confirmed(exercises);
    }

    pub fn replace_routines(&mut self, routines: Vec<Routine>) {
        self.routines.replace_confirmed(routines);
    }

    /// Adds an already-identified exercise (imports, cache loads).
    pub fn insert_exercise(&mut self, exercise: Exercise) {
        self.exercises.insert(exercise);
    }

    pub fn insert_routine(&mut self, routine: Routine) {
        self.routines.insert(routine);
    }

    pub fn clear(&mut self) {
        self.exercises.clear();
        self.routines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::SequentialIds;

    fn local_catalog() -> Catalog {
        Catalog::new(SyncMode::Local, Arc::new(SequentialIds::new("id")))
    }

    #[test]
    fn test_add_exercise_assigns_id_and_is_visible() {
        let mut catalog = local_catalog();
        let squat = catalog
            .add_exercise(ExerciseDescriptor::new("  Squat ", " Legs"))
            .unwrap();

        assert_eq!(squat.id, "id1");
        assert_eq!(squat.name, "Squat");
        assert_eq!(squat.category, "Legs");
        assert_eq!(catalog.exercise("id1"), Some(&squat));
        assert_eq!(catalog.exercises().len(), 1);
    }

    #[test]
    fn test_add_exercise_requires_name_and_category() {
        let mut catalog = local_catalog();

        let err = catalog
            .add_exercise(ExerciseDescriptor::new("   ", "Legs"))
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));

        let err = catalog
            .add_exercise(ExerciseDescriptor::new("Squat", ""))
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));

        assert!(catalog.exercises().is_empty());
    }

    #[test]
    fn test_remove_exercise() {
        let mut catalog = local_catalog();
        let squat = catalog
            .add_exercise(ExerciseDescriptor::new("Squat", "Legs"))
            .unwrap();

        let removed = catalog.remove_exercise(&squat.id).unwrap();
        assert_eq!(removed.name, "Squat");
        assert!(catalog.exercise(&squat.id).is_none());

        assert_eq!(
            catalog.remove_exercise(&squat.id),
            Err(CatalogError::ExerciseNotFound(squat.id.clone()))
        );
    }

    #[test]
    fn test_add_routine_validation() {
        let mut catalog = local_catalog();

        let err = catalog
            .add_routine(RoutineDescriptor::new("Push", vec![]))
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));

        let err = catalog
            .add_routine(RoutineDescriptor::new(" ", vec!["e1".into()]))
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));

        let routine = catalog
            .add_routine(RoutineDescriptor::new(" Push ", vec!["e1".into()]))
            .unwrap();
        assert_eq!(routine.name, "Push");
        assert_eq!(catalog.routine(&routine.id), Some(&routine));
    }

    #[test]
    fn test_remove_routine_unknown() {
        let mut catalog = local_catalog();
        assert_eq!(
            catalog.remove_routine("nope"),
            Err(CatalogError::RoutineNotFound("nope".into()))
        );
    }

    #[test]
    fn test_seed_defaults_only_when_empty() {
        let mut catalog = local_catalog();
        let added = catalog.seed_defaults();
        assert!(!added.is_empty());
        assert_eq!(catalog.exercises().len(), added.len());

        assert!(catalog.seed_defaults().is_empty());
    }

    #[test]
    fn test_seed_defaults_skipped_with_existing_exercise() {
        let mut catalog = local_catalog();
        catalog
            .add_exercise(ExerciseDescriptor::new("Squat", "Legs"))
            .unwrap();
        assert!(catalog.seed_defaults().is_empty());
        assert_eq!(catalog.exercises().len(), 1);
    }

    #[test]
    fn test_find_exercise_by_name_case_insensitive() {
        let mut catalog = local_catalog();
        catalog
            .add_exercise(ExerciseDescriptor::new("Bench Press", "Chest"))
            .unwrap();
        assert!(catalog.find_exercise_by_name("bench press").is_some());
        assert!(catalog.find_exercise_by_name("bench").is_none());
    }

    #[test]
    fn test_exercises_by_category_keeps_first_seen_order() {
        let mut catalog = local_catalog();
        for (name, category) in [
            ("Squat", "Legs"),
            ("Bench", "Chest"),
            ("Lunge", "Legs"),
        ] {
            catalog
                .add_exercise(ExerciseDescriptor::new(name, category))
                .unwrap();
        }

        let groups = catalog.exercises_by_category();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "Legs");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0, "Chest");
    }

    #[test]
    fn test_remote_mode_add_is_pending() {
        let mut catalog = Catalog::new(SyncMode::Remote, Arc::new(SequentialIds::new("id")));
        let squat = catalog
            .add_exercise(ExerciseDescriptor::new("Squat", "Legs"))
            .unwrap();

        assert_eq!(catalog.pending_exercises().len(), 1);
        assert!(catalog.exercise(&squat.id).is_some());

        catalog.replace_exercises(vec![squat.clone()]);
        assert!(catalog.pending_exercises().is_empty());
        assert!(catalog.exercise(&squat.id).is_some());
    }
}
