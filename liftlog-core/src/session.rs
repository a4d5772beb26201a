//! The in-progress workout state machine.
//!
//! # States
//!
//! 1. **NoActiveWorkout** - initial state, and the state after completing or
//!    cancelling
//! 2. **ActiveWorkout** - exactly one workout is being logged
//!
//! Every successful mutation writes the workout to the draft slot before
//! returning. Draft write failures are logged and never fail the mutation.
//! Every `Err` returned from this module means nothing changed.

use std::sync::Arc;

use thiserror::Error;

use crate::catalog::Catalog;
use crate::clock::Clock;
use crate::draft::{DraftSlot, DraftStore};
use crate::id::IdGenerator;
use crate::models::{NewSet, Workout, WorkoutExercise, WorkoutSet};

/// Name used when a workout is started without one.
pub const DEFAULT_WORKOUT_NAME: &str = "Free Workout";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoActiveWorkout,
    ActiveWorkout,
}

/// Reasons a session operation was a no-op.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("No workout in progress")]
    NoActiveWorkout,

    #[error("A workout is already in progress: {0}")]
    AlreadyActive(String),

    #[error("Exercise not found: {0}")]
    ExerciseNotFound(String),

    #[error("Exercise not in this workout: {0}")]
    WorkoutExerciseNotFound(String),

    #[error("Set not found: {0}")]
    SetNotFound(String),

    #[error("Invalid set: {0}")]
    InvalidSet(String),

    #[error("No saved draft")]
    NoDraft,
}

pub struct WorkoutSession<S> {
    active: Option<Workout>,
    draft: DraftStore<S>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl<S: DraftSlot> WorkoutSession<S> {
    pub fn new(slot: S, ids: Arc<dyn IdGenerator>, clock: Arc<dyn Clock>) -> Self {
        Self {
            active: None,
            draft: DraftStore::new(slot),
            ids,
            clock,
        }
    }

    pub fn state(&self) -> SessionState {
        if self.active.is_some() {
            SessionState::ActiveWorkout
        } else {
            SessionState::NoActiveWorkout
        }
    }

    pub fn active_workout(&self) -> Option<&Workout> {
        self.active.as_ref()
    }

    pub fn draft(&self) -> &DraftStore<S> {
        &self.draft
    }

    /// Starts a workout, optionally pre-populated from a routine.
    ///
    /// A routine id that does not resolve degrades to a free workout. Routine
    /// exercises missing from the catalog are skipped. A resolved routine's
    /// name replaces `name`.
    pub fn start_workout(
        &mut self,
        name: Option<&str>,
        routine_id: Option<&str>,
        catalog: &Catalog,
    ) -> Result<&Workout, SessionError> {
        if let Some(active) = &self.active {
            return Err(SessionError::AlreadyActive(active.id.clone()));
        }

        let routine = routine_id.and_then(|id| {
            let routine = catalog.routine(id);
            if routine.is_none() {
                tracing::debug!("Routine {} not found, starting a free workout", id);
            }
            routine
        });

        let mut exercises: Vec<WorkoutExercise> = Vec::new();
        if let Some(routine) = routine {
            for exercise_id in &routine.exercise_ids {
                match catalog.exercise(exercise_id) {
                    Some(exercise) => {
                        let id = unique_id(self.ids.as_ref(), |id| {
                            exercises.iter().any(|e| e.id == id)
                        });
                        exercises.push(WorkoutExercise::new(id, exercise_id, &exercise.name));
                    }
                    None => {
                        tracing::debug!(
                            "Skipping missing exercise {} from routine {}",
                            exercise_id,
                            routine.id
                        );
                    }
                }
            }
        }

        let name = match (routine, name.map(str::trim)) {
            (Some(routine), _) => routine.name.clone(),
            (None, Some(name)) if !name.is_empty() => name.to_string(),
            (None, _) => DEFAULT_WORKOUT_NAME.to_string(),
        };

        let workout =
            Workout::new(self.ids.new_id(), name, self.clock.now()).with_exercises(exercises);
        tracing::info!("Started workout {} ({})", workout.name, workout.id);

        self.active = Some(workout);
        self.persist();
        self.active.as_ref().ok_or(SessionError::NoActiveWorkout)
    }

    /// Appends an exercise, snapshotting its current catalog name.
    pub fn add_exercise(
        &mut self,
        exercise_id: &str,
        catalog: &Catalog,
    ) -> Result<&WorkoutExercise, SessionError> {
        let workout = self.active.as_mut().ok_or(SessionError::NoActiveWorkout)?;
        let exercise = catalog
            .exercise(exercise_id)
            .ok_or_else(|| SessionError::ExerciseNotFound(exercise_id.to_string()))?;

        let id = unique_id(self.ids.as_ref(), |id| {
            workout.exercises.iter().any(|e| e.id == id)
        });
        workout
            .exercises
            .push(WorkoutExercise::new(id, exercise_id, &exercise.name));
        tracing::debug!("Added {} to workout {}", exercise.name, workout.id);

        self.persist();
        self.active
            .as_ref()
            .and_then(|w| w.exercises.last())
            .ok_or(SessionError::NoActiveWorkout)
    }

    /// Removes an exercise by its instance id.
    pub fn remove_exercise(&mut self, instance_id: &str) -> Result<WorkoutExercise, SessionError> {
        let workout = self.active.as_mut().ok_or(SessionError::NoActiveWorkout)?;
        let position = workout
            .exercises
            .iter()
            .position(|e| e.id == instance_id)
            .ok_or_else(|| SessionError::WorkoutExerciseNotFound(instance_id.to_string()))?;

        let removed = workout.exercises.remove(position);
        self.persist();
        Ok(removed)
    }

    /// Appends a set to one exercise of the active workout.
    ///
    /// Sets with zero reps or a negative or non-finite weight are rejected.
    pub fn add_set(&mut self, instance_id: &str, set: NewSet) -> Result<&WorkoutSet, SessionError> {
        let workout = self.active.as_mut().ok_or(SessionError::NoActiveWorkout)?;
        let exercise = workout
            .exercises
            .iter_mut()
            .find(|e| e.id == instance_id)
            .ok_or_else(|| SessionError::WorkoutExerciseNotFound(instance_id.to_string()))?;
        if let Err(reason) = set.validate() {
            tracing::warn!("Rejected set for {}: {}", exercise.name, reason);
            return Err(SessionError::InvalidSet(reason));
        }

        let id = unique_id(self.ids.as_ref(), |id| exercise.sets.iter().any(|s| s.id == id));
        exercise.sets.push(WorkoutSet::from_new(id, set));

        self.persist();
        self.active
            .as_ref()
            .and_then(|w| w.exercise(instance_id))
            .and_then(|e| e.sets.last())
            .ok_or(SessionError::NoActiveWorkout)
    }

    pub fn remove_set(&mut self, instance_id: &str, set_id: &str) -> Result<WorkoutSet, SessionError> {
        let workout = self.active.as_mut().ok_or(SessionError::NoActiveWorkout)?;
        let exercise = workout
            .exercises
            .iter_mut()
            .find(|e| e.id == instance_id)
            .ok_or_else(|| SessionError::WorkoutExerciseNotFound(instance_id.to_string()))?;
        let position = exercise
            .sets
            .iter()
            .position(|s| s.id == set_id)
            .ok_or_else(|| SessionError::SetNotFound(set_id.to_string()))?;

        let removed = exercise.sets.remove(position);
        self.persist();
        Ok(removed)
    }

    /// Replaces the workout notes wholesale.
    pub fn update_notes(&mut self, notes: impl Into<String>) -> Result<(), SessionError> {
        let workout = self.active.as_mut().ok_or(SessionError::NoActiveWorkout)?;
        workout.notes = notes.into();
        self.persist();
        Ok(())
    }

    /// Finishes the active workout, stamping its duration in whole minutes.
    ///
    /// The returned record is final; the draft is cleared.
    pub fn complete(&mut self) -> Result<Workout, SessionError> {
        let mut workout = self.active.take().ok_or(SessionError::NoActiveWorkout)?;

        let elapsed = self.clock.now() - workout.date;
        let minutes = elapsed.num_seconds().max(0) / 60;
        workout.duration = u32::try_from(minutes).unwrap_or(u32::MAX);
        tracing::info!(
            "Completed workout {} ({}) after {} min",
            workout.name,
            workout.id,
            workout.duration
        );

        self.clear_draft();
        Ok(workout)
    }

    /// Discards the active workout, if any, and clears the draft.
    pub fn cancel(&mut self) -> Option<Workout> {
        let discarded = self.active.take();
        if let Some(workout) = &discarded {
            tracing::info!("Cancelled workout {} ({})", workout.name, workout.id);
        }
        self.clear_draft();
        discarded
    }

    /// Makes the saved draft the active workout.
    pub fn restore_draft(&mut self) -> Result<&Workout, SessionError> {
        if let Some(active) = &self.active {
            return Err(SessionError::AlreadyActive(active.id.clone()));
        }
        let workout = self.draft.load().ok_or(SessionError::NoDraft)?;
        tracing::debug!("Restored draft workout {} ({})", workout.name, workout.id);
        self.active = Some(workout);
        self.active.as_ref().ok_or(SessionError::NoDraft)
    }

    pub fn has_draft(&self) -> bool {
        self.draft.exists()
    }

    /// Clears the draft slot without touching the active workout.
    pub fn discard_draft(&mut self) {
        self.clear_draft();
    }

    /// Drops the active workout from memory, leaving the draft slot alone.
    pub fn reset(&mut self) {
        self.active = None;
    }

    fn persist(&mut self) {
        if let Err(e) = self.draft.save(self.active.as_ref()) {
            tracing::warn!("Failed to save workout draft: {}", e);
        }
    }

    fn clear_draft(&mut self) {
        if let Err(e) = self.draft.clear() {
            tracing::warn!("Failed to clear workout draft: {}", e);
        }
    }
}

/// Draws ids until one is not `taken`.
fn unique_id(ids: &dyn IdGenerator, taken: impl Fn(&str) -> bool) -> String {
    loop {
        let id = ids.new_id();
        if !taken(&id) {
            return id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::draft::{DraftError, MemoryDraftSlot};
    use crate::id::SequentialIds;
    use crate::layered::SyncMode;
    use crate::models::{ExerciseDescriptor, RoutineDescriptor};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    struct Fixture {
        session: WorkoutSession<MemoryDraftSlot>,
        catalog: Catalog,
        clock: Arc<ManualClock>,
        slot: MemoryDraftSlot,
    }

    fn start_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 2, 17, 0, 0).unwrap()
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(start_time()));
        let slot = MemoryDraftSlot::new();
        let session = WorkoutSession::new(
            slot.clone(),
            Arc::new(SequentialIds::new("w")),
            clock.clone(),
        );
        let catalog = Catalog::new(SyncMode::Local, Arc::new(SequentialIds::new("e")));
        Fixture {
            session,
            catalog,
            clock,
            slot,
        }
    }

    fn add(catalog: &mut Catalog, name: &str) -> String {
        catalog
            .add_exercise(ExerciseDescriptor::new(name, "Test"))
            .unwrap()
            .id
    }

    fn draft_of(slot: &MemoryDraftSlot) -> Option<Workout> {
        slot.contents()
            .map(|json| serde_json::from_str(&json).unwrap())
    }

    #[test]
    fn test_initial_state() {
        let f = fixture();
        assert_eq!(f.session.state(), SessionState::NoActiveWorkout);
        assert!(f.session.active_workout().is_none());
    }

    #[test]
    fn test_start_free_workout() {
        let mut f = fixture();
        let workout = f.session.start_workout(None, None, &f.catalog).unwrap().clone();

        assert_eq!(workout.name, DEFAULT_WORKOUT_NAME);
        assert_eq!(workout.date, start_time());
        assert_eq!(workout.duration, 0);
        assert!(workout.exercises.is_empty());
        assert_eq!(f.session.state(), SessionState::ActiveWorkout);
        assert_eq!(draft_of(&f.slot), Some(workout));
    }

    #[test]
    fn test_second_start_is_rejected() {
        let mut f = fixture();
        let first = f
            .session
            .start_workout(Some("Morning"), None, &f.catalog)
            .unwrap()
            .id
            .clone();

        let err = f
            .session
            .start_workout(Some("Evening"), None, &f.catalog)
            .unwrap_err();
        assert_eq!(err, SessionError::AlreadyActive(first.clone()));

        let active = f.session.active_workout().unwrap();
        assert_eq!(active.id, first);
        assert_eq!(active.name, "Morning");
    }

    #[test]
    fn test_start_from_routine_skips_missing_exercises() {
        let mut f = fixture();
        let a = add(&mut f.catalog, "A");
        let b = add(&mut f.catalog, "B");
        let routine = f
            .catalog
            .add_routine(RoutineDescriptor::new(
                "Full Body",
                vec![a.clone(), b.clone(), "Z".to_string()],
            ))
            .unwrap();

        let workout = f
            .session
            .start_workout(Some("ignored"), Some(&routine.id), &f.catalog)
            .unwrap();

        assert_eq!(workout.name, "Full Body");
        let exercise_ids: Vec<&str> = workout
            .exercises
            .iter()
            .map(|e| e.exercise_id.as_str())
            .collect();
        assert_eq!(exercise_ids, vec![a.as_str(), b.as_str()]);
        assert_eq!(workout.exercises[0].name, "A");
        assert_ne!(workout.exercises[0].id, workout.exercises[1].id);
    }

    #[test]
    fn test_start_with_unknown_routine_is_free_workout() {
        let mut f = fixture();
        let workout = f
            .session
            .start_workout(Some("Leg Day"), Some("missing"), &f.catalog)
            .unwrap();
        assert_eq!(workout.name, "Leg Day");
        assert!(workout.exercises.is_empty());
    }

    #[test]
    fn test_add_exercise_snapshots_name() {
        let mut f = fixture();
        let squat = add(&mut f.catalog, "Squat");
        f.session.start_workout(None, None, &f.catalog).unwrap();

        let instance = f.session.add_exercise(&squat, &f.catalog).unwrap().clone();
        assert_eq!(instance.name, "Squat");
        assert_eq!(instance.exercise_id, squat);

        // Replace the catalog entry under the same id with a new name
        f.catalog.remove_exercise(&squat).unwrap();
        f.catalog.insert_exercise(crate::models::Exercise {
            id: squat.clone(),
            name: "Back Squat".into(),
            category: "Legs".into(),
            notes: None,
        });

        let active = f.session.active_workout().unwrap();
        assert_eq!(active.exercises[0].name, "Squat");
    }

    #[test]
    fn test_add_exercise_without_workout() {
        let mut f = fixture();
        let squat = add(&mut f.catalog, "Squat");
        assert_eq!(
            f.session.add_exercise(&squat, &f.catalog).unwrap_err(),
            SessionError::NoActiveWorkout
        );
        assert!(f.slot.contents().is_none());
    }

    #[test]
    fn test_add_unknown_exercise_is_noop() {
        let mut f = fixture();
        f.session.start_workout(None, None, &f.catalog).unwrap();
        let before = f.slot.contents();

        assert_eq!(
            f.session.add_exercise("ghost", &f.catalog).unwrap_err(),
            SessionError::ExerciseNotFound("ghost".into())
        );
        assert!(f.session.active_workout().unwrap().exercises.is_empty());
        assert_eq!(f.slot.contents(), before);
    }

    #[test]
    fn test_same_exercise_twice_gets_distinct_instances() {
        let mut f = fixture();
        let squat = add(&mut f.catalog, "Squat");
        f.session.start_workout(None, None, &f.catalog).unwrap();

        let first = f.session.add_exercise(&squat, &f.catalog).unwrap().id.clone();
        let second = f.session.add_exercise(&squat, &f.catalog).unwrap().id.clone();
        assert_ne!(first, second);
    }

    #[test]
    fn test_remove_exercise() {
        let mut f = fixture();
        let squat = add(&mut f.catalog, "Squat");
        let bench = add(&mut f.catalog, "Bench");
        f.session.start_workout(None, None, &f.catalog).unwrap();
        let first = f.session.add_exercise(&squat, &f.catalog).unwrap().id.clone();
        f.session.add_exercise(&bench, &f.catalog).unwrap();

        let removed = f.session.remove_exercise(&first).unwrap();
        assert_eq!(removed.name, "Squat");

        let draft = draft_of(&f.slot).unwrap();
        assert_eq!(draft.exercises.len(), 1);
        assert_eq!(draft.exercises[0].name, "Bench");

        assert_eq!(
            f.session.remove_exercise(&first).unwrap_err(),
            SessionError::WorkoutExerciseNotFound(first)
        );
    }

    #[test]
    fn test_add_set_and_remove_middle_set() {
        let mut f = fixture();
        let bench = add(&mut f.catalog, "Bench");
        f.session.start_workout(None, None, &f.catalog).unwrap();
        let instance = f.session.add_exercise(&bench, &f.catalog).unwrap().id.clone();

        let s1 = f.session.add_set(&instance, NewSet::new(5, 100.0)).unwrap().id.clone();
        let s2 = f.session.add_set(&instance, NewSet::new(6, 95.0)).unwrap().id.clone();
        let s3 = f.session.add_set(&instance, NewSet::new(8, 90.0)).unwrap().id.clone();

        f.session.remove_set(&instance, &s2).unwrap();

        let sets: Vec<&str> = f.session.active_workout().unwrap().exercises[0]
            .sets
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(sets, vec![s1.as_str(), s3.as_str()]);
        assert_eq!(draft_of(&f.slot).unwrap().exercises[0].sets.len(), 2);
    }

    #[test]
    fn test_add_set_rejects_invalid_reps() {
        let mut f = fixture();
        let bench = add(&mut f.catalog, "Bench");
        f.session.start_workout(None, None, &f.catalog).unwrap();
        let instance = f.session.add_exercise(&bench, &f.catalog).unwrap().id.clone();

        let err = f.session.add_set(&instance, NewSet::new(0, 100.0)).unwrap_err();
        assert!(matches!(err, SessionError::InvalidSet(_)));
        let err = f.session.add_set(&instance, NewSet::new(5, -1.0)).unwrap_err();
        assert!(matches!(err, SessionError::InvalidSet(_)));

        assert!(f.session.active_workout().unwrap().exercises[0].sets.is_empty());
    }

    #[test]
    fn test_add_set_to_unknown_exercise() {
        let mut f = fixture();
        f.session.start_workout(None, None, &f.catalog).unwrap();
        assert_eq!(
            f.session.add_set("nope", NewSet::new(5, 10.0)).unwrap_err(),
            SessionError::WorkoutExerciseNotFound("nope".into())
        );
    }

    #[test]
    fn test_remove_unknown_set() {
        let mut f = fixture();
        let bench = add(&mut f.catalog, "Bench");
        f.session.start_workout(None, None, &f.catalog).unwrap();
        let instance = f.session.add_exercise(&bench, &f.catalog).unwrap().id.clone();

        assert_eq!(
            f.session.remove_set(&instance, "nope").unwrap_err(),
            SessionError::SetNotFound("nope".into())
        );
    }

    #[test]
    fn test_update_notes() {
        let mut f = fixture();
        assert_eq!(
            f.session.update_notes("x").unwrap_err(),
            SessionError::NoActiveWorkout
        );

        f.session.start_workout(None, None, &f.catalog).unwrap();
        f.session.update_notes("first").unwrap();
        f.session.update_notes("second").unwrap();

        assert_eq!(f.session.active_workout().unwrap().notes, "second");
        assert_eq!(draft_of(&f.slot).unwrap().notes, "second");
    }

    #[test]
    fn test_complete_computes_floor_minutes() {
        let mut f = fixture();
        f.session.start_workout(None, None, &f.catalog).unwrap();
        f.clock.advance(Duration::seconds(125));

        let workout = f.session.complete().unwrap();
        assert_eq!(workout.duration, 2);
        assert_eq!(workout.date, start_time());
        assert_eq!(f.session.state(), SessionState::NoActiveWorkout);
        assert!(f.slot.contents().is_none());
    }

    #[test]
    fn test_complete_with_clock_behind_start_is_zero() {
        let mut f = fixture();
        f.session.start_workout(None, None, &f.catalog).unwrap();
        f.clock.advance(Duration::seconds(-30));

        assert_eq!(f.session.complete().unwrap().duration, 0);
    }

    #[test]
    fn test_complete_without_workout() {
        let mut f = fixture();
        assert_eq!(f.session.complete().unwrap_err(), SessionError::NoActiveWorkout);
    }

    #[test]
    fn test_cancel_discards_and_clears_draft() {
        let mut f = fixture();
        f.session.start_workout(Some("Quick"), None, &f.catalog).unwrap();

        let discarded = f.session.cancel().unwrap();
        assert_eq!(discarded.name, "Quick");
        assert_eq!(f.session.state(), SessionState::NoActiveWorkout);
        assert!(f.slot.contents().is_none());

        assert!(f.session.cancel().is_none());
    }

    #[test]
    fn test_restore_draft_after_restart() {
        let mut f = fixture();
        let bench = add(&mut f.catalog, "Bench");
        f.session.start_workout(Some("Push"), None, &f.catalog).unwrap();
        let instance = f.session.add_exercise(&bench, &f.catalog).unwrap().id.clone();
        f.session.add_set(&instance, NewSet::new(5, 100.0)).unwrap();
        let original = f.session.active_workout().unwrap().clone();

        // New session over the same slot, as after a process restart
        let mut restarted = WorkoutSession::new(
            f.slot.clone(),
            Arc::new(SequentialIds::new("r")),
            f.clock.clone(),
        );
        assert!(restarted.has_draft());
        let restored = restarted.restore_draft().unwrap();

        assert_eq!(restored, &original);
        assert_eq!(restored.date, start_time());
    }

    #[test]
    fn test_restore_draft_rejected_while_active() {
        let mut f = fixture();
        f.session.start_workout(None, None, &f.catalog).unwrap();
        assert!(matches!(
            f.session.restore_draft().unwrap_err(),
            SessionError::AlreadyActive(_)
        ));
    }

    #[test]
    fn test_restore_without_draft() {
        let mut f = fixture();
        assert_eq!(f.session.restore_draft().unwrap_err(), SessionError::NoDraft);
    }

    #[test]
    fn test_restore_corrupt_draft() {
        let mut f = fixture();
        f.slot.clone().write("{\"id\": 3").unwrap();
        assert!(f.session.has_draft());
        assert_eq!(f.session.restore_draft().unwrap_err(), SessionError::NoDraft);
    }

    #[test]
    fn test_discard_draft_keeps_active_workout() {
        let mut f = fixture();
        f.session.start_workout(None, None, &f.catalog).unwrap();
        f.session.discard_draft();

        assert!(!f.session.has_draft());
        assert!(f.session.active_workout().is_some());
    }

    struct BrokenSlot;

    impl DraftSlot for BrokenSlot {
        fn read(&self) -> Result<Option<String>, DraftError> {
            Err(DraftError::Io {
                path: "broken".into(),
                source: std::io::Error::other("disk gone"),
            })
        }

        fn write(&mut self, _contents: &str) -> Result<(), DraftError> {
            self.read().map(|_| ())
        }

        fn remove(&mut self) -> Result<(), DraftError> {
            self.read().map(|_| ())
        }
    }

    #[test]
    fn test_storage_failure_never_blocks_mutations() {
        let mut catalog = Catalog::new(SyncMode::Local, Arc::new(SequentialIds::new("e")));
        let bench = add(&mut catalog, "Bench");
        let mut session = WorkoutSession::new(
            BrokenSlot,
            Arc::new(SequentialIds::new("w")),
            Arc::new(ManualClock::new(start_time())),
        );

        session.start_workout(None, None, &catalog).unwrap();
        let instance = session.add_exercise(&bench, &catalog).unwrap().id.clone();
        session.add_set(&instance, NewSet::new(3, 60.0)).unwrap();

        assert!(!session.has_draft());
        assert_eq!(session.complete().unwrap().set_count(), 1);
    }
}
