//! The owned aggregate collaborators drive.
//!
//! A [`WorkoutStore`] bundles the catalog, the session engine and history,
//! and in remote mode records every local write in an ordered outbox that
//! the sync adapter later flushes.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{Catalog, CatalogError};
use crate::clock::Clock;
use crate::draft::DraftSlot;
use crate::history::History;
use crate::id::IdGenerator;
use crate::layered::SyncMode;
use crate::models::{
    Entity, Exercise, ExerciseDescriptor, NewSet, PersonalRecord, Routine, RoutineDescriptor,
    Workout, WorkoutExercise, WorkoutSet,
};
use crate::session::{SessionError, SessionState, WorkoutSession};
use crate::snapshot::{ExportSnapshot, ImportSummary};
use crate::sync::{decode_documents, Collection, RemoteDocument, SyncError};

/// A local write waiting to be pushed to the remote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PendingWrite {
    Put {
        collection: Collection,
        id: String,
        data: Value,
        /// Came from a backup import; replayed behind existing history.
        #[serde(default, skip_serializing_if = "is_false")]
        imported: bool,
    },
    Delete {
        collection: Collection,
        id: String,
    },
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl PendingWrite {
    pub fn collection(&self) -> Collection {
        match self {
            PendingWrite::Put { collection, .. } | PendingWrite::Delete { collection, .. } => {
                *collection
            }
        }
    }

    pub fn id(&self) -> &str {
        match self {
            PendingWrite::Put { id, .. } | PendingWrite::Delete { id, .. } => id,
        }
    }
}

pub struct WorkoutStore<S> {
    mode: SyncMode,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    catalog: Catalog,
    history: History,
    session: WorkoutSession<S>,
    outbox: VecDeque<PendingWrite>,
    last_error: Option<String>,
}

impl<S: DraftSlot> WorkoutStore<S> {
    pub fn new(mode: SyncMode, slot: S, ids: Arc<dyn IdGenerator>, clock: Arc<dyn Clock>) -> Self {
        Self {
            mode,
            catalog: Catalog::new(mode, ids.clone()),
            history: History::new(mode),
            session: WorkoutSession::new(slot, ids.clone(), clock.clone()),
            ids,
            clock,
            outbox: VecDeque::new(),
            last_error: None,
        }
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn session(&self) -> &WorkoutSession<S> {
        &self.session
    }

    // ========== Catalog ==========

    pub fn add_exercise(&mut self, descriptor: ExerciseDescriptor) -> Result<Exercise, CatalogError> {
        let exercise = self.catalog.add_exercise(descriptor)?;
        self.enqueue_put(Collection::Exercises, &exercise);
        Ok(exercise)
    }

    pub fn remove_exercise(&mut self, id: &str) -> Result<Exercise, CatalogError> {
        let exercise = self.catalog.remove_exercise(id)?;
        self.enqueue_delete(Collection::Exercises, id);
        Ok(exercise)
    }

    pub fn add_routine(&mut self, descriptor: RoutineDescriptor) -> Result<Routine, CatalogError> {
        let routine = self.catalog.add_routine(descriptor)?;
        self.enqueue_put(Collection::Routines, &routine);
        Ok(routine)
    }

    pub fn remove_routine(&mut self, id: &str) -> Result<Routine, CatalogError> {
        let routine = self.catalog.remove_routine(id)?;
        self.enqueue_delete(Collection::Routines, id);
        Ok(routine)
    }

    /// Seeds the built-in exercises into an empty catalog, returning how
    /// many were added.
    pub fn seed_default_exercises(&mut self) -> usize {
        let added = self.catalog.seed_defaults();
        for exercise in &added {
            self.enqueue_put(Collection::Exercises, exercise);
        }
        if !added.is_empty() {
            tracing::info!("Seeded {} default exercises", added.len());
        }
        added.len()
    }

    // ========== Session ==========

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn active_workout(&self) -> Option<&Workout> {
        self.session.active_workout()
    }

    pub fn start_workout(
        &mut self,
        name: Option<&str>,
        routine_id: Option<&str>,
    ) -> Result<&Workout, SessionError> {
        self.session.start_workout(name, routine_id, &self.catalog)
    }

    pub fn add_exercise_to_workout(
        &mut self,
        exercise_id: &str,
    ) -> Result<&WorkoutExercise, SessionError> {
        self.session.add_exercise(exercise_id, &self.catalog)
    }

    pub fn remove_exercise_from_workout(
        &mut self,
        instance_id: &str,
    ) -> Result<WorkoutExercise, SessionError> {
        self.session.remove_exercise(instance_id)
    }

    pub fn add_set(&mut self, instance_id: &str, set: NewSet) -> Result<&WorkoutSet, SessionError> {
        self.session.add_set(instance_id, set)
    }

    pub fn remove_set(&mut self, instance_id: &str, set_id: &str) -> Result<WorkoutSet, SessionError> {
        self.session.remove_set(instance_id, set_id)
    }

    pub fn update_workout_notes(&mut self, notes: impl Into<String>) -> Result<(), SessionError> {
        self.session.update_notes(notes)
    }

    /// Completes the active workout and records it in history.
    pub fn complete_workout(&mut self) -> Result<Workout, SessionError> {
        let workout = self.session.complete()?;
        self.history.record_completed_workout(workout.clone());
        self.enqueue_put(Collection::Workouts, &workout);
        Ok(workout)
    }

    pub fn cancel_workout(&mut self) -> Option<Workout> {
        self.session.cancel()
    }

    pub fn restore_draft(&mut self) -> Result<&Workout, SessionError> {
        self.session.restore_draft()
    }

    pub fn has_draft(&self) -> bool {
        self.session.has_draft()
    }

    pub fn discard_draft(&mut self) {
        self.session.discard_draft()
    }

    // ========== History ==========

    pub fn last_workout(&self) -> Option<&Workout> {
        self.history.last_workout()
    }

    pub fn workout_count(&self) -> usize {
        self.history.workout_count()
    }

    pub fn total_volume(&self) -> f64 {
        self.history.total_volume()
    }

    pub fn personal_records(&self) -> Vec<PersonalRecord> {
        self.history.personal_records()
    }

    pub fn top_personal_record(&self) -> Option<PersonalRecord> {
        self.history.top_personal_record()
    }

    // ========== Remote state ==========

    /// Replaces one collection's confirmed layer with a remote snapshot.
    ///
    /// Documents that do not decode are skipped. Returns how many entities
    /// the snapshot held.
    pub fn apply_remote_snapshot(&mut self, collection: Collection, docs: Vec<RemoteDocument>) -> usize {
        let count = match collection {
            Collection::Exercises => {
                let exercises: Vec<Exercise> = decode_documents(collection, docs);
                let count = exercises.len();
                self.catalog.replace_exercises(exercises);
                count
            }
            Collection::Routines => {
                let routines: Vec<Routine> = decode_documents(collection, docs);
                let count = routines.len();
                self.catalog.replace_routines(routines);
                count
            }
            Collection::Workouts => {
                let workouts: Vec<Workout> = decode_documents(collection, docs);
                let count = workouts.len();
                self.history.replace_confirmed(workouts);
                count
            }
        };
        tracing::debug!("Applied {} snapshot with {} entries", collection, count);
        count
    }

    /// Loads previously cached collections as the confirmed state.
    pub fn load_cached(
        &mut self,
        exercises: Vec<Exercise>,
        routines: Vec<Routine>,
        workouts: Vec<Workout>,
    ) {
        self.catalog.replace_exercises(exercises);
        self.catalog.replace_routines(routines);
        self.history.replace_confirmed(workouts);
    }

    pub fn outbox(&self) -> &VecDeque<PendingWrite> {
        &self.outbox
    }

    pub fn next_pending_write(&self) -> Option<&PendingWrite> {
        self.outbox.front()
    }

    /// Drops the head of the outbox once it has been pushed.
    pub fn complete_pending_write(&mut self) -> Option<PendingWrite> {
        self.outbox.pop_front()
    }

    /// Puts writes from an earlier run back in front of anything queued.
    ///
    /// In remote mode the writes are also replayed onto the pending layers,
    /// so the merged view matches what the earlier run showed.
    pub fn restore_outbox(&mut self, writes: Vec<PendingWrite>) {
        if self.mode == SyncMode::Remote {
            for write in &writes {
                self.replay(write);
            }
        }
        for write in writes.into_iter().rev() {
            self.outbox.push_front(write);
        }
    }

    fn replay(&mut self, write: &PendingWrite) {
        match write {
            PendingWrite::Put {
                collection,
                id,
                data,
                imported,
            } => {
                let doc = RemoteDocument {
                    id: id.clone(),
                    data: data.clone(),
                    created_at: self.clock.now(),
                };
                match collection {
                    Collection::Exercises => {
                        for exercise in decode_documents::<Exercise>(*collection, vec![doc]) {
                            self.catalog.insert_exercise(exercise);
                        }
                    }
                    Collection::Routines => {
                        for routine in decode_documents::<Routine>(*collection, vec![doc]) {
                            self.catalog.insert_routine(routine);
                        }
                    }
                    Collection::Workouts => {
                        let workouts = decode_documents::<Workout>(*collection, vec![doc]);
                        if *imported {
                            self.history.append_older(workouts);
                        } else {
                            for workout in workouts {
                                self.history.record_completed_workout(workout);
                            }
                        }
                    }
                }
            }
            PendingWrite::Delete { collection, id } => {
                let removed = match collection {
                    Collection::Exercises => self.catalog.remove_exercise(id).is_ok(),
                    Collection::Routines => self.catalog.remove_routine(id).is_ok(),
                    Collection::Workouts => false,
                };
                if !removed {
                    tracing::debug!("Nothing to replay for delete of {} {}", collection, id);
                }
            }
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Records a remote failure for display. Local state is untouched.
    pub fn record_error(&mut self, error: &SyncError) {
        tracing::warn!("Sync error: {}", error);
        self.last_error = Some(error.to_string());
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Empties every collection, the outbox and the active workout.
    ///
    /// The draft slot is left as it is so the workout can still be restored
    /// by whoever signs in next on this device.
    pub fn cleanup(&mut self) {
        self.catalog.clear();
        self.history.clear();
        self.outbox.clear();
        self.session.reset();
        self.last_error = None;
        tracing::info!("Cleared local workout state");
    }

    // ========== Export / import ==========

    pub fn export_snapshot(&self) -> ExportSnapshot {
        ExportSnapshot::new(
            self.history.workouts().into_iter().cloned().collect(),
            self.catalog.routines().into_iter().cloned().collect(),
            self.catalog.exercises().into_iter().cloned().collect(),
            self.clock.now(),
        )
    }

    /// Adds fresh copies of everything in `snapshot`.
    ///
    /// Imported workouts go behind existing history. In remote mode the
    /// copies are pending and queued for push.
    pub fn import_snapshot(&mut self, snapshot: &ExportSnapshot) -> ImportSummary {
        let fresh = snapshot.with_fresh_ids(self.ids.as_ref());
        let summary = fresh.summary();

        for exercise in fresh.exercises {
            self.queue_put(Collection::Exercises, &exercise, true);
            self.catalog.insert_exercise(exercise);
        }
        for routine in fresh.routines {
            self.queue_put(Collection::Routines, &routine, true);
            self.catalog.insert_routine(routine);
        }
        for workout in &fresh.workouts {
            self.queue_put(Collection::Workouts, workout, true);
        }
        self.history.append_older(fresh.workouts);

        tracing::info!("Imported {}", summary);
        summary
    }

    fn enqueue_put<T: Serialize + Entity>(&mut self, collection: Collection, item: &T) {
        self.queue_put(collection, item, false);
    }

    fn queue_put<T: Serialize + Entity>(
        &mut self,
        collection: Collection,
        item: &T,
        imported: bool,
    ) {
        if self.mode != SyncMode::Remote {
            return;
        }
        match serde_json::to_value(item) {
            Ok(data) => self.outbox.push_back(PendingWrite::Put {
                collection,
                id: item.id().to_string(),
                data,
                imported,
            }),
            Err(e) => tracing::warn!("Could not queue {} {}: {}", collection, item.id(), e),
        }
    }

    fn enqueue_delete(&mut self, collection: Collection, id: &str) {
        if self.mode != SyncMode::Remote {
            return;
        }
        self.outbox.push_back(PendingWrite::Delete {
            collection,
            id: id.to_string(),
        });
    }
}
