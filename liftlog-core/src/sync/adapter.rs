//! Bridges a [`WorkoutStore`] to a [`RemoteStore`].
//!
//! Attaching spawns one forwarding task per collection. Each task pushes
//! snapshots into a channel tagged with the attachment generation; the owner
//! applies them to the store with [`SyncAdapter::apply_to`] or
//! [`SyncAdapter::next_event`]. Detaching aborts the tasks and bumps the
//! generation so anything still queued from the old attachment is dropped.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::error::SyncError;
use super::remote::{decode_documents, BatchItem, Collection, RemoteDocument, RemoteStore, UserScope};
use crate::draft::DraftSlot;
use crate::id::IdGenerator;
use crate::models::{Entity, Exercise, Routine, Workout};
use crate::snapshot::{ExportSnapshot, ImportSummary};
use crate::store::{PendingWrite, WorkoutStore};

/// One remote notification.
#[derive(Debug)]
pub struct SyncEvent {
    generation: u64,
    pub collection: Collection,
    pub result: Result<Vec<RemoteDocument>, SyncError>,
}

impl SyncEvent {
    /// Applies a snapshot wholesale, or records a listener error.
    pub fn apply<S: DraftSlot>(self, store: &mut WorkoutStore<S>) {
        match self.result {
            Ok(docs) => {
                store.apply_remote_snapshot(self.collection, docs);
            }
            Err(e) => store.record_error(&e),
        }
    }
}

pub struct SyncAdapter<R> {
    remote: Arc<R>,
    ids: Arc<dyn IdGenerator>,
    scope: Option<UserScope>,
    generation: u64,
    tasks: Vec<JoinHandle<()>>,
    sender: mpsc::UnboundedSender<SyncEvent>,
    receiver: mpsc::UnboundedReceiver<SyncEvent>,
}

impl<R: RemoteStore> SyncAdapter<R> {
    pub fn new(remote: Arc<R>, ids: Arc<dyn IdGenerator>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            remote,
            ids,
            scope: None,
            generation: 0,
            tasks: Vec::new(),
            sender,
            receiver,
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn scope(&self) -> Option<&UserScope> {
        self.scope.as_ref()
    }

    pub fn is_attached(&self) -> bool {
        self.scope.is_some()
    }

    /// Subscribes to the user's three collections, replacing any previous
    /// attachment. Nothing stays attached if any subscription fails.
    pub async fn attach(&mut self, scope: UserScope) -> Result<(), SyncError> {
        self.detach();
        self.generation += 1;
        let generation = self.generation;

        for collection in Collection::ALL {
            let mut stream = match self.remote.watch(&scope, collection).await {
                Ok(stream) => stream,
                Err(e) => {
                    self.detach();
                    return Err(e);
                }
            };
            let sender = self.sender.clone();
            self.tasks.push(tokio::spawn(async move {
                while let Some(result) = stream.next().await {
                    let event = SyncEvent {
                        generation,
                        collection,
                        result,
                    };
                    if sender.send(event).is_err() {
                        break;
                    }
                }
            }));
        }

        tracing::info!("Attached sync for {}", scope);
        self.scope = Some(scope);
        Ok(())
    }

    /// Unsubscribes everything. Safe to call when nothing is attached.
    pub fn detach(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.generation += 1;
        if let Some(scope) = self.scope.take() {
            tracing::info!("Detached sync for {}", scope);
        }
    }

    /// Applies every queued notification from the current attachment.
    /// Returns how many were applied.
    pub fn apply_to<S: DraftSlot>(&mut self, store: &mut WorkoutStore<S>) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.receiver.try_recv() {
            if event.generation != self.generation {
                continue;
            }
            event.apply(store);
            applied += 1;
        }
        applied
    }

    /// Waits for the next notification from the current attachment.
    ///
    /// Returns `None` when nothing is attached.
    pub async fn next_event(&mut self) -> Option<SyncEvent> {
        while self.scope.is_some() {
            let event = self.receiver.recv().await?;
            if event.generation == self.generation {
                return Some(event);
            }
        }
        None
    }

    /// Applies notifications until every collection has delivered a
    /// snapshot at least once.
    pub async fn wait_for_snapshots<S: DraftSlot>(
        &mut self,
        store: &mut WorkoutStore<S>,
        wait: Duration,
    ) -> Result<(), SyncError> {
        if !self.is_attached() {
            return Err(SyncError::NotAttached);
        }
        let deadline = tokio::time::Instant::now() + wait;
        let mut seen: HashSet<Collection> = HashSet::new();

        while seen.len() < Collection::ALL.len() {
            match tokio::time::timeout_at(deadline, self.next_event()).await {
                Ok(Some(event)) => {
                    if event.result.is_ok() {
                        seen.insert(event.collection);
                    }
                    event.apply(store);
                }
                Ok(None) => return Err(SyncError::NotAttached),
                Err(_) => return Err(SyncError::Timeout),
            }
        }
        Ok(())
    }

    fn attached_scope(&self) -> Result<&UserScope, SyncError> {
        self.scope.as_ref().ok_or(SyncError::NotAttached)
    }

    async fn put<T: Serialize + Entity>(&self, collection: Collection, item: &T) -> Result<(), SyncError> {
        let scope = self.attached_scope()?;
        let data = serde_json::to_value(item)?;
        self.remote.put(scope, collection, item.id(), data).await
    }

    // Local visibility follows from the next notification, not from these
    // calls returning.

    pub async fn push_exercise(&self, exercise: &Exercise) -> Result<(), SyncError> {
        self.put(Collection::Exercises, exercise).await
    }

    pub async fn push_routine(&self, routine: &Routine) -> Result<(), SyncError> {
        self.put(Collection::Routines, routine).await
    }

    pub async fn push_workout(&self, workout: &Workout) -> Result<(), SyncError> {
        self.put(Collection::Workouts, workout).await
    }

    pub async fn remove(&self, collection: Collection, id: &str) -> Result<(), SyncError> {
        let scope = self.attached_scope()?;
        self.remote.delete(scope, collection, id).await
    }

    /// Pushes the store's outbox in order.
    ///
    /// Stops at the first failure, leaving the failed write and everything
    /// behind it queued, and records the error on the store. Returns how
    /// many writes were pushed.
    pub async fn flush<S: DraftSlot>(&self, store: &mut WorkoutStore<S>) -> Result<usize, SyncError> {
        let mut pushed = 0;
        while let Some(write) = store.next_pending_write().cloned() {
            let result = match self.attached_scope() {
                Ok(scope) => match &write {
                    PendingWrite::Put {
                        collection,
                        id,
                        data,
                        ..
                    } => self.remote.put(scope, *collection, id, data.clone()).await,
                    PendingWrite::Delete { collection, id } => {
                        self.remote.delete(scope, *collection, id).await
                    }
                },
                Err(e) => Err(e),
            };

            if let Err(e) = result {
                store.record_error(&e);
                return Err(e);
            }
            store.complete_pending_write();
            pushed += 1;
        }

        if pushed > 0 {
            tracing::debug!("Flushed {} pending writes", pushed);
            store.clear_error();
        }
        Ok(pushed)
    }

    /// Reads the three collections straight from the remote.
    pub async fn export_snapshot(
        &self,
        scope: &UserScope,
        now: DateTime<Utc>,
    ) -> Result<ExportSnapshot, SyncError> {
        let workouts = self.remote.list(scope, Collection::Workouts).await?;
        let routines = self.remote.list(scope, Collection::Routines).await?;
        let exercises = self.remote.list(scope, Collection::Exercises).await?;

        Ok(ExportSnapshot::new(
            decode_documents(Collection::Workouts, workouts),
            decode_documents(Collection::Routines, routines),
            decode_documents(Collection::Exercises, exercises),
            now,
        ))
    }

    /// Writes fresh copies of everything in `blob` to the user's remote
    /// collections in one batch. Existing remote records are not checked
    /// for duplicates.
    pub async fn import_snapshot(&self, blob: &str, scope: &UserScope) -> Result<ImportSummary, SyncError> {
        let snapshot =
            ExportSnapshot::from_json(blob).map_err(|e| SyncError::Snapshot(e.to_string()))?;
        let fresh = snapshot.with_fresh_ids(self.ids.as_ref());
        let summary = fresh.summary();

        let mut items = Vec::new();
        for exercise in &fresh.exercises {
            items.push(batch_item(Collection::Exercises, exercise)?);
        }
        for routine in &fresh.routines {
            items.push(batch_item(Collection::Routines, routine)?);
        }
        for workout in &fresh.workouts {
            items.push(batch_item(Collection::Workouts, workout)?);
        }

        self.remote.create_batch(scope, items).await?;
        tracing::info!("Imported {} for {}", summary, scope);
        Ok(summary)
    }
}

impl<R> Drop for SyncAdapter<R> {
    fn drop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

fn batch_item<T: Serialize + Entity>(collection: Collection, item: &T) -> Result<BatchItem, SyncError> {
    Ok(BatchItem {
        collection,
        id: item.id().to_string(),
        data: serde_json::to_value(item)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::draft::MemoryDraftSlot;
    use crate::id::SequentialIds;
    use crate::layered::SyncMode;
    use crate::models::ExerciseDescriptor;
    use crate::sync::MemoryRemote;
    use chrono::TimeZone;
    use serde_json::json;

    const WAIT: Duration = Duration::from_secs(5);

    fn remote_store() -> WorkoutStore<MemoryDraftSlot> {
        WorkoutStore::new(
            SyncMode::Remote,
            MemoryDraftSlot::new(),
            Arc::new(SequentialIds::new("id")),
            Arc::new(ManualClock::new(
                Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            )),
        )
    }

    fn adapter(remote: &MemoryRemote) -> SyncAdapter<MemoryRemote> {
        SyncAdapter::new(Arc::new(remote.clone()), Arc::new(SequentialIds::new("imp")))
    }

    fn alice() -> UserScope {
        UserScope::new("alice").unwrap()
    }

    #[tokio::test]
    async fn test_detach_is_idempotent() {
        let remote = MemoryRemote::new();
        let mut adapter = adapter(&remote);

        adapter.detach();
        adapter.attach(alice()).await.unwrap();
        adapter.detach();
        adapter.detach();

        assert!(!adapter.is_attached());
        assert!(adapter.tasks.is_empty());
        assert!(adapter.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_attach_delivers_initial_snapshots() {
        let remote = MemoryRemote::new();
        remote
            .put_document(
                "alice",
                Collection::Exercises,
                "e1",
                json!({"name": "Squat", "category": "Legs"}),
            )
            .unwrap();
        let mut store = remote_store();
        let mut adapter = adapter(&remote);

        adapter.attach(alice()).await.unwrap();
        adapter.wait_for_snapshots(&mut store, WAIT).await.unwrap();

        assert_eq!(store.catalog().exercises().len(), 1);
        assert_eq!(store.catalog().exercises()[0].id, "e1");
    }

    #[tokio::test]
    async fn test_notifications_after_detach_are_ignored() {
        let remote = MemoryRemote::new();
        let mut store = remote_store();
        let mut adapter = adapter(&remote);

        adapter.attach(alice()).await.unwrap();
        adapter.wait_for_snapshots(&mut store, WAIT).await.unwrap();
        adapter.detach();

        remote
            .put_document(
                "alice",
                Collection::Exercises,
                "late",
                json!({"name": "Late", "category": "Legs"}),
            )
            .unwrap();
        tokio::task::yield_now().await;

        assert_eq!(adapter.apply_to(&mut store), 0);
        assert!(store.catalog().exercise("late").is_none());
    }

    #[tokio::test]
    async fn test_reattach_drops_old_generation() {
        let remote = MemoryRemote::new();
        remote
            .put_document("bob", Collection::Routines, "r1", json!({"name": "Bob's"}))
            .unwrap();
        let mut store = remote_store();
        let mut adapter = adapter(&remote);

        adapter.attach(UserScope::new("bob").unwrap()).await.unwrap();
        adapter.attach(alice()).await.unwrap();
        adapter.wait_for_snapshots(&mut store, WAIT).await.unwrap();
        adapter.apply_to(&mut store);

        assert!(store.catalog().routines().is_empty());
    }

    #[tokio::test]
    async fn test_flush_then_notification_confirms_pending() {
        let remote = MemoryRemote::new();
        let mut store = remote_store();
        let mut adapter = adapter(&remote);
        adapter.attach(alice()).await.unwrap();
        adapter.wait_for_snapshots(&mut store, WAIT).await.unwrap();

        let squat = store
            .add_exercise(ExerciseDescriptor::new("Squat", "Legs"))
            .unwrap();
        assert_eq!(store.catalog().pending_exercises().len(), 1);

        assert_eq!(adapter.flush(&mut store).await.unwrap(), 1);
        assert!(store.outbox().is_empty());

        let event = adapter.next_event().await.unwrap();
        assert_eq!(event.collection, Collection::Exercises);
        event.apply(&mut store);

        assert!(store.catalog().pending_exercises().is_empty());
        assert_eq!(store.catalog().exercise(&squat.id).unwrap().name, "Squat");
    }

    #[tokio::test]
    async fn test_flush_failure_keeps_outbox() {
        let remote = MemoryRemote::new();
        let mut store = remote_store();
        let mut adapter = adapter(&remote);
        adapter.attach(alice()).await.unwrap();

        store
            .add_exercise(ExerciseDescriptor::new("Squat", "Legs"))
            .unwrap();
        store
            .add_exercise(ExerciseDescriptor::new("Bench", "Chest"))
            .unwrap();

        remote.set_offline(true);
        let err = adapter.flush(&mut store).await.unwrap_err();
        assert!(matches!(err, SyncError::Connection(_)));
        assert_eq!(store.outbox().len(), 2);
        assert!(store.last_error().is_some());
        // Local state stays usable
        assert_eq!(store.catalog().exercises().len(), 2);

        remote.set_offline(false);
        assert_eq!(adapter.flush(&mut store).await.unwrap(), 2);
        assert!(store.last_error().is_none());
        assert_eq!(
            remote
                .list_documents("alice", Collection::Exercises)
                .unwrap()
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn test_flush_without_attachment() {
        let remote = MemoryRemote::new();
        let mut store = remote_store();
        let adapter = adapter(&remote);
        store
            .add_exercise(ExerciseDescriptor::new("Squat", "Legs"))
            .unwrap();

        assert_eq!(
            adapter.flush(&mut store).await.unwrap_err(),
            SyncError::NotAttached
        );
        assert_eq!(store.outbox().len(), 1);
    }

    #[tokio::test]
    async fn test_push_and_remove() {
        let remote = MemoryRemote::new();
        let mut adapter = adapter(&remote);
        let squat = Exercise {
            id: "e1".into(),
            name: "Squat".into(),
            category: "Legs".into(),
            notes: None,
        };

        assert_eq!(
            adapter.push_exercise(&squat).await.unwrap_err(),
            SyncError::NotAttached
        );

        adapter.attach(alice()).await.unwrap();
        adapter.push_exercise(&squat).await.unwrap();
        assert_eq!(
            remote
                .list_documents("alice", Collection::Exercises)
                .unwrap()[0]
                .data["name"],
            "Squat"
        );

        adapter.remove(Collection::Exercises, "e1").await.unwrap();
        assert!(remote
            .list_documents("alice", Collection::Exercises)
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_import_creates_fresh_copies_every_time() {
        let remote = MemoryRemote::new();
        let adapter = adapter(&remote);
        let blob = r#"{
            "workouts": [{"id": "w1", "name": "Legs", "date": "2025-01-01T10:00:00Z",
                          "exercises": [{"id": "we1", "exerciseId": "e1", "name": "Squat"}]}],
            "routines": [{"id": "r1", "name": "Legs", "exerciseIds": ["e1"]}],
            "exercises": [{"id": "e1", "name": "Squat", "category": "Legs"}]
        }"#;

        let summary = adapter.import_snapshot(blob, &alice()).await.unwrap();
        assert_eq!(summary.workouts, 1);
        adapter.import_snapshot(blob, &alice()).await.unwrap();

        let exercises = remote
            .list_documents("alice", Collection::Exercises)
            .unwrap();
        assert_eq!(exercises.len(), 2);
        assert!(exercises.iter().all(|d| d.id != "e1"));

        let routines = remote.list_documents("alice", Collection::Routines).unwrap();
        assert_eq!(routines[0].data["exerciseIds"][0], exercises[0].id.as_str());

        let workouts = remote.list_documents("alice", Collection::Workouts).unwrap();
        assert_eq!(
            workouts[0].data["exercises"][0]["exerciseId"],
            exercises[0].id.as_str()
        );
    }

    #[tokio::test]
    async fn test_import_rejects_incomplete_blob() {
        let remote = MemoryRemote::new();
        let adapter = adapter(&remote);
        let err = adapter
            .import_snapshot(r#"{"workouts": []}"#, &alice())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Snapshot(_)));
    }

    #[tokio::test]
    async fn test_export_reads_remote() {
        let remote = MemoryRemote::new();
        remote
            .put_document(
                "alice",
                Collection::Exercises,
                "e1",
                json!({"name": "Squat", "category": "Legs"}),
            )
            .unwrap();
        let adapter = adapter(&remote);
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();

        let snapshot = adapter.export_snapshot(&alice(), now).await.unwrap();
        assert_eq!(snapshot.exercises.len(), 1);
        assert_eq!(snapshot.export_date, Some(now));
    }

    #[tokio::test]
    async fn test_listener_error_is_reported() {
        let mut store = remote_store();
        let event = SyncEvent {
            generation: 0,
            collection: Collection::Workouts,
            result: Err(SyncError::WebSocket("closed".into())),
        };
        event.apply(&mut store);
        assert_eq!(store.last_error(), Some("WebSocket error: closed"));
    }
}
