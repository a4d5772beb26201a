//! Opens the workout store for one CLI invocation and saves it afterwards.
//!
//! Every run loads the cached collections and the outbox from SQLite and
//! restores the workout draft. In remote mode it then attaches to the sync
//! server and waits briefly for fresh snapshots. When the server can't be
//! reached the run carries on offline, and queued writes are pushed by a
//! later run.

use std::sync::Arc;
use std::time::Duration;

use liftlog_core::{
    Clock, Collection, ExportSnapshot, FileDraftSlot, HttpRemote, IdGenerator, ImportSummary,
    RemoteStore, SyncAdapter, SyncError, SyncMode, SystemClock, UserScope, UuidIds,
    WorkoutStore,
};

use crate::config::Config;
use crate::db::{init_db, CatalogRepository, DbError, OutboxRepository, WorkoutRepository};

/// Errors opening or saving the local state
#[derive(Debug)]
pub enum AppError {
    Db(DbError),
    Sync(SyncError),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Db(e) => write!(f, "{}", e),
            AppError::Sync(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Db(e) => Some(e),
            AppError::Sync(e) => Some(e),
        }
    }
}

impl From<DbError> for AppError {
    fn from(e: DbError) -> Self {
        AppError::Db(e)
    }
}

impl From<SyncError> for AppError {
    fn from(e: SyncError) -> Self {
        AppError::Sync(e)
    }
}

pub struct App<R: RemoteStore = HttpRemote> {
    store: WorkoutStore<FileDraftSlot>,
    sync: Option<SyncAdapter<R>>,
    scope: Option<UserScope>,
    clock: Arc<dyn Clock>,
    catalog_repo: CatalogRepository,
    workout_repo: WorkoutRepository,
    outbox_repo: OutboxRepository,
}

impl App<HttpRemote> {
    pub async fn open(config: &Config) -> Result<Self, AppError> {
        let remote = match (config.sync_mode(), &config.sync.server_url) {
            (SyncMode::Remote, Some(url)) => {
                Some(HttpRemote::new(url.clone(), config.sync.api_key.clone()))
            }
            _ => None,
        };
        Self::open_with(config, remote, Arc::new(UuidIds), Arc::new(SystemClock)).await
    }
}

impl<R: RemoteStore> App<R> {
    /// Opens the store in remote mode when `remote` is given.
    pub async fn open_with(
        config: &Config,
        remote: Option<R>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        let pool = init_db(&config.database_path.value).await?;
        let catalog_repo = CatalogRepository::new(pool.clone());
        let workout_repo = WorkoutRepository::new(pool.clone());
        let outbox_repo = OutboxRepository::new(pool);

        let mode = if remote.is_some() {
            SyncMode::Remote
        } else {
            SyncMode::Local
        };
        let slot = FileDraftSlot::new(config.data_dir.value.clone());
        let mut store = WorkoutStore::new(mode, slot, ids.clone(), clock.clone());

        store.load_cached(
            catalog_repo.list_exercises().await?,
            catalog_repo.list_routines().await?,
            workout_repo.list().await?,
        );
        store.restore_outbox(outbox_repo.list().await?);

        if store.has_draft() {
            match store.restore_draft() {
                Ok(workout) => tracing::debug!("Restored active workout {}", workout.id),
                Err(e) => tracing::warn!("Could not restore workout draft: {}", e),
            }
        }

        let mut app = Self {
            store,
            sync: None,
            scope: None,
            clock,
            catalog_repo,
            workout_repo,
            outbox_repo,
        };

        if let Some(remote) = remote {
            let scope = config.user_scope()?;
            let mut adapter = SyncAdapter::new(Arc::new(remote), ids);
            app.connect(&mut adapter, scope.clone(), config.sync.wait())
                .await;
            app.sync = Some(adapter);
            app.scope = Some(scope);
        }

        Ok(app)
    }

    async fn connect(&mut self, adapter: &mut SyncAdapter<R>, scope: UserScope, wait: Duration) {
        if let Err(e) = adapter.attach(scope).await {
            tracing::warn!("Sync server unavailable, working offline: {}", e);
            self.store.record_error(&e);
            return;
        }
        if let Err(e) = adapter.wait_for_snapshots(&mut self.store, wait).await {
            tracing::warn!("Remote data may be stale: {}", e);
            self.store.record_error(&e);
        }
    }

    pub fn store(&self) -> &WorkoutStore<FileDraftSlot> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut WorkoutStore<FileDraftSlot> {
        &mut self.store
    }

    pub fn mode(&self) -> SyncMode {
        self.store.mode()
    }

    /// True when attached to the sync server.
    pub fn is_online(&self) -> bool {
        self.sync.as_ref().is_some_and(SyncAdapter::is_attached)
    }

    /// Applies queued notifications, then reads every collection again.
    ///
    /// Returns how many entities the remote holds.
    pub async fn pull(&mut self) -> Result<usize, SyncError> {
        let (adapter, scope) = match (&mut self.sync, &self.scope) {
            (Some(adapter), Some(scope)) if adapter.is_attached() => (adapter, scope),
            _ => return Err(SyncError::NotAttached),
        };
        adapter.apply_to(&mut self.store);

        let mut total = 0;
        for collection in Collection::ALL {
            match adapter.remote().list(scope, collection).await {
                Ok(docs) => total += self.store.apply_remote_snapshot(collection, docs),
                Err(e) => {
                    self.store.record_error(&e);
                    return Err(e);
                }
            }
        }
        Ok(total)
    }

    /// Pushes the outbox. Returns how many writes were pushed.
    pub async fn push(&mut self) -> Result<usize, SyncError> {
        match &self.sync {
            Some(adapter) if adapter.is_attached() => adapter.flush(&mut self.store).await,
            _ => Err(SyncError::NotAttached),
        }
    }

    /// Everything the user has, read from the remote when online.
    ///
    /// Offline the merged local view is exported, pending writes included.
    pub async fn export_snapshot(&self) -> Result<ExportSnapshot, SyncError> {
        match (&self.sync, &self.scope) {
            (Some(adapter), Some(scope)) if adapter.is_attached() => {
                adapter.export_snapshot(scope, self.clock.now()).await
            }
            _ => Ok(self.store.export_snapshot()),
        }
    }

    /// Stops syncing and clears the cached collections and outbox.
    ///
    /// The active workout draft stays on disk.
    pub fn sign_out(&mut self) {
        if let Some(mut adapter) = self.sync.take() {
            adapter.detach();
        }
        self.scope = None;
        self.store.cleanup();
    }

    /// Imports a backup blob. Online, the copies are written to the remote
    /// in one batch; locally they are added to the cached collections.
    pub async fn import_snapshot(&mut self, blob: &str) -> Result<ImportSummary, AppError> {
        let Some(adapter) = &self.sync else {
            let snapshot =
                ExportSnapshot::from_json(blob).map_err(|e| SyncError::Snapshot(e.to_string()))?;
            return Ok(self.store.import_snapshot(&snapshot));
        };
        let scope = match &self.scope {
            Some(scope) if adapter.is_attached() => scope.clone(),
            _ => return Err(AppError::Sync(SyncError::NotAttached)),
        };

        let summary = adapter.import_snapshot(blob, &scope).await?;
        self.pull().await?;
        Ok(summary)
    }

    /// Pushes what it can and writes the local state back to SQLite.
    pub async fn finish(mut self) -> Result<(), AppError> {
        if self.is_online() {
            match self.push().await {
                Ok(0) => {}
                Ok(pushed) => {
                    tracing::debug!("Pushed {} pending writes", pushed);
                    if let Err(e) = self.pull().await {
                        tracing::warn!("Could not refresh after push: {}", e);
                    }
                }
                Err(e) => tracing::warn!("Pending changes stay queued: {}", e),
            }
        }
        self.save().await?;
        if let Some(mut adapter) = self.sync.take() {
            adapter.detach();
        }
        Ok(())
    }

    async fn save(&self) -> Result<(), DbError> {
        self.catalog_repo
            .replace_exercises(self.store.catalog().confirmed_exercises())
            .await?;
        self.catalog_repo
            .replace_routines(self.store.catalog().confirmed_routines())
            .await?;
        self.workout_repo
            .replace_all(self.store.history().confirmed())
            .await?;
        self.outbox_repo.replace_all(self.store.outbox()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use liftlog_core::{
        ExerciseDescriptor, ManualClock, MemoryRemote, NewSet, SequentialIds, SessionState,
    };
    use std::path::Path;
    use tempfile::TempDir;

    fn test_config(dir: &Path) -> Config {
        let data_dir = dir.to_string_lossy().to_string();
        Config::load_with_env(Some(dir.join("missing.yaml")), |key| match key {
            "LIFTLOG_DATA_DIR" => Some(data_dir.clone()),
            "LIFTLOG_USER" => Some("alice".to_string()),
            _ => None,
        })
        .unwrap()
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 7, 0, 0).unwrap(),
        ))
    }

    async fn open_local(config: &Config, prefix: &str) -> App<MemoryRemote> {
        App::open_with(
            config,
            None,
            Arc::new(SequentialIds::new(prefix)),
            clock(),
        )
        .await
        .unwrap()
    }

    async fn open_remote(config: &Config, remote: &MemoryRemote, prefix: &str) -> App<MemoryRemote> {
        App::open_with(
            config,
            Some(remote.clone()),
            Arc::new(SequentialIds::new(prefix)),
            clock(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_local_state_survives_between_runs() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path());

        let mut app = open_local(&config, "a").await;
        let squat = app
            .store_mut()
            .add_exercise(ExerciseDescriptor::new("Squat", "Legs"))
            .unwrap();
        app.store_mut().start_workout(Some("Legs"), None).unwrap();
        let instance = app
            .store_mut()
            .add_exercise_to_workout(&squat.id)
            .unwrap()
            .id
            .clone();
        app.store_mut()
            .add_set(&instance, NewSet::new(5, 120.0))
            .unwrap();
        app.finish().await.unwrap();

        let app = open_local(&config, "b").await;
        assert_eq!(app.mode(), SyncMode::Local);
        assert_eq!(app.store().catalog().exercises().len(), 1);
        assert_eq!(app.store().state(), SessionState::ActiveWorkout);
        let active = app.store().active_workout().unwrap();
        assert_eq!(active.name, "Legs");
        assert_eq!(active.set_count(), 1);
    }

    #[tokio::test]
    async fn test_local_backup_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path());

        let mut app = open_local(&config, "a").await;
        app.store_mut()
            .add_exercise(ExerciseDescriptor::new("Row", "Back"))
            .unwrap();
        let blob = app.export_snapshot().await.unwrap().to_json().unwrap();

        let summary = app.import_snapshot(&blob).await.unwrap();
        assert_eq!(summary.exercises, 1);
        assert_eq!(app.store().catalog().exercises().len(), 2);
    }

    #[tokio::test]
    async fn test_remote_writes_reach_server() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path());
        let remote = MemoryRemote::new();

        let mut app = open_remote(&config, &remote, "a").await;
        assert!(app.is_online());
        app.store_mut()
            .add_exercise(ExerciseDescriptor::new("Bench Press", "Chest"))
            .unwrap();
        app.finish().await.unwrap();

        let docs = remote.list_documents("alice", Collection::Exercises).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].data["name"], "Bench Press");

        let app = open_remote(&config, &remote, "b").await;
        assert!(app.store().outbox().is_empty());
        assert_eq!(app.store().catalog().confirmed_exercises().len(), 1);
    }

    #[tokio::test]
    async fn test_offline_run_queues_writes_for_later() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path());
        let remote = MemoryRemote::new();
        remote.set_offline(true);

        let mut app = open_remote(&config, &remote, "a").await;
        assert!(!app.is_online());
        assert!(app.store().last_error().is_some());
        app.store_mut()
            .add_exercise(ExerciseDescriptor::new("Deadlift", "Back"))
            .unwrap();
        app.finish().await.unwrap();
        remote.set_offline(false);

        let app = open_remote(&config, &remote, "b").await;
        // Replayed from the saved outbox until the push lands
        assert_eq!(app.store().outbox().len(), 1);
        assert_eq!(app.store().catalog().exercises().len(), 1);
        app.finish().await.unwrap();

        let docs = remote.list_documents("alice", Collection::Exercises).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].data["name"], "Deadlift");
    }

    #[tokio::test]
    async fn test_offline_export_uses_local_view() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path());
        let remote = MemoryRemote::new();
        remote.set_offline(true);

        let mut app = open_remote(&config, &remote, "a").await;
        assert!(!app.is_online());
        app.store_mut()
            .add_exercise(ExerciseDescriptor::new("Deadlift", "Back"))
            .unwrap();

        let exported = app.export_snapshot().await.unwrap();
        assert_eq!(exported.exercises.len(), 1);
        assert_eq!(exported.exercises[0].name, "Deadlift");
    }

    #[tokio::test]
    async fn test_sign_out_detaches_and_clears() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path());
        let remote = MemoryRemote::new();

        let mut app = open_remote(&config, &remote, "a").await;
        assert!(app.is_online());
        let squat = app
            .store_mut()
            .add_exercise(ExerciseDescriptor::new("Squat", "Legs"))
            .unwrap();
        app.store_mut().start_workout(Some("Legs"), None).unwrap();
        app.store_mut().add_exercise_to_workout(&squat.id).unwrap();

        app.sign_out();
        assert!(!app.is_online());
        assert!(app.store().catalog().exercises().is_empty());
        assert!(app.store().outbox().is_empty());
        assert_eq!(app.store().state(), SessionState::NoActiveWorkout);
        assert!(app.store().has_draft());
        assert!(matches!(app.push().await, Err(SyncError::NotAttached)));
        app.finish().await.unwrap();

        let app = open_local(&config, "b").await;
        assert!(app.store().catalog().exercises().is_empty());
        assert!(app.store().outbox().is_empty());
    }

    #[tokio::test]
    async fn test_remote_import_goes_through_batch() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path());
        let remote = MemoryRemote::new();
        let blob = r#"{
            "workouts": [],
            "routines": [{"id": "r1", "name": "Pull", "exerciseIds": ["e1"]}],
            "exercises": [{"id": "e1", "name": "Row", "category": "Back"}]
        }"#;

        let mut app = open_remote(&config, &remote, "a").await;
        let summary = app.import_snapshot(blob).await.unwrap();
        assert_eq!(summary.routines, 1);

        let routines = app.store().catalog().routines();
        assert_eq!(routines.len(), 1);
        let exercise_id = &app.store().catalog().exercises()[0].id;
        assert_ne!(exercise_id, "e1");
        assert_eq!(&routines[0].exercise_ids[0], exercise_id);

        let exported = app.export_snapshot().await.unwrap();
        assert_eq!(exported.summary(), summary);
    }
}
