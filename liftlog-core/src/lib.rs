//! Liftlog Core Library
//!
//! Workout session engine, history statistics and remote sync for Liftlog
//! applications.

pub mod catalog;
pub mod clock;
pub mod defaults;
pub mod draft;
pub mod history;
pub mod id;
pub mod layered;
pub mod models;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod sync;

pub use catalog::{Catalog, CatalogError};
pub use clock::{Clock, ManualClock, SystemClock};
pub use draft::{DraftError, DraftSlot, DraftStore, FileDraftSlot, MemoryDraftSlot};
pub use history::History;
pub use id::{IdGenerator, SequentialIds, UuidIds};
pub use layered::{Layered, PendingChange, Placement, SyncMode};
pub use models::{
    format_duration, Entity, Exercise, ExerciseDescriptor, NewSet, PersonalRecord, Routine,
    RoutineDescriptor, Workout, WorkoutExercise, WorkoutSet,
};
pub use session::{SessionError, SessionState, WorkoutSession, DEFAULT_WORKOUT_NAME};
pub use snapshot::{ExportSnapshot, ImportSummary, SnapshotError, DEFAULT_BACKUP_FILE};
pub use store::{PendingWrite, WorkoutStore};
pub use sync::{
    Collection, HttpRemote, MemoryRemote, RemoteDocument, RemoteStore, SyncAdapter, SyncError,
    SyncEvent, UserScope,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
