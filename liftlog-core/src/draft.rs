//! Durable storage for the single in-progress workout draft.
//!
//! The draft lives in one well-known slot. Writing overwrites whatever was
//! there; reading malformed content yields no draft instead of an error.
//!
//! # Storage Layout
//!
//! ```text
//! <data_dir>/
//! └── workout_draft.json    # serialized Workout, absent when no draft
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::models::Workout;

/// Well-known key of the draft slot.
pub const DRAFT_KEY: &str = "workout_draft";

#[derive(Error, Debug)]
pub enum DraftError {
    #[error("I/O error for {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize draft: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A single key-value slot holding serialized text.
pub trait DraftSlot: Send {
    fn read(&self) -> Result<Option<String>, DraftError>;
    fn write(&mut self, contents: &str) -> Result<(), DraftError>;
    fn remove(&mut self) -> Result<(), DraftError>;
}

/// Slot backed by a JSON file in the data directory.
#[derive(Debug, Clone)]
pub struct FileDraftSlot {
    data_dir: PathBuf,
}

impl FileDraftSlot {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.json", DRAFT_KEY))
    }
}

fn io_error(path: &Path, source: io::Error) -> DraftError {
    DraftError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl DraftSlot for FileDraftSlot {
    fn read(&self) -> Result<Option<String>, DraftError> {
        let path = self.path();
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    /// Writes through a temporary file and renames it into place, so a crash
    /// mid-write leaves the previous draft intact.
    fn write(&mut self, contents: &str) -> Result<(), DraftError> {
        fs::create_dir_all(&self.data_dir).map_err(|e| io_error(&self.data_dir, e))?;

        let path = self.path();
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents).map_err(|e| io_error(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| io_error(&path, e))?;
        Ok(())
    }

    fn remove(&mut self) -> Result<(), DraftError> {
        let path = self.path();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path, e)),
        }
    }
}

/// In-memory slot. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryDraftSlot {
    contents: Arc<Mutex<Option<String>>>,
}

impl MemoryDraftSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw slot contents, for inspection.
    pub fn contents(&self) -> Option<String> {
        self.contents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl DraftSlot for MemoryDraftSlot {
    fn read(&self) -> Result<Option<String>, DraftError> {
        Ok(self.contents())
    }

    fn write(&mut self, contents: &str) -> Result<(), DraftError> {
        *self.contents.lock().unwrap_or_else(|e| e.into_inner()) = Some(contents.to_string());
        Ok(())
    }

    fn remove(&mut self) -> Result<(), DraftError> {
        *self.contents.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

/// Serializes workouts into a [`DraftSlot`].
#[derive(Debug, Clone)]
pub struct DraftStore<S> {
    slot: S,
}

impl<S: DraftSlot> DraftStore<S> {
    pub fn new(slot: S) -> Self {
        Self { slot }
    }

    pub fn slot(&self) -> &S {
        &self.slot
    }

    /// Stores `workout`, or clears the slot when given `None`.
    pub fn save(&mut self, workout: Option<&Workout>) -> Result<(), DraftError> {
        match workout {
            Some(workout) => {
                let json = serde_json::to_string(workout)?;
                self.slot.write(&json)
            }
            None => self.slot.remove(),
        }
    }

    /// Loads the draft. Unreadable or malformed content counts as no draft.
    pub fn load(&self) -> Option<Workout> {
        let contents = match self.slot.read() {
            Ok(Some(contents)) => contents,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Failed to read workout draft: {}", e);
                return None;
            }
        };

        match serde_json::from_str(&contents) {
            Ok(workout) => Some(workout),
            Err(e) => {
                tracing::warn!("Ignoring malformed workout draft: {}", e);
                None
            }
        }
    }

    pub fn clear(&mut self) -> Result<(), DraftError> {
        self.slot.remove()
    }

    /// True when the slot holds anything, even content that will not parse.
    pub fn exists(&self) -> bool {
        matches!(self.slot.read(), Ok(Some(_)))
    }
}
