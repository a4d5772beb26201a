//! On-disk persistence for the server's document collections.
//!
//! Each user's collections are stored as JSON arrays of documents:
//! ```text
//! <DATA_DIR>/
//!   <user_id>/
//!     exercises.json
//!     routines.json
//!     workouts.json
//! ```

use std::fs;
use std::io;
use std::path::PathBuf;

use liftlog_core::{Collection, MemoryRemote, RemoteDocument};

/// Errors that can occur during server storage operations.
#[derive(Debug)]
pub enum ServerStorageError {
    /// I/O error reading or writing a file.
    IoError(PathBuf, io::Error),
    /// A stored collection isn't a JSON array of documents.
    ParseError(PathBuf, serde_json::Error),
    /// Invalid user ID (e.g., contains path separators).
    InvalidUserId(String),
}

impl std::fmt::Display for ServerStorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerStorageError::IoError(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
            ServerStorageError::ParseError(path, e) => {
                write!(f, "Failed to parse collection {}: {}", path.display(), e)
            }
            ServerStorageError::InvalidUserId(id) => {
                write!(f, "Invalid user ID: {}", id)
            }
        }
    }
}

impl std::error::Error for ServerStorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerStorageError::IoError(_, e) => Some(e),
            ServerStorageError::ParseError(_, e) => Some(e),
            ServerStorageError::InvalidUserId(_) => None,
        }
    }
}

/// Validates a user ID to prevent path traversal.
pub fn validate_user_id(user_id: &str) -> Result<(), ServerStorageError> {
    if user_id.is_empty()
        || user_id.trim() != user_id
        || user_id.contains('/')
        || user_id.contains('\\')
        || user_id.contains("..")
        || user_id.starts_with('.')
    {
        return Err(ServerStorageError::InvalidUserId(user_id.to_string()));
    }
    Ok(())
}

/// JSON files backing a [`MemoryRemote`].
#[derive(Debug, Clone)]
pub struct ServerStorage {
    data_dir: PathBuf,
}

impl ServerStorage {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn user_dir(&self, user_id: &str) -> PathBuf {
        self.data_dir.join(user_id)
    }

    fn collection_path(&self, user_id: &str, collection: Collection) -> PathBuf {
        self.user_dir(user_id)
            .join(format!("{}.json", collection.as_str()))
    }

    /// Loads one collection. Returns `Ok(None)` if it was never saved.
    pub fn load(
        &self,
        user_id: &str,
        collection: Collection,
    ) -> Result<Option<Vec<RemoteDocument>>, ServerStorageError> {
        validate_user_id(user_id)?;
        let path = self.collection_path(user_id, collection);

        match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map(Some)
                .map_err(|e| ServerStorageError::ParseError(path, e)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ServerStorageError::IoError(path, e)),
        }
    }

    /// Saves one collection, replacing the previous file.
    pub fn save(
        &self,
        user_id: &str,
        collection: Collection,
        docs: &[RemoteDocument],
    ) -> Result<(), ServerStorageError> {
        validate_user_id(user_id)?;

        let user_dir = self.user_dir(user_id);
        let path = self.collection_path(user_id, collection);

        fs::create_dir_all(&user_dir)
            .map_err(|e| ServerStorageError::IoError(user_dir.clone(), e))?;

        let json = serde_json::to_string(docs)
            .map_err(|e| ServerStorageError::ParseError(path.clone(), e))?;

        // Write atomically using temp file + rename, one temp file per write
        let temp_path = path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4()));
        fs::write(&temp_path, json)
            .map_err(|e| ServerStorageError::IoError(temp_path.clone(), e))?;
        fs::rename(&temp_path, &path).map_err(|e| ServerStorageError::IoError(path, e))?;

        Ok(())
    }

    /// Loads every stored collection into `remote`. Returns how many
    /// collections were loaded.
    ///
    /// Directories that aren't valid user IDs and files that don't parse are
    /// skipped with a warning.
    pub fn load_into(&self, remote: &MemoryRemote) -> Result<usize, ServerStorageError> {
        let entries = match fs::read_dir(&self.data_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(ServerStorageError::IoError(self.data_dir.clone(), e)),
        };

        let mut loaded = 0;
        for entry in entries {
            let entry = entry.map_err(|e| ServerStorageError::IoError(self.data_dir.clone(), e))?;
            if !entry.path().is_dir() {
                continue;
            }
            let user_id = entry.file_name().to_string_lossy().to_string();
            if validate_user_id(&user_id).is_err() {
                tracing::warn!("Skipping directory {}", entry.path().display());
                continue;
            }

            for collection in Collection::ALL {
                match self.load(&user_id, collection) {
                    Ok(Some(docs)) => {
                        remote.load_documents(&user_id, collection, docs);
                        loaded += 1;
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!("Skipping stored collection: {}", e),
                }
            }
        }
        Ok(loaded)
    }

    /// Writes the current state of one collection from `remote`.
    pub fn persist(
        &self,
        remote: &MemoryRemote,
        user_id: &str,
        collection: Collection,
    ) -> Result<(), ServerStorageError> {
        // Listing only fails when the store is offline, which the server
        // never sets
        let docs = remote
            .list_documents(user_id, collection)
            .unwrap_or_default();
        self.save(user_id, collection, &docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use tempfile::TempDir;

    fn setup() -> (ServerStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = ServerStorage::new(temp_dir.path());
        (storage, temp_dir)
    }

    fn doc(id: &str, name: &str) -> RemoteDocument {
        RemoteDocument {
            id: id.to_string(),
            data: json!({ "id": id, "name": name }),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_validate_user_id() {
        // Valid
        assert!(validate_user_id("alice").is_ok());
        assert!(validate_user_id("bob-smith").is_ok());
        assert!(validate_user_id("user_123").is_ok());

        // Invalid
        assert!(validate_user_id("").is_err());
        assert!(validate_user_id("../evil").is_err());
        assert!(validate_user_id("foo/bar").is_err());
        assert!(validate_user_id("foo\\bar").is_err());
        assert!(validate_user_id(".hidden").is_err());
        assert!(validate_user_id(" alice").is_err());
    }

    #[test]
    fn test_load_nonexistent_returns_none() {
        let (storage, _temp) = setup();
        assert!(storage.load("alice", Collection::Exercises).unwrap().is_none());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let (storage, temp) = setup();
        let docs = vec![doc("e1", "Squat"), doc("e2", "Bench Press")];

        storage.save("alice", Collection::Exercises, &docs).unwrap();

        assert!(temp.path().join("alice").join("exercises.json").exists());
        assert_eq!(
            storage.load("alice", Collection::Exercises).unwrap(),
            Some(docs)
        );
        assert!(storage.load("alice", Collection::Routines).unwrap().is_none());
    }

    #[test]
    fn test_concurrent_saves_of_one_collection() {
        let (storage, temp) = setup();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let storage = storage.clone();
                std::thread::spawn(move || {
                    let docs = vec![doc(&format!("e{}", i), "Squat")];
                    for _ in 0..20 {
                        storage.save("alice", Collection::Exercises, &docs).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stored = storage.load("alice", Collection::Exercises).unwrap().unwrap();
        assert_eq!(stored.len(), 1);
        let leftovers: Vec<_> = fs::read_dir(temp.path().join("alice"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .filter(|name| name != "exercises.json")
            .collect();
        assert!(leftovers.is_empty(), "{:?}", leftovers);
    }

    #[test]
    fn test_corrupt_file_is_parse_error() {
        let (storage, temp) = setup();
        fs::create_dir_all(temp.path().join("alice")).unwrap();
        fs::write(temp.path().join("alice").join("routines.json"), "{").unwrap();

        assert!(matches!(
            storage.load("alice", Collection::Routines),
            Err(ServerStorageError::ParseError(..))
        ));
    }

    #[test]
    fn test_persist_then_load_into_fresh_remote() {
        let (storage, temp) = setup();
        let remote = MemoryRemote::new();
        remote
            .put_document("alice", Collection::Routines, "r1", json!({"name": "Push"}))
            .unwrap();
        remote
            .put_document("bob", Collection::Workouts, "w1", json!({"name": "Legs"}))
            .unwrap();
        storage.persist(&remote, "alice", Collection::Routines).unwrap();
        storage.persist(&remote, "bob", Collection::Workouts).unwrap();
        // Stray entries are ignored
        fs::write(temp.path().join("notes.txt"), "hi").unwrap();
        fs::create_dir_all(temp.path().join(".cache")).unwrap();

        let restored = MemoryRemote::new();
        assert_eq!(storage.load_into(&restored).unwrap(), 2);
        assert_eq!(
            restored.list_documents("alice", Collection::Routines).unwrap(),
            remote.list_documents("alice", Collection::Routines).unwrap()
        );
        assert_eq!(
            restored
                .list_documents("bob", Collection::Workouts)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_load_into_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        let storage = ServerStorage::new(temp_dir.path().join("never-created"));
        assert_eq!(storage.load_into(&MemoryRemote::new()).unwrap(), 0);
    }
}
