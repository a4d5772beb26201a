//! Sync error types.

/// Errors that can occur while talking to the remote document store.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncError {
    /// No user scope is attached
    NotAttached,
    /// User scope is empty or malformed
    InvalidScope(String),
    /// Collection name is not one of workouts, routines, exercises
    UnknownCollection(String),
    /// Failed to reach the remote store
    Connection(String),
    /// HTTP request failed
    Http(String),
    /// Server answered with a non-success status
    Status(u16),
    /// WebSocket error
    WebSocket(String),
    /// JSON encoding/decoding error
    Serialization(String),
    /// Export blob rejected
    Snapshot(String),
    /// Initial snapshots did not arrive in time
    Timeout,
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::NotAttached => write!(f, "Sync not attached to a user"),
            SyncError::InvalidScope(scope) => write!(f, "Invalid user scope: '{}'", scope),
            SyncError::UnknownCollection(name) => write!(f, "Unknown collection: {}", name),
            SyncError::Connection(e) => write!(f, "Connection error: {}", e),
            SyncError::Http(e) => write!(f, "HTTP error: {}", e),
            SyncError::Status(code) => write!(f, "Server returned status {}", code),
            SyncError::WebSocket(e) => write!(f, "WebSocket error: {}", e),
            SyncError::Serialization(e) => write!(f, "Serialization error: {}", e),
            SyncError::Snapshot(e) => write!(f, "Invalid backup: {}", e),
            SyncError::Timeout => write!(f, "Timed out waiting for remote data"),
        }
    }
}

impl std::error::Error for SyncError {}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Serialization(e.to_string())
    }
}
