//! The remote per-user document store seam.
//!
//! Each user owns three collections (`workouts`, `routines`, `exercises`).
//! Documents are entity JSON plus a server-assigned creation timestamp.
//! Watching a collection yields the current snapshot first and then one full
//! snapshot per change.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Workouts,
    Routines,
    Exercises,
}

impl Collection {
    pub const ALL: [Collection; 3] = [
        Collection::Workouts,
        Collection::Routines,
        Collection::Exercises,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Workouts => "workouts",
            Collection::Routines => "routines",
            Collection::Exercises => "exercises",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Collection {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "workouts" => Ok(Collection::Workouts),
            "routines" => Ok(Collection::Routines),
            "exercises" => Ok(Collection::Exercises),
            other => Err(SyncError::UnknownCollection(other.to_string())),
        }
    }
}

/// The user whose collections are addressed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserScope(String);

impl UserScope {
    /// Scopes must be non-blank and must not contain `/`.
    pub fn new(user: impl Into<String>) -> Result<Self, SyncError> {
        let user = user.into();
        let trimmed = user.trim();
        if trimmed.is_empty() || trimmed.contains('/') {
            return Err(SyncError::InvalidScope(user));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored document as returned by the remote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDocument {
    pub id: String,
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

/// A document write inside a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub collection: Collection,
    pub id: String,
    pub data: Value,
}

/// Full collection snapshots, one per change.
pub type ChangeStream = BoxStream<'static, Result<Vec<RemoteDocument>, SyncError>>;

/// Per-user document collections with change notification.
///
/// Workouts are listed by their `date` field, most recent first. Other
/// collections are listed in creation order.
#[allow(async_fn_in_trait)]
pub trait RemoteStore: Send + Sync + 'static {
    async fn list(
        &self,
        scope: &UserScope,
        collection: Collection,
    ) -> Result<Vec<RemoteDocument>, SyncError>;

    /// Creates or overwrites the document `id`.
    async fn put(
        &self,
        scope: &UserScope,
        collection: Collection,
        id: &str,
        data: Value,
    ) -> Result<(), SyncError>;

    /// Deleting a missing document is not an error.
    async fn delete(&self, scope: &UserScope, collection: Collection, id: &str)
        -> Result<(), SyncError>;

    /// Writes every item or none of them.
    async fn create_batch(&self, scope: &UserScope, items: Vec<BatchItem>) -> Result<(), SyncError>;

    async fn watch(&self, scope: &UserScope, collection: Collection)
        -> Result<ChangeStream, SyncError>;
}

/// Decodes documents into entities, skipping the ones that do not fit.
///
/// A document whose data carries no `id` takes the document id.
pub fn decode_documents<T: DeserializeOwned>(
    collection: Collection,
    docs: Vec<RemoteDocument>,
) -> Vec<T> {
    docs.into_iter()
        .filter_map(|doc| {
            let mut data = doc.data;
            if let Value::Object(map) = &mut data {
                map.entry("id")
                    .or_insert_with(|| Value::String(doc.id.clone()));
            }
            match serde_json::from_value(data) {
                Ok(entity) => Some(entity),
                Err(e) => {
                    tracing::warn!("Skipping {} document {}: {}", collection, doc.id, e);
                    None
                }
            }
        })
        .collect()
}
