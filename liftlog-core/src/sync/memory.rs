//! In-process remote store.
//!
//! Backs the sync server and stands in for the network in tests. Every
//! watched collection has a `tokio::sync::watch` channel carrying its latest
//! sorted snapshot.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::watch;

use super::error::SyncError;
use super::remote::{BatchItem, ChangeStream, Collection, RemoteDocument, RemoteStore, UserScope};

type Key = (String, Collection);

#[derive(Default)]
struct Inner {
    docs: HashMap<Key, Vec<RemoteDocument>>,
    channels: HashMap<Key, watch::Sender<Vec<RemoteDocument>>>,
    offline: bool,
}

impl Inner {
    fn check_online(&self) -> Result<(), SyncError> {
        if self.offline {
            Err(SyncError::Connection("remote store is offline".into()))
        } else {
            Ok(())
        }
    }

    fn sorted(&self, key: &Key) -> Vec<RemoteDocument> {
        let mut docs = self.docs.get(key).cloned().unwrap_or_default();
        if key.1 == Collection::Workouts {
            docs.sort_by_key(|doc| std::cmp::Reverse(workout_date(doc)));
        }
        docs
    }

    fn upsert(&mut self, key: &Key, id: &str, data: Value, now: DateTime<Utc>) {
        let docs = self.docs.entry(key.clone()).or_default();
        match docs.iter_mut().find(|doc| doc.id == id) {
            Some(doc) => doc.data = data,
            None => docs.push(RemoteDocument {
                id: id.to_string(),
                data,
                created_at: now,
            }),
        }
    }

    fn publish(&self, key: &Key) {
        if let Some(sender) = self.channels.get(key) {
            sender.send_replace(self.sorted(key));
        }
    }

    fn subscribe(&mut self, key: Key) -> watch::Receiver<Vec<RemoteDocument>> {
        if let Some(sender) = self.channels.get(&key) {
            return sender.subscribe();
        }
        let (sender, receiver) = watch::channel(self.sorted(&key));
        self.channels.insert(key, sender);
        receiver
    }
}

fn workout_date(doc: &RemoteDocument) -> Option<DateTime<Utc>> {
    doc.data
        .get("date")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc))
}

/// Shared in-memory document store. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryRemote {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Makes every operation fail with a connection error until cleared.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    pub fn list_documents(
        &self,
        user: &str,
        collection: Collection,
    ) -> Result<Vec<RemoteDocument>, SyncError> {
        let inner = self.lock();
        inner.check_online()?;
        Ok(inner.sorted(&(user.to_string(), collection)))
    }

    pub fn put_document(
        &self,
        user: &str,
        collection: Collection,
        id: &str,
        data: Value,
    ) -> Result<(), SyncError> {
        let mut inner = self.lock();
        inner.check_online()?;
        let key = (user.to_string(), collection);
        inner.upsert(&key, id, data, Utc::now());
        inner.publish(&key);
        Ok(())
    }

    /// Returns whether a document was removed.
    pub fn delete_document(
        &self,
        user: &str,
        collection: Collection,
        id: &str,
    ) -> Result<bool, SyncError> {
        let mut inner = self.lock();
        inner.check_online()?;
        let key = (user.to_string(), collection);
        let removed = match inner.docs.get_mut(&key) {
            Some(docs) => {
                let before = docs.len();
                docs.retain(|doc| doc.id != id);
                docs.len() != before
            }
            None => false,
        };
        if removed {
            inner.publish(&key);
        }
        Ok(removed)
    }

    /// Applies all items under one lock, then notifies each touched
    /// collection once.
    pub fn create_documents(&self, user: &str, items: Vec<BatchItem>) -> Result<(), SyncError> {
        let mut inner = self.lock();
        inner.check_online()?;
        let now = Utc::now();

        let mut touched: Vec<Key> = Vec::new();
        for item in items {
            let key = (user.to_string(), item.collection);
            inner.upsert(&key, &item.id, item.data, now);
            if !touched.contains(&key) {
                touched.push(key);
            }
        }
        for key in &touched {
            inner.publish(key);
        }
        Ok(())
    }

    /// Receiver starting at the current snapshot.
    pub fn subscribe(
        &self,
        user: &str,
        collection: Collection,
    ) -> Result<watch::Receiver<Vec<RemoteDocument>>, SyncError> {
        let mut inner = self.lock();
        inner.check_online()?;
        Ok(inner.subscribe((user.to_string(), collection)))
    }

    /// Replaces a collection wholesale. Used when loading persisted data at
    /// startup.
    pub fn load_documents(&self, user: &str, collection: Collection, docs: Vec<RemoteDocument>) {
        let mut inner = self.lock();
        let key = (user.to_string(), collection);
        inner.docs.insert(key.clone(), docs);
        inner.publish(&key);
    }
}

/// Turns a watch receiver into a stream of snapshots, current value first.
pub(crate) fn snapshot_stream(receiver: watch::Receiver<Vec<RemoteDocument>>) -> ChangeStream {
    futures::stream::unfold((receiver, true), |(mut receiver, first)| async move {
        if !first && receiver.changed().await.is_err() {
            return None;
        }
        let docs = receiver.borrow_and_update().clone();
        Some((Ok::<_, SyncError>(docs), (receiver, false)))
    })
    .boxed()
}

impl RemoteStore for MemoryRemote {
    async fn list(
        &self,
        scope: &UserScope,
        collection: Collection,
    ) -> Result<Vec<RemoteDocument>, SyncError> {
        self.list_documents(scope.as_str(), collection)
    }

    async fn put(
        &self,
        scope: &UserScope,
        collection: Collection,
        id: &str,
        data: Value,
    ) -> Result<(), SyncError> {
        self.put_document(scope.as_str(), collection, id, data)
    }

    async fn delete(
        &self,
        scope: &UserScope,
        collection: Collection,
        id: &str,
    ) -> Result<(), SyncError> {
        self.delete_document(scope.as_str(), collection, id)
            .map(|_| ())
    }

    async fn create_batch(&self, scope: &UserScope, items: Vec<BatchItem>) -> Result<(), SyncError> {
        self.create_documents(scope.as_str(), items)
    }

    async fn watch(
        &self,
        scope: &UserScope,
        collection: Collection,
    ) -> Result<ChangeStream, SyncError> {
        let receiver = self.subscribe(scope.as_str(), collection)?;
        Ok(snapshot_stream(receiver))
    }
}
