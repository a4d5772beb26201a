//! Collections with a confirmed layer and an optimistic pending layer.
//!
//! In [`SyncMode::Local`] every write lands directly in the confirmed layer,
//! which is then simply "the local collection". In [`SyncMode::Remote`] the
//! confirmed layer mirrors the last remote snapshot and local writes are held
//! as pending changes until a snapshot confirms them.
//!
//! Read views merge both layers:
//! - a confirmed entry wins over a pending add with the same id
//! - a pending delete hides the entry with that id
//!
//! Replacing the confirmed layer drops pending adds whose id is now confirmed
//! and pending deletes whose id is now gone.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::Entity;

/// Where collections keep their data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Purely local collections.
    #[default]
    Local,
    /// Remote collections are the source of truth once attached.
    Remote,
}

/// Where pending adds appear in the merged view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Newest first (history).
    Front,
    /// Newest last (catalog).
    Back,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PendingChange<T> {
    Add(T),
    Delete(String),
}

#[derive(Debug, Clone)]
pub struct Layered<T> {
    mode: SyncMode,
    placement: Placement,
    confirmed: Vec<T>,
    /// Ordered as they appear in the merged view.
    pending: Vec<PendingChange<T>>,
}

impl<T: Entity + Clone> Layered<T> {
    pub fn new(mode: SyncMode, placement: Placement) -> Self {
        Self {
            mode,
            placement,
            confirmed: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    /// Merged read view.
    pub fn items(&self) -> Vec<&T> {
        let deleted: HashSet<&str> = self
            .pending
            .iter()
            .filter_map(|change| match change {
                PendingChange::Delete(id) => Some(id.as_str()),
                PendingChange::Add(_) => None,
            })
            .collect();
        let confirmed_ids: HashSet<&str> = self.confirmed.iter().map(Entity::id).collect();

        let pending = self.pending.iter().filter_map(|change| match change {
            PendingChange::Add(item)
                if !confirmed_ids.contains(item.id()) && !deleted.contains(item.id()) =>
            {
                Some(item)
            }
            _ => None,
        });
        let confirmed = self
            .confirmed
            .iter()
            .filter(|item| !deleted.contains(item.id()));

        match self.placement {
            Placement::Front => pending.chain(confirmed).collect(),
            Placement::Back => confirmed.chain(pending).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items().into_iter().find(|item| item.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn confirmed(&self) -> &[T] {
        &self.confirmed
    }

    pub fn pending(&self) -> &[PendingChange<T>] {
        &self.pending
    }

    pub fn insert(&mut self, item: T) {
        match (self.mode, self.placement) {
            (SyncMode::Local, Placement::Front) => self.confirmed.insert(0, item),
            (SyncMode::Local, Placement::Back) => self.confirmed.push(item),
            (SyncMode::Remote, Placement::Front) => self.pending.insert(0, PendingChange::Add(item)),
            (SyncMode::Remote, Placement::Back) => self.pending.push(PendingChange::Add(item)),
        }
    }

    /// Appends behind every existing entry regardless of placement.
    pub fn append(&mut self, item: T) {
        match self.mode {
            SyncMode::Local => self.confirmed.push(item),
            SyncMode::Remote => self.pending.push(PendingChange::Add(item)),
        }
    }

    /// Removes the entry with `id` from the view, returning it.
    pub fn remove(&mut self, id: &str) -> Option<T> {
        let removed = self.get(id).cloned()?;

        match self.mode {
            SyncMode::Local => self.confirmed.retain(|item| item.id() != id),
            SyncMode::Remote => {
                self.pending.retain(|change| match change {
                    PendingChange::Add(item) => item.id() != id,
                    PendingChange::Delete(_) => true,
                });
                self.pending.push(PendingChange::Delete(id.to_string()));
            }
        }

        Some(removed)
    }

    /// Wholesale replacement of the confirmed layer.
    pub fn replace_confirmed(&mut self, items: Vec<T>) {
        self.confirmed = items;

        let confirmed_ids: HashSet<String> =
            self.confirmed.iter().map(|i| i.id().to_string()).collect();
        self.pending.retain(|change| match change {
            PendingChange::Add(item) => !confirmed_ids.contains(item.id()),
            PendingChange::Delete(id) => confirmed_ids.contains(id),
        });
    }

    pub fn clear(&mut self) {
        self.confirmed.clear();
        self.pending.clear();
    }
}
