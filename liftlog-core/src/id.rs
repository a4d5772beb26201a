//! Identifier generation for new entities.
//!
//! Identifiers are opaque strings. Production code uses random UUIDs; tests
//! inject [`SequentialIds`] so that expected ids can be written out literally.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Produces unique opaque identifiers.
///
/// Implementations must not block. Uniqueness is only required for the
/// lifetime of one install, not globally.
pub trait IdGenerator: Send + Sync {
    fn new_id(&self) -> String;
}

/// Random v4 UUIDs in their simple (hyphen-less) form.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn new_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

/// Deterministic ids of the form `<prefix><n>`, starting at 1.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new("id")
    }
}

impl IdGenerator for SequentialIds {
    fn new_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", self.prefix, n)
    }
}
