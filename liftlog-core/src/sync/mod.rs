//! Sync between the local store and a per-user remote document store.
//!
//! ## Flow
//!
//! 1. [`SyncAdapter::attach`] subscribes to the user's `workouts`,
//!    `routines` and `exercises` collections
//! 2. Each notification replaces the matching local collection wholesale
//! 3. Local writes made in remote mode sit in the store's outbox until
//!    [`SyncAdapter::flush`] pushes them
//! 4. [`SyncAdapter::detach`] drops the subscriptions; late notifications
//!    are ignored

mod adapter;
mod error;
mod http;
mod memory;
mod remote;

pub use adapter::{SyncAdapter, SyncEvent};
pub use error::SyncError;
pub use http::HttpRemote;
pub use memory::MemoryRemote;
pub use remote::{
    decode_documents, BatchItem, ChangeStream, Collection, RemoteDocument, RemoteStore, UserScope,
};
