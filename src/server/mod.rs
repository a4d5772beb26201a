//! Server-side modules for the Liftlog sync server.

pub mod auth;
pub mod error;
pub mod routes;
pub mod storage;

pub use auth::{ApiKeyStore, AuthUser};
pub use error::ApiError;
pub use routes::{router, AppState};
pub use storage::{ServerStorage, ServerStorageError};
