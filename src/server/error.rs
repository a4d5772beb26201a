//! Error responses for the sync server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use liftlog_core::SyncError;

use super::storage::ServerStorageError;

/// Errors returned from request handlers.
#[derive(Debug)]
pub enum ApiError {
    /// User in the path can't name a storage directory
    InvalidUser(String),
    /// Collection in the path isn't workouts, routines or exercises
    UnknownCollection(String),
    /// Authenticated key belongs to another user
    Forbidden(String),
    /// Failed to write the collection to disk
    Storage(ServerStorageError),
    /// The document store rejected the operation
    Store(SyncError),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::InvalidUser(user) => write!(f, "Invalid user: '{}'", user),
            ApiError::UnknownCollection(name) => write!(f, "Unknown collection: {}", name),
            ApiError::Forbidden(user) => write!(f, "API key may not access user '{}'", user),
            ApiError::Storage(e) => write!(f, "Storage error: {}", e),
            ApiError::Store(e) => write!(f, "Store error: {}", e),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<ServerStorageError> for ApiError {
    fn from(e: ServerStorageError) -> Self {
        match e {
            ServerStorageError::InvalidUserId(user) => ApiError::InvalidUser(user),
            other => ApiError::Storage(other),
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::UnknownCollection(name) => ApiError::UnknownCollection(name),
            other => ApiError::Store(other),
        }
    }
}

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidUser(_) | ApiError::UnknownCollection(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidUser(_) => "invalid_user",
            ApiError::UnknownCollection(_) => "unknown_collection",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::Storage(_) => "storage_error",
            ApiError::Store(_) => "store_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        let body = ErrorBody {
            error: self.code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
