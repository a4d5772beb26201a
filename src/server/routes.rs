//! HTTP and WebSocket routes for per-user document collections.
//!
//! - `GET /health`: health check (no auth required)
//! - `GET /users/{user}/{collection}`: list documents
//! - `POST /users/{user}/{collection}`: create or replace `{id, data}`
//! - `DELETE /users/{user}/{collection}/{id}`: delete a document
//! - `POST /users/{user}/batch`: write `{items: [{collection, id, data}]}` at once
//! - `GET /users/{user}/{collection}/watch`: WebSocket; one text frame per
//!   snapshot, current snapshot first

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    middleware,
    response::Response,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;

use liftlog_core::sync::BatchItem;
use liftlog_core::{Collection, MemoryRemote, RemoteDocument};

use super::auth::{auth_middleware, ApiKeyStore, AuthUser};
use super::error::ApiError;
use super::storage::{validate_user_id, ServerStorage, ServerStorageError};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub api_keys: Arc<ApiKeyStore>,
    pub remote: MemoryRemote,
    pub storage: ServerStorage,
}

impl AppState {
    /// Builds the state, loading every persisted collection.
    pub fn load(api_keys: ApiKeyStore, storage: ServerStorage) -> Result<Self, ServerStorageError> {
        let remote = MemoryRemote::new();
        let loaded = storage.load_into(&remote)?;
        tracing::info!("Loaded {} stored collection(s)", loaded);
        Ok(Self {
            api_keys: Arc::new(api_keys),
            remote,
            storage,
        })
    }
}

#[derive(Debug, Deserialize)]
struct PutRequest {
    id: String,
    data: Value,
}

#[derive(Debug, Deserialize)]
struct BatchRequest {
    items: Vec<BatchItem>,
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint (no auth required)
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Checks the path user against the authenticated key.
///
/// No `AuthUser` means the server has no keys configured.
fn authorize(auth: Option<Extension<AuthUser>>, user: &str) -> Result<(), ApiError> {
    validate_user_id(user)?;
    match auth {
        Some(Extension(auth)) if auth.user_id != user => Err(ApiError::Forbidden(user.to_string())),
        _ => Ok(()),
    }
}

fn resolve(
    auth: Option<Extension<AuthUser>>,
    user: &str,
    collection: &str,
) -> Result<Collection, ApiError> {
    authorize(auth, user)?;
    Ok(collection.parse::<Collection>()?)
}

async fn list_documents(
    State(state): State<AppState>,
    auth: Option<Extension<AuthUser>>,
    Path((user, collection)): Path<(String, String)>,
) -> Result<Json<Vec<RemoteDocument>>, ApiError> {
    let collection = resolve(auth, &user, &collection)?;
    Ok(Json(state.remote.list_documents(&user, collection)?))
}

async fn put_document(
    State(state): State<AppState>,
    auth: Option<Extension<AuthUser>>,
    Path((user, collection)): Path<(String, String)>,
    Json(request): Json<PutRequest>,
) -> Result<StatusCode, ApiError> {
    let collection = resolve(auth, &user, &collection)?;
    state
        .remote
        .put_document(&user, collection, &request.id, request.data)?;
    state.storage.persist(&state.remote, &user, collection)?;
    tracing::debug!("Stored {}/{}/{}", user, collection, request.id);
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_document(
    State(state): State<AppState>,
    auth: Option<Extension<AuthUser>>,
    Path((user, collection, id)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    let collection = resolve(auth, &user, &collection)?;
    if state.remote.delete_document(&user, collection, &id)? {
        state.storage.persist(&state.remote, &user, collection)?;
        tracing::debug!("Deleted {}/{}/{}", user, collection, id);
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn create_batch(
    State(state): State<AppState>,
    auth: Option<Extension<AuthUser>>,
    Path(user): Path<String>,
    Json(request): Json<BatchRequest>,
) -> Result<StatusCode, ApiError> {
    authorize(auth, &user)?;

    let mut touched: Vec<Collection> = request.items.iter().map(|item| item.collection).collect();
    touched.sort();
    touched.dedup();

    let count = request.items.len();
    state.remote.create_documents(&user, request.items)?;
    for collection in touched {
        state.storage.persist(&state.remote, &user, collection)?;
    }
    tracing::info!("Batch wrote {} document(s) for {}", count, user);
    Ok(StatusCode::NO_CONTENT)
}

async fn watch_collection(
    State(state): State<AppState>,
    auth: Option<Extension<AuthUser>>,
    Path((user, collection)): Path<(String, String)>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let collection = resolve(auth, &user, &collection)?;
    let receiver = state.remote.subscribe(&user, collection)?;
    tracing::debug!("Watching {}/{}", user, collection);
    Ok(ws.on_upgrade(move |socket| stream_snapshots(socket, receiver)))
}

/// Sends the current snapshot, then one frame per change until either side
/// goes away.
async fn stream_snapshots(mut socket: WebSocket, mut receiver: watch::Receiver<Vec<RemoteDocument>>) {
    loop {
        let text = match serde_json::to_string(&*receiver.borrow_and_update()) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Failed to encode snapshot: {}", e);
                return;
            }
        };
        if socket.send(Message::Text(text.into())).await.is_err() {
            return;
        }

        loop {
            tokio::select! {
                changed = receiver.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    break;
                }
                incoming = socket.recv() => match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                    Some(Ok(_)) => {}
                },
            }
        }
    }
}

/// Builds the router. Everything except `/health` goes through
/// [`auth_middleware`].
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new().route("/health", get(health));

    let protected_routes = Router::new()
        .route(
            "/users/{user}/{collection}",
            get(list_documents).post(put_document),
        )
        .route("/users/{user}/batch", post(create_batch))
        .route(
            "/users/{user}/{collection}/watch",
            get(watch_collection),
        )
        .route("/users/{user}/{collection}/{id}", delete(delete_document))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
