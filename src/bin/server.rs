//! Liftlog Sync Server
//!
//! Stores each user's workouts, routines and exercises as JSON documents and
//! streams collection snapshots to connected clients.
//!
//! # Configuration
//!
//! Environment variables:
//! - `LIFTLOG_PORT`: Port to listen on (default: 8080)
//! - `LIFTLOG_SERVER_DATA_DIR`: Directory to store collections (default: ~/.local/share/liftlog-server)
//! - `LIFTLOG_SERVER_CONFIG`: Path to config file (default: ~/.config/liftlog-server/config.yaml)
//!
//! # Config File Format
//!
//! ```yaml
//! api_keys:
//!   - key: "your-secret-key-here"
//!     user_id: "alice"
//! ```
//!
//! Without any keys the server accepts unauthenticated requests.
//!
//! # Endpoints
//!
//! - `GET /health`: Health check endpoint (no auth required)
//! - `GET|POST /users/{user}/{collection}`: List or write documents
//! - `DELETE /users/{user}/{collection}/{id}`: Delete a document
//! - `POST /users/{user}/batch`: Write several documents at once
//! - `GET /users/{user}/{collection}/watch`: WebSocket snapshot stream

use std::net::SocketAddr;
use std::path::PathBuf;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use liftlog::server::{router, ApiKeyStore, AppState, ServerStorage};

/// Server configuration
#[derive(Debug, Clone)]
struct Config {
    /// Port to listen on
    port: u16,
    /// Directory to store collections
    data_dir: PathBuf,
    /// Path to config file
    config_path: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        let port = std::env::var("LIFTLOG_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let data_dir = std::env::var("LIFTLOG_SERVER_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("liftlog-server")
            });

        let config_path = std::env::var("LIFTLOG_SERVER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::config_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("liftlog-server")
                    .join("config.yaml")
            });

        Self {
            port,
            data_dir,
            config_path,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "liftlog_server=info,liftlog=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(Config::from_env()).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(&config.data_dir)
        .map_err(|e| format!("Failed to create data directory: {}", e))?;

    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!("Config file: {}", config.config_path.display());

    let api_keys = ApiKeyStore::load(&config.config_path);
    let state = AppState::load(api_keys, ServerStorage::new(&config.data_dir))?;

    let app = router(state).layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
