//! HTTP client for the Liftlog sync server.
//!
//! Writes and listings go over REST; change streams are WebSocket
//! connections whose text frames each carry a full collection snapshot as a
//! JSON array of documents.

use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::error::SyncError;
use super::remote::{BatchItem, ChangeStream, Collection, RemoteDocument, RemoteStore, UserScope};

#[derive(Serialize)]
struct PutRequest<'a> {
    id: &'a str,
    data: Value,
}

#[derive(Serialize)]
struct BatchRequest {
    items: Vec<BatchItem>,
}

/// Remote store reached over the network.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    server_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpRemote {
    pub fn new(server_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            server_url: server_url.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Checks that the server answers its health endpoint.
    pub async fn check_health(&self) -> Result<(), SyncError> {
        let response = self
            .client
            .get(self.build_http_url("/health"))
            .send()
            .await
            .map_err(|e| SyncError::Connection(e.to_string()))?;
        check_status(response.status())
    }

    fn collection_path(scope: &UserScope, collection: Collection) -> String {
        format!(
            "/users/{}/{}",
            urlencoding::encode(scope.as_str()),
            collection.as_str()
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, SyncError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| SyncError::Http(e.to_string()))?;
        check_status(response.status())?;
        Ok(response)
    }

    /// Builds the WebSocket URL for a path.
    fn build_ws_url(&self, path: &str) -> String {
        let base_url = if self.server_url.starts_with("http://") {
            self.server_url.replacen("http://", "ws://", 1)
        } else if self.server_url.starts_with("https://") {
            self.server_url.replacen("https://", "wss://", 1)
        } else if !self.server_url.starts_with("ws://") && !self.server_url.starts_with("wss://") {
            format!("ws://{}", self.server_url)
        } else {
            self.server_url.clone()
        };

        format!("{}{}", base_url.trim_end_matches('/'), path)
    }

    /// Builds an HTTP URL for a path.
    fn build_http_url(&self, path: &str) -> String {
        let base_url = if self.server_url.starts_with("ws://") {
            self.server_url.replacen("ws://", "http://", 1)
        } else if self.server_url.starts_with("wss://") {
            self.server_url.replacen("wss://", "https://", 1)
        } else if !self.server_url.starts_with("http://")
            && !self.server_url.starts_with("https://")
        {
            format!("http://{}", self.server_url)
        } else {
            self.server_url.clone()
        };

        format!("{}{}", base_url.trim_end_matches('/'), path)
    }
}

fn check_status(status: reqwest::StatusCode) -> Result<(), SyncError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(SyncError::Status(status.as_u16()))
    }
}

impl RemoteStore for HttpRemote {
    async fn list(
        &self,
        scope: &UserScope,
        collection: Collection,
    ) -> Result<Vec<RemoteDocument>, SyncError> {
        let url = self.build_http_url(&Self::collection_path(scope, collection));
        let response = self.send(self.client.get(url)).await?;
        response
            .json()
            .await
            .map_err(|e| SyncError::Serialization(e.to_string()))
    }

    async fn put(
        &self,
        scope: &UserScope,
        collection: Collection,
        id: &str,
        data: Value,
    ) -> Result<(), SyncError> {
        let url = self.build_http_url(&Self::collection_path(scope, collection));
        self.send(self.client.post(url).json(&PutRequest { id, data }))
            .await?;
        Ok(())
    }

    async fn delete(
        &self,
        scope: &UserScope,
        collection: Collection,
        id: &str,
    ) -> Result<(), SyncError> {
        let url = self.build_http_url(&format!(
            "{}/{}",
            Self::collection_path(scope, collection),
            urlencoding::encode(id)
        ));
        self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn create_batch(&self, scope: &UserScope, items: Vec<BatchItem>) -> Result<(), SyncError> {
        let url = self.build_http_url(&format!(
            "/users/{}/batch",
            urlencoding::encode(scope.as_str())
        ));
        self.send(self.client.post(url).json(&BatchRequest { items }))
            .await?;
        Ok(())
    }

    async fn watch(
        &self,
        scope: &UserScope,
        collection: Collection,
    ) -> Result<ChangeStream, SyncError> {
        let url = self.build_ws_url(&format!("{}/watch", Self::collection_path(scope, collection)));
        let mut request = url
            .into_client_request()
            .map_err(|e| SyncError::WebSocket(e.to_string()))?;
        if let Some(key) = &self.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|e| SyncError::WebSocket(e.to_string()))?;
            request.headers_mut().insert("Authorization", value);
        }

        let (ws_stream, _) = connect_async(request)
            .await
            .map_err(|e| SyncError::Connection(e.to_string()))?;
        tracing::debug!("Watching {} for {}", collection, scope);

        let stream = ws_stream.filter_map(|message| async move {
            match message {
                Ok(Message::Text(text)) => Some(
                    serde_json::from_str::<Vec<RemoteDocument>>(text.as_str())
                        .map_err(SyncError::from),
                ),
                Ok(_) => None,
                Err(e) => Some(Err(SyncError::WebSocket(e.to_string()))),
            }
        });
        Ok(stream.boxed())
    }
}
