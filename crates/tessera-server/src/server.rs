//! HTTP server: the remote-component endpoint and envelope slots.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use tessera_envelope::{Envelope, EnvelopeStore, FileStore, TransportError};
use tessera_markup::{serialize_strict, Component, Invocation, Props, RenderError};

use crate::components::server_panel;
use crate::data::ServerData;
use crate::watcher::{SlotEvent, SlotWatcher};
use crate::websocket::{EnvelopeHub, SlotMessage};

/// Configuration for the server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Open browser on start
    pub open: bool,

    /// Directory backing the envelope slots
    pub store_dir: PathBuf,

    /// Simulated upstream latency before rendering the root component
    pub data_delay: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7878,
            open: false,
            store_dir: PathBuf::from(".tessera"),
            data_delay: Duration::from_millis(500),
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid address {0}")]
    InvalidAddress(String),

    #[error("Failed to bind to {0}: {1}")]
    BindError(SocketAddr, String),

    #[error("File watch error: {0}")]
    WatchError(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Shared request state.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ServerConfig>,
    store: Arc<dyn EnvelopeStore>,
    hub: EnvelopeHub,
    root: Arc<dyn Component>,
}

impl AppState {
    /// State serving [`server_panel`] as the root component.
    pub fn new(config: ServerConfig, store: Arc<dyn EnvelopeStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            hub: EnvelopeHub::new(),
            root: server_panel(),
        }
    }

    /// Replace the root component.
    pub fn with_root(mut self, root: Arc<dyn Component>) -> Self {
        self.root = root;
        self
    }

    pub fn hub(&self) -> &EnvelopeHub {
        &self.hub
    }
}

/// Load the server data, then serialize `root` with it as the `data` prop.
///
/// The data is awaited before the tree is built; serialization itself is
/// synchronous. A failure of the root component is returned, failures deeper
/// in the tree are contained.
pub async fn render_root(
    root: &Arc<dyn Component>,
    data_delay: Duration,
) -> Result<String, RenderError> {
    let data = ServerData::load(data_delay)
        .await
        .to_value()
        .map_err(|e| RenderError::InvalidProp {
            key: "data".to_string(),
            message: e.to_string(),
        })?;

    serialize_strict(&Invocation::new(
        Arc::clone(root),
        Props::new().with("data", data),
    ))
}

/// Build the router for `state`.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/remote-component", post(remote_component_handler))
        .route(
            "/api/envelopes/{key}",
            get(get_envelope_handler).put(put_envelope_handler),
        )
        .route("/api/envelopes/{key}/live", get(live_envelope_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Tessera HTTP server.
pub struct AppServer {
    config: ServerConfig,
}

impl AppServer {
    /// Create a new server.
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Start the server.
    pub async fn start(self) -> Result<(), ServerError> {
        let address = format!("{}:{}", self.config.host, self.config.port);
        let addr: SocketAddr = address
            .parse()
            .map_err(|_| ServerError::InvalidAddress(address.clone()))?;

        // Watcher events carry absolute paths
        std::fs::create_dir_all(&self.config.store_dir).map_err(TransportError::from)?;
        let dir = self
            .config
            .store_dir
            .canonicalize()
            .map_err(TransportError::from)?;
        let store = Arc::new(FileStore::new(&dir));

        let state = AppState::new(self.config.clone(), store.clone());

        let (watcher, mut rx) =
            SlotWatcher::new(&dir).map_err(|e| ServerError::WatchError(e.to_string()))?;

        let hub = state.hub().clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                handle_slot_event(&store, &hub, event);
            }
            // Keep watcher alive
            drop(watcher);
        });

        let app = router(state);

        tracing::info!("Starting server at http://{}", addr);
        tracing::info!("Envelope slots stored in {}", dir.display());

        if self.config.open {
            let url = format!("http://{}/api/envelopes/{}", addr, tessera_envelope::DEFAULT_SLOT);
            let _ = open::that(&url);
        }

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        Ok(())
    }
}

/// Forward an on-disk slot change to the hub.
fn handle_slot_event(store: &FileStore, hub: &EnvelopeHub, event: SlotEvent) {
    match event {
        SlotEvent::Changed(path) => {
            let Some(key) = store.key_for(&path) else {
                return;
            };

            match store.get(&key) {
                Ok(Some(envelope)) => {
                    if let Err(e) = Envelope::decode(&envelope) {
                        tracing::warn!("Ignoring malformed envelope in slot {}: {}", key, e);
                        return;
                    }
                    if hub.publish(&key, &envelope) {
                        tracing::info!("Slot {} changed on disk", key);
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("Failed to read slot {}: {}", key, e),
            }
        }

        SlotEvent::Removed(path) => {
            if let Some(key) = store.key_for(&path) {
                tracing::info!("Slot {} removed", key);
                hub.clear(&key);
            }
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

fn transport_error_response(error: &TransportError) -> Response {
    match error {
        TransportError::InvalidKey(_) => error_response(StatusCode::BAD_REQUEST, "Invalid slot key"),
        _ => {
            tracing::error!("Envelope store failure: {}", error);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Envelope store unavailable")
        }
    }
}

/// Handler for the remote component endpoint.
async fn remote_component_handler(State(state): State<AppState>) -> Response {
    match render_root(&state.root, state.config.data_delay).await {
        Ok(markup) => Html(markup).into_response(),
        Err(e) => {
            tracing::error!("Error rendering component: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to render component")
        }
    }
}

/// Handler returning the envelope stored in a slot.
async fn get_envelope_handler(
    Path(key): Path<String>,
    State(state): State<AppState>,
) -> Response {
    match state.store.get(&key) {
        Ok(Some(envelope)) => ([(header::CONTENT_TYPE, "application/json")], envelope).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Slot is empty"),
        Err(e) => transport_error_response(&e),
    }
}

/// Handler storing an envelope in a slot.
async fn put_envelope_handler(
    Path(key): Path<String>,
    State(state): State<AppState>,
    body: String,
) -> Response {
    if let Err(e) = Envelope::decode(&body) {
        tracing::error!("Rejected envelope for slot {}: {}", key, e);
        return error_response(StatusCode::BAD_REQUEST, "Malformed envelope");
    }

    if let Err(e) = state.store.put(&key, &body) {
        return transport_error_response(&e);
    }

    state.hub.publish(&key, &body);
    StatusCode::NO_CONTENT.into_response()
}

/// Handler for the slot WebSocket endpoint.
async fn live_envelope_handler(
    ws: WebSocketUpgrade,
    Path(key): Path<String>,
    State(state): State<AppState>,
) -> Response {
    // Subscribe before reading so no update between the two is lost
    let rx = state.hub.subscribe();
    let current = match state.store.get(&key) {
        Ok(current) => current,
        Err(e) => return transport_error_response(&e),
    };

    ws.on_upgrade(move |socket| stream_slot(socket, rx, key, current))
}

/// Push updates for one slot to a WebSocket client.
async fn stream_slot(
    mut socket: WebSocket,
    mut rx: tokio::sync::broadcast::Receiver<SlotMessage>,
    key: String,
    current: Option<String>,
) {
    if !send_message(&mut socket, &SlotMessage::Connected).await {
        return;
    }

    if let Some(envelope) = current {
        let msg = SlotMessage::Updated {
            key: key.clone(),
            envelope,
        };
        if !send_message(&mut socket, &msg).await {
            return;
        }
    }

    loop {
        match rx.recv().await {
            Ok(msg) if msg.key() == Some(key.as_str()) => {
                if !send_message(&mut socket, &msg).await {
                    break;
                }
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("Subscriber to slot {} lagged by {} messages", key, skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Send a message, returning false once the client is gone.
async fn send_message(socket: &mut WebSocket, msg: &SlotMessage) -> bool {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to encode slot message: {}", e);
            return false;
        }
    };
    socket.send(Message::Text(json.into())).await.is_ok()
}
