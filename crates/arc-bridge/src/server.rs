//! `BridgeServer`: axum HTTP server that upgrades every path to a bridge
//! session, plus `/health`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::{Extension, Router};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::health::{self, HealthResponse};
use crate::registry::SessionRegistry;
use crate::session::{TcpTarget, run_session};

/// Shared state accessible from axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Live sessions and shutdown token.
    pub sessions: Arc<SessionRegistry>,
    /// Backend to dial for each session.
    pub target: TcpTarget,
    /// Session cap, if any.
    pub max_sessions: Option<usize>,
    /// Inbound message size cap.
    pub max_message_size: usize,
    /// When the server started.
    pub start_time: Instant,
}

/// The WebSocket-to-TCP bridge server.
pub struct BridgeServer {
    config: BridgeConfig,
    sessions: Arc<SessionRegistry>,
    start_time: Instant,
}

impl BridgeServer {
    /// Create a new server.
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            sessions: Arc::new(SessionRegistry::new()),
            start_time: Instant::now(),
        }
    }

    /// Build the axum router.
    pub fn router(&self) -> Router {
        let state = AppState {
            sessions: self.sessions.clone(),
            target: TcpTarget {
                addr: self.config.tcp_addr(),
                connect_timeout: self.config.connect_timeout(),
            },
            max_sessions: self.config.max_sessions,
            max_message_size: self.config.max_message_size,
            start_time: self.start_time,
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/", get(ws_handler))
            .route("/{*path}", get(ws_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Bind the listener and serve in a background task until
    /// [`shutdown`](Self::shutdown) is called.
    ///
    /// Returns the bound address (useful with port 0) and the server task.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>)> {
        let addr = self.config.listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| BridgeError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local = listener
            .local_addr()
            .map_err(|source| BridgeError::Bind { addr, source })?;

        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();
        let shutdown = self.sessions.shutdown_token();

        info!(addr = %local, tcp_target = %self.config.tcp_addr(), "bridge listening");
        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await;
            if let Err(err) = result {
                error!(error = %err, "bridge server failed");
            }
            info!("bridge server stopped");
        });
        Ok((local, handle))
    }

    /// Live session registry.
    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// Server configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Stop accepting connections and cancel every live session.
    pub fn shutdown(&self) {
        info!(active = self.sessions.active_count(), "bridge shutting down");
        self.sessions.shutdown();
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        &state.sessions,
        &state.target.addr,
    ))
}

/// GET on any other path: upgrade and bridge.
async fn ws_handler(
    State(state): State<AppState>,
    connect_info: Option<Extension<ConnectInfo<SocketAddr>>>,
    ws: WebSocketUpgrade,
) -> Response {
    let peer = connect_info.map(|Extension(ConnectInfo(addr))| addr);

    let Some(guard) = state.sessions.try_open(peer, state.max_sessions) else {
        warn!(
            peer = ?peer,
            active = state.sessions.active_count(),
            "rejecting websocket client: bridge unavailable"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "bridge unavailable").into_response();
    };

    let target = state.target.clone();
    ws.max_message_size(state.max_message_size)
        .on_failed_upgrade(|err| warn!(error = %err, "websocket upgrade failed"))
        .on_upgrade(move |socket| run_session(socket, guard, target))
}
