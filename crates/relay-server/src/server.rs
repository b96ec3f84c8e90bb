//! `RelayServer`: Axum HTTP and WebSocket surface.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::rejection::QueryRejection;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use relay_core::Role;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::errors::ServerError;
use crate::health::{self, HealthResponse};
use crate::relay_loop::{spawn_relay, RelayHandle};
use crate::session::{run_session, SessionConfig};

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Handle to the relay loop.
    pub relay: RelayHandle,
    /// Settings for each accepted socket.
    pub session: SessionConfig,
    /// Largest accepted WebSocket message, in bytes.
    pub max_message_size: usize,
    /// Present only if the configured directory exists.
    pub static_dir: Option<Arc<PathBuf>>,
    /// `None` when the global recorder could not be installed.
    pub metrics: Option<PrometheusHandle>,
    /// Cancelled on process shutdown.
    pub shutdown: CancellationToken,
    /// When the server started, for uptime.
    pub start_time: Instant,
}

impl AppState {
    /// Shared state for `config`, with the static directory checked once.
    pub fn new(
        config: &ServerConfig,
        relay: RelayHandle,
        metrics: Option<PrometheusHandle>,
        shutdown: CancellationToken,
    ) -> Self {
        let static_dir = config
            .static_dir
            .as_ref()
            .filter(|dir| dir.is_dir())
            .map(|dir| Arc::new(dir.clone()));
        if static_dir.is_none() {
            debug!(configured = ?config.static_dir, "static asset directory not available");
        }
        Self {
            relay,
            session: SessionConfig {
                send_queue: config.send_queue,
                ping_interval: config.ping_interval(),
            },
            max_message_size: config.max_message_size,
            static_dir,
            metrics,
            shutdown,
            start_time: Instant::now(),
        }
    }
}

/// Build the Axum router. Any path upgrades to the relay on a WebSocket
/// handshake; other requests fall through to the static asset directory.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .fallback(relay_or_static)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Handshake query string.
#[derive(Debug, Default, Deserialize)]
pub struct ConnectQuery {
    /// Raw `type` value.
    #[serde(rename = "type")]
    pub role: Option<String>,
}

async fn relay_or_static(
    State(state): State<AppState>,
    query: Result<Query<ConnectQuery>, QueryRejection>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    request: Request,
) -> Response {
    if let Ok(ws) = ws {
        let role = Role::from_query(query.as_ref().ok().and_then(|q| q.role.as_deref()));
        let events = state.relay.events().clone();
        let session = state.session;
        let shutdown = state.shutdown.clone();
        return ws
            .max_message_size(state.max_message_size)
            .on_upgrade(move |socket| run_session(socket, role, events, session, shutdown))
            .into_response();
    }

    match &state.static_dir {
        Some(dir) => match ServeDir::new(dir.as_ref()).oneshot(request).await {
            Ok(resp) => resp.map(Body::new).into_response(),
            Err(never) => match never {},
        },
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.relay.snapshot();
    Json(health::health_check(
        state.start_time,
        snapshot.occupancy,
        snapshot.ai_control_enabled,
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

/// A bound, not yet serving, relay server.
pub struct RelayServer {
    listener: TcpListener,
    router: Router,
    local_addr: SocketAddr,
    relay: RelayHandle,
    relay_task: JoinHandle<()>,
    shutdown: CancellationToken,
}

impl RelayServer {
    /// Bind the listener and start the relay loop.
    pub async fn bind(
        config: &ServerConfig,
        metrics: Option<PrometheusHandle>,
        shutdown: CancellationToken,
    ) -> Result<Self, ServerError> {
        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::bind(addr.clone(), config.port, e))?;
        let local_addr = listener.local_addr()?;

        let (relay, relay_task) = spawn_relay(config.event_queue, shutdown.clone());
        let state = AppState::new(config, relay.clone(), metrics, shutdown.clone());
        let router = build_router(state);

        info!(addr = %local_addr, "relay server bound");
        Ok(Self {
            listener,
            router,
            local_addr,
            relay,
            relay_task,
            shutdown,
        })
    }

    /// Address actually bound.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle to the relay loop started by [`bind`](Self::bind).
    pub fn relay(&self) -> &RelayHandle {
        &self.relay
    }

    /// Serve until the shutdown token is cancelled.
    pub async fn serve(self) -> Result<(), ServerError> {
        let token = self.shutdown.clone();
        info!(addr = %self.local_addr, "relay server listening");
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await?;

        self.shutdown.cancel();
        let _ = self.relay_task.await;
        info!("relay server stopped");
        Ok(())
    }
}
