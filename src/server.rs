//! HTTP and WebSocket chat server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/ws` | WebSocket upgrade for chat sessions |
//! | `GET`  | `/health` | Readiness probe with corpus counts |
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser-based chat
//! widgets can connect from any page.

use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::pipeline::Pipeline;
use crate::session;

/// Shared application state passed to all route handlers via Axum's
/// `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// `None` means the pipeline never initialized. The serve command aborts
    /// on startup failure, so in production this is always `Some`; sessions
    /// still check and report unavailability rather than drop queries.
    pub pipeline: Option<Arc<Pipeline>>,
}

/// Build the application router. Split out of [`run_server`] so tests can
/// mount the routes on an ephemeral listener.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(handle_ws))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Bind the configured address and serve until the process is terminated.
pub async fn run_server(config: &Config, state: AppState) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = build_router(state);

    println!("Chat server listening on http://{}", bind_addr);
    tracing::info!(addr = %bind_addr, "chat server listening");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| session::run_session(socket, state.pipeline.clone()))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    documents: usize,
    chunks: usize,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let version = env!("CARGO_PKG_VERSION");
    match &state.pipeline {
        Some(pipeline) => Json(HealthResponse {
            status: "ok",
            version,
            documents: pipeline.summary().documents,
            chunks: pipeline.summary().chunks,
        }),
        None => Json(HealthResponse {
            status: "unready",
            version,
            documents: 0,
            chunks: 0,
        }),
    }
}
