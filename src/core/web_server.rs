//! HTTP server: webhook intake, REST file API, health and index pages.
//!
//! Runs on WEB_PORT (default 8080) and stops gracefully on Ctrl-C.

use axum::{
    extract::{DefaultBodyLimit, State},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::Utc;
use serde_json::json;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::core::files_api;
use crate::storage::files::FileStore;
use crate::telegram::handlers::HandlerDeps;
use crate::telegram::webhook;

/// Shared state for every route.
#[derive(Clone)]
pub struct AppState {
    pub deps: HandlerDeps,
    pub files: FileStore,
}

impl AppState {
    pub fn new(deps: HandlerDeps, files: FileStore) -> Self {
        Self { deps, files }
    }
}

/// Builds the full router. Exposed separately so tests can drive it without a socket.
pub fn router(state: AppState) -> Router {
    let body_limit = state.deps.config.max_content_bytes;

    Router::new()
        .merge(webhook::routes())
        .nest("/api", files_api::routes(state.clone()))
        .route("/health", get(health_handler))
        .route("/", get(index_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the web server and serve until Ctrl-C.
pub async fn start_web_server(port: u16, state: AppState) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(state);

    log::info!("Starting web server on http://{}", addr);
    log::info!("  POST /webhook     - Telegram updates");
    log::info!("  GET  /setwebhook  - Register the webhook");
    log::info!("  /api/*            - File API (bearer key)");
    log::info!("  GET  /health      - Health check");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    log::info!("Web server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => log::info!("Shutdown signal received"),
        Err(e) => log::error!("Failed to listen for Ctrl-C: {}", e),
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let files_count = match state.files.list().await {
        Ok(files) => files.len(),
        Err(e) => {
            log::warn!("Health check could not list stored files: {}", e);
            0
        }
    };

    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "files_count": files_count,
        "registry_count": state.deps.registry.len(),
    }))
}

/// GET /
async fn index_handler() -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "webhook": "POST /webhook",
            "set_webhook": "GET /setwebhook",
            "upload": "POST /api/upload",
            "list": "GET /api/files",
            "download": "GET /api/files/{name}",
            "delete": "DELETE /api/files/{name}",
            "info": "GET /api/info/{name}",
            "stats": "GET /api/stats",
            "health": "GET /health",
        }
    }))
}
