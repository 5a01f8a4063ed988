//! Router configuration for the chat server.

use axum::{routing::get, Router};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::chat::RoomRegistry;
use crate::config::WebConfig;

use super::cors::create_cors_layer;
use super::ws::{chat_ws_handler, ChatWsState};

/// Create the main router: chat WebSocket, health check, and (if enabled)
/// the static front-end.
pub fn create_router(registry: Arc<RoomRegistry>, config: &WebConfig) -> Router {
    let ws_state = Arc::new(ChatWsState::new(registry));

    let mut router = Router::new()
        .route("/ws", get(chat_ws_handler))
        .with_state(ws_state)
        .merge(create_health_router());

    if config.serve_static {
        if let Some(static_router) = create_static_router(&config.static_path) {
            router = router.merge(static_router);
        }
    }

    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(create_cors_layer(&config.cors_origins)),
    )
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

/// Create a router serving files from `path`, falling back to `index.html`.
///
/// Returns None if the directory doesn't exist.
pub fn create_static_router(path: &str) -> Option<Router> {
    let dir = Path::new(path);
    if !dir.is_dir() {
        tracing::warn!("Static files directory not found: {}", path);
        return None;
    }

    let index = dir.join("index.html");
    let serve_dir = ServeDir::new(dir).fallback(ServeFile::new(index));
    Some(Router::new().fallback_service(serve_dir))
}
