//! Router configuration for the chat server.

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::ws::{chat_ws_handler, ChatWsState};

/// Create the main router: the chat WebSocket endpoint plus health check.
pub fn create_router(ws_state: Arc<ChatWsState>) -> Router {
    Router::new()
        .route("/ws", get(chat_ws_handler))
        .with_state(ws_state)
        .merge(create_health_router())
        .layer(TraceLayer::new_for_http())
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
