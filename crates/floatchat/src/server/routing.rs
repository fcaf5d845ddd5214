//! Axum router configuration

use axum::{
  routing::{get, post},
  Router,
};

use crate::server::handlers::{chat, status, upload};

/// Create the application router.
pub fn create_router() -> Router {
  Router::new()
    // Health endpoints
    .route("/status", get(status::status))
    .route("/version", get(status::version))
    // Conversational pipeline
    .route("/chat", post(chat::chat))
    // Session context from uploaded float files
    .route("/upload", post(upload::upload))
}
