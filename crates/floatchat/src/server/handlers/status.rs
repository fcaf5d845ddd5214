//! Status and version endpoint handlers

use axum::response::Json;

use crate::config;
use crate::server::types::{StatusResponse, VersionResponse};

/// GET /status - Health check endpoint
pub async fn status() -> Json<StatusResponse> {
  Json(StatusResponse {
    status: "healthy".to_string(),
    index_dir: config::index_dir().to_string_lossy().to_string(),
    version: env!("CARGO_PKG_VERSION").to_string(),
  })
}

/// GET /version - Returns the service version
pub async fn version() -> Json<VersionResponse> {
  Json(VersionResponse { version: env!("CARGO_PKG_VERSION").to_string() })
}
