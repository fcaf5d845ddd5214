//! REST server startup and configuration

use anyhow::{anyhow, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::serve;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config;
use crate::server::routing::create_router;

/// Uploaded profile files run to tens of megabytes.
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Start the REST server.
pub async fn start_server(addr: SocketAddr) -> Result<()> {
  info!("starting floatchat REST server on {addr}");

  let app = create_router().layer(
    ServiceBuilder::new()
      .layer(TraceLayer::new_for_http())
      .layer(cors_layer()?)
      .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
  );

  let listener = TcpListener::bind(addr).await?;
  info!("server listening on {addr}");

  serve(listener, app).await.map_err(|e| anyhow!("server error: {e}"))
}

/// CORS restricted to the frontend origins we serve; all methods and
/// headers are permitted for those origins.
fn cors_layer() -> Result<CorsLayer> {
  let origins = config::ALLOWED_ORIGINS
    .iter()
    .map(|origin| {
      origin
        .parse::<HeaderValue>()
        .map_err(|e| anyhow!("invalid CORS origin '{origin}': {e}"))
    })
    .collect::<Result<Vec<_>>>()?;

  Ok(
    CorsLayer::new()
      .allow_origin(origins)
      .allow_methods(AllowMethods::any())
      .allow_headers(AllowHeaders::any()),
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn configured_origins_parse_as_header_values() {
    assert!(cors_layer().is_ok());
  }
}
