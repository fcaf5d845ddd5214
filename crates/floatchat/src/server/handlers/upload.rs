//! Upload endpoint: NetCDF file -> session context text
//!
//! The upload is parsed in-memory and nothing is stored server-side; the
//! client carries the returned context block on subsequent chat turns.

use axum::{extract::Multipart, http::StatusCode, response::Json as ResponseJson};
use tracing::{error, info};

use crate::argo;
use crate::server::types::{ErrorResponse, UploadResponse};

type UploadError = (StatusCode, ResponseJson<ErrorResponse>);

/// POST /upload - Parse an uploaded float file into session context
pub async fn upload(
  mut multipart: Multipart,
) -> Result<ResponseJson<UploadResponse>, UploadError> {
  let field = loop {
    match multipart.next_field().await {
      Ok(Some(field)) if field.name() == Some("file") => break field,
      Ok(Some(_)) => continue,
      Ok(None) => return Err(bad_request("No file uploaded.")),
      Err(e) => return Err(bad_request(&format!("Malformed multipart body: {e}"))),
    }
  };

  // Extension gate runs before any bytes are read or parsed.
  let filename = field.file_name().unwrap_or_default().to_string();
  if !filename.ends_with(".nc") {
    return Err(bad_request("Invalid file type."));
  }

  let bytes = field.bytes().await.map_err(|e| {
    error!("failed to read upload body: {e}");
    internal_error(&format!("Failed to read uploaded file: {e}"))
  })?;

  match argo::extract_metadata_from_bytes(&bytes) {
    Ok(metadata) => {
      info!("processed upload {filename} for float {}", metadata.wmo_id);
      Ok(ResponseJson(UploadResponse {
        message: format!("Successfully processed {filename}. I am now aware of this float."),
        session_context: metadata.session_context(),
        filename,
      }))
    }
    Err(e) => {
      error!("failed to process upload {filename}: {e:#}");
      Err(internal_error(&format!("Failed to process file: {e:#}")))
    }
  }
}

fn bad_request(detail: &str) -> UploadError {
  (StatusCode::BAD_REQUEST, ResponseJson(ErrorResponse { detail: detail.to_string() }))
}

fn internal_error(detail: &str) -> UploadError {
  (StatusCode::INTERNAL_SERVER_ERROR, ResponseJson(ErrorResponse { detail: detail.to_string() }))
}
