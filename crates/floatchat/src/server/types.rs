//! Request and response bodies for the REST API

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `POST /chat`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
  /// The user's natural-language question.
  pub message: String,

  /// Context text from a previously uploaded file. Held entirely by the
  /// client and resent verbatim; the server never validates it.
  #[serde(default)]
  pub session_context: Option<String>,
}

/// Body of a successful `POST /chat` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
  /// Conversational summary of the result set.
  pub summary: String,

  /// The executed SQL, returned for transparency.
  pub sql_query: String,

  /// Suggested visualization label.
  pub chart_type: String,

  /// Result rows; the shape is whatever the generated SQL returned.
  pub data: Vec<Map<String, Value>>,
}

/// Body of a successful `POST /upload` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
  pub filename: String,
  pub message: String,

  /// Context block the client must resend as `session_context`.
  pub session_context: String,
}

/// Error body for failed requests.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
  pub detail: String,
}

/// Response for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
  pub status: String,
  pub index_dir: String,
  pub version: String,
}

/// Response for `GET /version`.
#[derive(Debug, Serialize, Deserialize)]
pub struct VersionResponse {
  pub version: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn session_context_is_optional() {
    let request: ChatRequest =
      serde_json::from_str(r#"{"message": "show me float 1900121"}"#).unwrap();
    assert_eq!(request.message, "show me float 1900121");
    assert!(request.session_context.is_none());
  }

  #[test]
  fn chat_response_serializes_row_objects() {
    let mut row = Map::new();
    row.insert("latitude".to_string(), Value::from(-12.35));
    row.insert("longitude".to_string(), Value::from(67.89));

    let response = ChatResponse {
      summary: "One profile found.".to_string(),
      sql_query: "SELECT p.latitude, p.longitude FROM profiles p".to_string(),
      chart_type: "map".to_string(),
      data: vec![row],
    };

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["chart_type"], "map");
    assert_eq!(json["data"][0]["latitude"], -12.35);
  }
}
