//! Data models for the similarity index

use serde::{Deserialize, Serialize};

/// Record stored in the LanceDB table, one per ingested float file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloatRecord {
  pub id: String,
  pub wmo_id: i64,
  pub source: String,
  pub document: String,
  pub embedding: Vec<f32>,
  pub created_at: String,
}

impl FloatRecord {
  pub fn new(
    wmo_id: i64,
    source: String,
    document: String,
    embedding: Vec<f32>,
    created_at: String,
  ) -> Self {
    let id = format!("{source}:{wmo_id}");
    Self { id, wmo_id, source, document, embedding, created_at }
  }
}

/// Result of a similarity search over stored documents.
#[derive(Debug, Clone)]
pub struct FloatSearchResult {
  pub wmo_id: i64,
  pub source: String,
  pub document: String,
  pub similarity: f32,
}
