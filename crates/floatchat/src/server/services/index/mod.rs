//! LanceDB-backed similarity index of float metadata documents
//!
//! One record per ingested NetCDF file. The offline `ingest` command is
//! the only writer; every chat request opens the index read-only for
//! top-k retrieval.

pub mod connection;
pub mod models;
pub mod records;
pub mod search;
pub mod table_manager;

use anyhow::Result;
use chrono::Utc;
use std::path::PathBuf;

use crate::ingest::FloatDocument;
use connection::create_connection;
use search::search_similar_documents;
use table_manager::TableManager;

pub use models::{FloatRecord, FloatSearchResult};

/// Name of the LanceDB table holding float metadata documents.
const TABLE_NAME: &str = "argo_float_metadata";

/// Similarity index over ingested float documents.
pub struct FloatIndexService {
  table_manager: TableManager,
}

impl FloatIndexService {
  /// Open (or create) the index at `data_dir`.
  pub async fn new(data_dir: PathBuf) -> Result<Self> {
    let connection = create_connection(data_dir).await?;
    let table_manager = TableManager::new(connection, TABLE_NAME.to_string());

    Ok(Self { table_manager })
  }

  /// Append a document with its embedding. Re-ingestion appends again;
  /// deduplication is deliberately not attempted.
  pub async fn store_document(
    &self,
    document: &FloatDocument,
    embedding: &[f32],
  ) -> Result<()> {
    let record = FloatRecord::new(
      document.wmo_id,
      document.source.clone(),
      document.document.clone(),
      embedding.to_vec(),
      Utc::now().to_rfc3339(),
    );

    if self.table_manager.table_exists().await? {
      self.table_manager.add_record(&record).await
    } else {
      self.table_manager.create_table_with_first_record(&record).await
    }
  }

  /// Nearest stored documents for a query embedding. A fresh index
  /// with no table yet has nothing to retrieve, so the result is empty
  /// rather than an error.
  pub async fn search_similar(
    &self,
    query_embedding: &[f32],
    limit: usize,
  ) -> Result<Vec<FloatSearchResult>> {
    if !self.table_manager.table_exists().await? {
      return Ok(Vec::new());
    }
    let table = self.table_manager.get_table().await?;
    search_similar_documents(&table, query_embedding, limit).await
  }

  /// Number of stored documents; zero when the table was never created.
  pub async fn count_documents(&self) -> Result<usize> {
    if !self.table_manager.table_exists().await? {
      return Ok(0);
    }
    self.table_manager.count_documents().await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::server::services::embeddings::EMBEDDING_DIMENSION;
  use tempfile::TempDir;

  #[tokio::test]
  async fn search_on_fresh_index_returns_no_results() {
    let dir = TempDir::new().unwrap();
    let index = FloatIndexService::new(dir.path().join("index")).await.unwrap();

    // Retrieval before any ingestion answers with empty context
    // instead of failing the request.
    let query = vec![0.0f32; EMBEDDING_DIMENSION];
    let results = index.search_similar(&query, 1).await.unwrap();
    assert!(results.is_empty());
    assert_eq!(index.count_documents().await.unwrap(), 0);
  }

  #[tokio::test]
  async fn stored_document_is_retrievable() {
    let dir = TempDir::new().unwrap();
    let index = FloatIndexService::new(dir.path().join("index")).await.unwrap();

    let document = FloatDocument {
      source: "float.nc".to_string(),
      wmo_id: 1900121,
      document: "WMO ID: 1900121".to_string(),
    };
    let mut embedding = vec![0.0f32; EMBEDDING_DIMENSION];
    embedding[0] = 1.0;
    index.store_document(&document, &embedding).await.unwrap();

    let results = index.search_similar(&embedding, 1).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].wmo_id, 1900121);
    assert_eq!(results[0].document, "WMO ID: 1900121");
    assert_eq!(index.count_documents().await.unwrap(), 1);
  }
}
