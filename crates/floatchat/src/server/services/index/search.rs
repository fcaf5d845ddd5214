//! Vector search over the float metadata table

use anyhow::{anyhow, Result};
use arrow::array::{Array, Float32Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use futures::stream::StreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::Table;
use tracing::debug;

use super::models::FloatSearchResult;

/// Distance assumed when LanceDB omits the `_distance` column.
const DEFAULT_DISTANCE: f32 = 0.025;

/// Nearest-neighbour search returning documents ordered by similarity.
pub async fn search_similar_documents(
  table: &Table,
  query_embedding: &[f32],
  limit: usize,
) -> Result<Vec<FloatSearchResult>> {
  let mut results_stream = table
    .vector_search(query_embedding)?
    .column("embedding")
    .limit(limit)
    .execute()
    .await
    .map_err(|e| anyhow!("Vector search failed: {e}"))?;

  let mut results = Vec::new();
  while let Some(batch_result) = results_stream.next().await {
    let batch = batch_result.map_err(|e| anyhow!("Error reading batch: {e}"))?;
    results.extend(process_result_batch(&batch)?);
  }

  if results.is_empty() {
    debug!("no similar documents found");
  }
  Ok(results)
}

fn process_result_batch(batch: &RecordBatch) -> Result<Vec<FloatSearchResult>> {
  let wmo_id_array = batch
    .column_by_name("wmo_id")
    .ok_or_else(|| anyhow!("Missing 'wmo_id' column"))?
    .as_any()
    .downcast_ref::<Int64Array>()
    .ok_or_else(|| anyhow!("Failed to cast 'wmo_id' column to Int64Array"))?;
  let source_array = string_column(batch, "source")?;
  let document_array = string_column(batch, "document")?;
  let distance_array = batch
    .column_by_name("_distance")
    .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

  let mut batch_results = Vec::new();
  for i in 0..batch.num_rows() {
    let distance = distance_at(distance_array, i);
    batch_results.push(FloatSearchResult {
      wmo_id: wmo_id_array.value(i),
      source: source_array.value(i).to_string(),
      document: document_array.value(i).to_string(),
      similarity: distance_to_similarity(distance),
    });
  }

  Ok(batch_results)
}

fn string_column<'a>(batch: &'a RecordBatch, column_name: &str) -> Result<&'a StringArray> {
  batch
    .column_by_name(column_name)
    .ok_or_else(|| anyhow!("Missing '{column_name}' column"))?
    .as_any()
    .downcast_ref::<StringArray>()
    .ok_or_else(|| anyhow!("Failed to cast '{column_name}' column to StringArray"))
}

fn distance_at(distance_array: Option<&Float32Array>, row_index: usize) -> f32 {
  match distance_array {
    Some(array) if row_index < array.len() && !array.is_null(row_index) => {
      array.value(row_index)
    }
    _ => DEFAULT_DISTANCE,
  }
}

/// Unit-length embeddings put distances in [0, 2]; map linearly so a
/// perfect match scores 1.0.
fn distance_to_similarity(distance: f32) -> f32 {
  (2.0 - distance.min(2.0)) / 2.0
}
