//! Arrow RecordBatch conversion for the float metadata table

use anyhow::{anyhow, Result};
use arrow::array::{
  Array, FixedSizeListArray, FixedSizeListBuilder, Float32Array, Int64Array, StringArray,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

use super::models::FloatRecord;
use crate::server::services::embeddings::EMBEDDING_DIMENSION;

/// Convert float records to an Arrow RecordBatch.
pub fn records_to_arrow_batch(records: Vec<FloatRecord>) -> Result<RecordBatch> {
  if records.is_empty() {
    return Err(anyhow!("Cannot create RecordBatch from empty records"));
  }

  let schema = index_schema();
  let id_array = string_field(&records, |r| &r.id);
  let wmo_id_array = Int64Array::from_iter_values(records.iter().map(|r| r.wmo_id));
  let source_array = string_field(&records, |r| &r.source);
  let document_array = string_field(&records, |r| &r.document);
  let embedding_array = embedding_array(&records)?;
  let created_at_array = string_field(&records, |r| &r.created_at);

  let columns: Vec<Arc<dyn Array>> = vec![
    Arc::new(id_array),
    Arc::new(wmo_id_array),
    Arc::new(source_array),
    Arc::new(document_array),
    Arc::new(embedding_array),
    Arc::new(created_at_array),
  ];

  RecordBatch::try_new(schema, columns).map_err(|e| anyhow!("Failed to create RecordBatch: {e}"))
}

/// Arrow schema of the float metadata table.
pub fn index_schema() -> Arc<Schema> {
  Arc::new(Schema::new(vec![
    Field::new("id", DataType::Utf8, false),
    Field::new("wmo_id", DataType::Int64, false),
    Field::new("source", DataType::Utf8, false),
    Field::new("document", DataType::Utf8, false),
    Field::new(
      "embedding",
      DataType::FixedSizeList(
        Arc::new(Field::new("item", DataType::Float32, true)),
        EMBEDDING_DIMENSION as i32,
      ),
      false,
    ),
    Field::new("created_at", DataType::Utf8, false),
  ]))
}

fn string_field<F>(records: &[FloatRecord], field_fn: F) -> StringArray
where
  F: Fn(&FloatRecord) -> &str,
{
  let values: Vec<Option<&str>> = records.iter().map(|r| Some(field_fn(r))).collect();
  StringArray::from(values)
}

fn embedding_array(records: &[FloatRecord]) -> Result<FixedSizeListArray> {
  let mut builder = FixedSizeListBuilder::new(
    Float32Array::builder(EMBEDDING_DIMENSION * records.len()),
    EMBEDDING_DIMENSION as i32,
  );

  for record in records {
    if record.embedding.len() != EMBEDDING_DIMENSION {
      return Err(anyhow!(
        "Embedding for '{}' has {} dimensions, expected {}",
        record.id,
        record.embedding.len(),
        EMBEDDING_DIMENSION
      ));
    }
    for &value in &record.embedding {
      builder.values().append_value(value);
    }
    builder.append(true);
  }

  Ok(builder.finish())
}
