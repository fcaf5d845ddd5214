//! Table lifecycle operations for the float metadata index

use anyhow::{anyhow, Result};
use arrow::record_batch::RecordBatchIterator;
use lancedb::{Connection, Table};
use tracing::info;

use super::models::FloatRecord;
use super::records::records_to_arrow_batch;

pub struct TableManager {
  connection: Connection,
  table_name: String,
}

impl TableManager {
  pub fn new(connection: Connection, table_name: String) -> Self {
    Self { connection, table_name }
  }

  /// Check if the target table exists.
  pub async fn table_exists(&self) -> Result<bool> {
    let tables = self
      .connection
      .table_names()
      .execute()
      .await
      .map_err(|e| anyhow!("Failed to list tables: {e}"))?;
    Ok(tables.contains(&self.table_name))
  }

  /// Open the table.
  pub async fn get_table(&self) -> Result<Table> {
    self
      .connection
      .open_table(&self.table_name)
      .execute()
      .await
      .map_err(|e| anyhow!("Failed to open table '{}': {e}", self.table_name))
  }

  /// Create the table, seeded with its first record.
  pub async fn create_table_with_first_record(&self, record: &FloatRecord) -> Result<()> {
    let batch = records_to_arrow_batch(vec![record.clone()])?;
    let schema = batch.schema();
    let batch_iter = RecordBatchIterator::new(vec![Ok(batch)], schema);

    self
      .connection
      .create_table(&self.table_name, batch_iter)
      .execute()
      .await
      .map_err(|e| anyhow!("Failed to create table with first record: {e}"))?;

    info!("created table '{}' with float {}", self.table_name, record.wmo_id);
    Ok(())
  }

  /// Append a record to the existing table.
  pub async fn add_record(&self, record: &FloatRecord) -> Result<()> {
    let batch = records_to_arrow_batch(vec![record.clone()])?;
    let schema = batch.schema();
    let batch_iter = RecordBatchIterator::new(vec![Ok(batch)], schema);

    let table = self.get_table().await?;
    table
      .add(batch_iter)
      .execute()
      .await
      .map_err(|e| anyhow!("Failed to store document: {e}"))?;

    info!("stored document for float {}", record.wmo_id);
    Ok(())
  }

  /// Count stored documents.
  pub async fn count_documents(&self) -> Result<usize> {
    let table = self.get_table().await?;
    let count = table.count_rows(None).await?;
    Ok(count)
  }
}
