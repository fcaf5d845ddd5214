//! Per-request Postgres execution of model-generated SQL
//!
//! The SQL text comes straight from the language model, so the result
//! shape is only known at runtime. Rows are materialised into JSON
//! objects keyed by column name, decoding by the column's Postgres type.

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Number, Value};
use sqlx::postgres::{PgConnection, PgRow};
use sqlx::types::BigDecimal;
use sqlx::{Column, Connection, Executor, Row, TypeInfo};
use tracing::warn;

/// Materialised query result: rows as JSON objects plus the column
/// names of the statement, which survive even when no rows come back.
#[derive(Debug)]
pub struct QueryOutput {
  pub columns: Vec<String>,
  pub rows: Vec<Map<String, Value>>,
}

/// Execute `sql` verbatim over a fresh connection and materialise every
/// row. Execution failures propagate unchanged; there is no repair.
pub async fn run_query(database_url: &str, sql: &str) -> Result<QueryOutput> {
  let mut connection = PgConnection::connect(database_url)
    .await
    .map_err(|e| anyhow!("failed to connect to database: {e}"))?;

  let rows = sqlx::query(sql)
    .fetch_all(&mut connection)
    .await
    .map_err(|e| anyhow!("query execution failed: {e}"))?;

  let rows: Vec<Map<String, Value>> = rows.iter().map(row_to_json).collect::<Result<_>>()?;
  let columns = match result_columns(&rows) {
    Some(columns) => columns,
    None => describe_columns(&mut connection, sql).await?,
  };

  Ok(QueryOutput { columns, rows })
}

/// Column names from the first row, where one exists.
fn result_columns(rows: &[Map<String, Value>]) -> Option<Vec<String>> {
  rows.first().map(|row| row.keys().cloned().collect())
}

/// Column names from the prepared statement's description. Needed for
/// empty result sets, where there is no row to take names from.
async fn describe_columns(connection: &mut PgConnection, sql: &str) -> Result<Vec<String>> {
  let description = connection
    .describe(sql)
    .await
    .map_err(|e| anyhow!("failed to describe query: {e}"))?;
  Ok(description.columns().iter().map(|column| column.name().to_string()).collect())
}

/// Convert one row into a JSON object keyed by column name.
fn row_to_json(row: &PgRow) -> Result<Map<String, Value>> {
  let mut object = Map::new();
  for column in row.columns() {
    let value = column_value(row, column.ordinal(), column.type_info().name())?;
    object.insert(column.name().to_string(), value);
  }
  Ok(object)
}

/// Decode a single column by its Postgres type name. NULLs become JSON
/// null; types outside the float schema's reach also become null.
fn column_value(row: &PgRow, index: usize, type_name: &str) -> Result<Value> {
  let value = match type_name {
    "INT2" => row.try_get::<Option<i16>, _>(index)?.map(|v| Value::Number(v.into())),
    "INT4" => row.try_get::<Option<i32>, _>(index)?.map(|v| Value::Number(v.into())),
    "INT8" => row.try_get::<Option<i64>, _>(index)?.map(|v| Value::Number(v.into())),
    "FLOAT4" => row.try_get::<Option<f32>, _>(index)?.and_then(|v| float_value(v as f64)),
    "FLOAT8" => row.try_get::<Option<f64>, _>(index)?.and_then(float_value),
    "NUMERIC" => row.try_get::<Option<BigDecimal>, _>(index)?.map(numeric_value),
    "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
      row.try_get::<Option<String>, _>(index)?.map(Value::String)
    }
    "BOOL" => row.try_get::<Option<bool>, _>(index)?.map(Value::Bool),
    "TIMESTAMP" => row
      .try_get::<Option<NaiveDateTime>, _>(index)?
      .map(|v| Value::String(v.to_string())),
    "TIMESTAMPTZ" => row
      .try_get::<Option<DateTime<Utc>>, _>(index)?
      .map(|v| Value::String(v.to_rfc3339())),
    "DATE" => {
      row.try_get::<Option<NaiveDate>, _>(index)?.map(|v| Value::String(v.to_string()))
    }
    other => {
      warn!("unsupported column type '{other}'; returning null");
      None
    }
  };
  Ok(value.unwrap_or(Value::Null))
}

/// JSON numbers cannot hold NaN or infinity; those decode to null.
fn float_value(value: f64) -> Option<Value> {
  Number::from_f64(value).map(Value::Number)
}

/// Aggregates like AVG return NUMERIC; render as a JSON number where the
/// value fits in a double, otherwise as its exact decimal string.
fn numeric_value(value: BigDecimal) -> Value {
  let rendered = value.to_string();
  rendered
    .parse::<f64>()
    .ok()
    .and_then(|f| Number::from_f64(f))
    .map(Value::Number)
    .unwrap_or(Value::String(rendered))
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::str::FromStr;

  #[test]
  fn non_finite_floats_become_null() {
    assert!(float_value(f64::NAN).is_none());
    assert!(float_value(f64::INFINITY).is_none());
    assert_eq!(float_value(4.25), Some(Value::from(4.25)));
  }

  #[test]
  fn numeric_renders_as_number() {
    let value = numeric_value(BigDecimal::from_str("14.5600").unwrap());
    assert_eq!(value, Value::from(14.56));
  }

  #[test]
  fn result_columns_come_from_first_row() {
    let mut row = Map::new();
    row.insert("latitude".to_string(), Value::from(1.0));
    row.insert("longitude".to_string(), Value::from(2.0));

    assert_eq!(
      result_columns(&[row]),
      Some(vec!["latitude".to_string(), "longitude".to_string()])
    );
    // An empty result set defers to the statement description.
    assert_eq!(result_columns(&[]), None);
  }
}
