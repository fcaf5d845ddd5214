//! Prompt templates and model-output shaping for the RAG pipeline
//!
//! Three independent prompts: SQL generation over a fixed two-table
//! schema, conversational summarization, and chart-type classification.
//! Model output is shaped here (fence stripping, trimming) but never
//! validated; invalid SQL surfaces at execution time.

use anyhow::Result;
use serde_json::{Map, Value};

use crate::server::services::llm::ChatModel;

/// Fixed no-data reply; the model is never consulted for empty results.
pub const NO_DATA_SUMMARY: &str = "I couldn't find any data that matched your query.";

/// Rows of data shown to the summarization model.
const SUMMARY_ROW_LIMIT: usize = 5;

const SQL_PROMPT: &str = "\
Your task is to write a single, valid PostgreSQL query. Only output the raw SQL query.
Use the provided context and schema. When joining, MUST use aliases ('p' for profiles, 'm' for measurements).
Context: {context}
Schema with Aliases:
- p.float_wmo_id (INT), p.profile_id (INT), p.latitude (FLOAT), p.longitude (FLOAT), p.date (TIMESTAMP)
- m.float_wmo_id (INT), m.profile_id (INT), m.\"PRES\" (FLOAT), m.\"TEMP\" (FLOAT), m.\"PSAL\" (FLOAT)
Note: \"PRES\", \"TEMP\", \"PSAL\" columns from 'm' must be in double quotes.
User Question: {question}
SQL Query:
";

const SUMMARY_PROMPT: &str = "\
You are a friendly oceanographer's assistant. Provide a short, conversational summary of the retrieved data.
Original Question: \"{question}\"
Retrieved Data: {data}
Summary:
";

const CHART_PROMPT: &str = "\
You are a data visualization expert. What is the single best chart type for the user's question?
User Question: \"{question}\"
Available Columns: {columns}
Your answer MUST be one of: 'depth_time_plot', 'profile_comparison', 'map', 'table'.
Chart Type:
";

/// Join retrieved index text with the client-held session context.
pub fn merge_context(persistent: &str, session: Option<&str>) -> String {
  match session {
    Some(session) if !session.is_empty() => format!("{persistent}\n\n{session}"),
    _ => persistent.to_string(),
  }
}

/// Ask the model for a SQL query and post-process it into executable text.
pub async fn generate_sql(
  llm: &dyn ChatModel,
  context: &str,
  question: &str,
) -> Result<String> {
  let prompt = SQL_PROMPT.replace("{context}", context).replace("{question}", question);
  let raw = llm.complete(&prompt).await?;
  Ok(strip_sql_fences(&raw))
}

/// Remove the markdown code fences the model tends to wrap SQL in.
pub fn strip_sql_fences(raw: &str) -> String {
  raw.replace("```sql", "").replace("```", "").trim().to_string()
}

/// Summarize result rows conversationally. Empty result sets
/// short-circuit to the fixed no-data reply without a model call.
pub async fn summarize(
  llm: &dyn ChatModel,
  question: &str,
  rows: &[Map<String, Value>],
) -> Result<String> {
  if rows.is_empty() {
    return Ok(NO_DATA_SUMMARY.to_string());
  }

  let prompt = SUMMARY_PROMPT
    .replace("{question}", question)
    .replace("{data}", &render_rows(rows, SUMMARY_ROW_LIMIT));
  llm.complete(&prompt).await
}

/// Pick a chart type for the question and result columns. The reply is
/// trimmed and lower-cased but deliberately not checked against the
/// enumeration the prompt names.
pub async fn classify_chart(
  llm: &dyn ChatModel,
  question: &str,
  columns: &[String],
) -> Result<String> {
  let prompt = CHART_PROMPT
    .replace("{question}", question)
    .replace("{columns}", &columns.join(", "));
  let label = llm.complete(&prompt).await?;
  Ok(label.trim().to_lowercase())
}

/// Render up to `limit` rows as readable text for the summary prompt.
fn render_rows(rows: &[Map<String, Value>], limit: usize) -> String {
  rows
    .iter()
    .take(limit)
    .map(|row| {
      row
        .iter()
        .map(|(name, value)| format!("{name}: {}", render_value(value)))
        .collect::<Vec<_>>()
        .join(", ")
    })
    .collect::<Vec<_>>()
    .join("\n")
}

fn render_value(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::server::services::llm::MockChatModel;

  fn row(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
  }

  #[test]
  fn strips_fenced_sql() {
    let raw = "```sql\nSELECT p.latitude FROM profiles p;\n```";
    assert_eq!(strip_sql_fences(raw), "SELECT p.latitude FROM profiles p;");
  }

  #[test]
  fn strips_bare_fences_and_whitespace() {
    assert_eq!(strip_sql_fences("```\nSELECT 1;\n```  \n"), "SELECT 1;");
    assert_eq!(strip_sql_fences("  SELECT 1;  "), "SELECT 1;");
  }

  #[test]
  fn stripped_sql_never_contains_fence_markers() {
    for raw in ["```sql SELECT 1; ```", "``````sql", "SELECT 1;"] {
      let cleaned = strip_sql_fences(raw);
      assert!(!cleaned.contains("```sql"));
      assert!(!cleaned.contains("```"));
    }
  }

  #[test]
  fn merges_session_context_after_retrieved_text() {
    let merged = merge_context("retrieved document", Some("uploaded context"));
    assert_eq!(merged, "retrieved document\n\nuploaded context");
    assert_eq!(merge_context("retrieved document", None), "retrieved document");
    assert_eq!(merge_context("retrieved document", Some("")), "retrieved document");
  }

  #[tokio::test]
  async fn generate_sql_embeds_schema_context_and_question() {
    let mut llm = MockChatModel::new();
    llm
      .expect_complete()
      .withf(|prompt| {
        prompt.contains("Schema with Aliases")
          && prompt.contains("Context: the retrieved document")
          && prompt.contains("User Question: how deep is float 1900121?")
      })
      .returning(|_| Ok("```sql\nSELECT 1;\n```".to_string()));

    let sql = generate_sql(&llm, "the retrieved document", "how deep is float 1900121?")
      .await
      .unwrap();
    assert_eq!(sql, "SELECT 1;");
  }

  #[tokio::test]
  async fn summarize_short_circuits_on_empty_results() {
    let mut llm = MockChatModel::new();
    llm.expect_complete().times(0);

    let summary = summarize(&llm, "any question", &[]).await.unwrap();
    assert_eq!(summary, NO_DATA_SUMMARY);
  }

  #[tokio::test]
  async fn summarize_shows_at_most_five_rows() {
    let rows: Vec<_> = (0..8).map(|i| row(&[("n", Value::from(i))])).collect();

    let mut llm = MockChatModel::new();
    llm
      .expect_complete()
      .withf(|prompt| prompt.contains("n: 4") && !prompt.contains("n: 5"))
      .returning(|_| Ok("A short summary.".to_string()));

    let summary = summarize(&llm, "count things", &rows).await.unwrap();
    assert_eq!(summary, "A short summary.");
  }

  #[tokio::test]
  async fn chart_label_is_trimmed_and_lowercased() {
    let mut llm = MockChatModel::new();
    llm.expect_complete().returning(|_| Ok("  MAP\n".to_string()));

    let label = classify_chart(&llm, "where did it drift?", &["latitude".to_string()])
      .await
      .unwrap();
    assert_eq!(label, "map");
  }

  #[tokio::test]
  async fn chart_prompt_lists_result_columns() {
    let mut llm = MockChatModel::new();
    llm
      .expect_complete()
      .withf(|prompt| prompt.contains("Available Columns: latitude, longitude"))
      .returning(|_| Ok("map".to_string()));

    let columns = vec!["latitude".to_string(), "longitude".to_string()];
    classify_chart(&llm, "where?", &columns).await.unwrap();
  }
}
