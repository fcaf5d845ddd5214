//! Chat endpoint: question -> SQL -> rows -> summary + chart type

use axum::{extract::Json, http::StatusCode, response::Json as ResponseJson};
use tracing::{error, info};

use crate::config;
use crate::server::services::index::FloatIndexService;
use crate::server::services::llm::OpenRouterClient;
use crate::server::services::{database, embeddings, rag};
use crate::server::types::{ChatRequest, ChatResponse, ErrorResponse};

/// POST /chat - Answer a natural-language question about float data
pub async fn chat(
  Json(request): Json<ChatRequest>,
) -> Result<ResponseJson<ChatResponse>, (StatusCode, ResponseJson<ErrorResponse>)> {
  match answer(request).await {
    Ok(response) => Ok(ResponseJson(response)),
    Err(e) => {
      error!("chat request failed: {e:#}");
      Err((
        StatusCode::INTERNAL_SERVER_ERROR,
        ResponseJson(ErrorResponse { detail: format!("{e:#}") }),
      ))
    }
  }
}

/// Run the full pipeline for one question. Every failure propagates to
/// the caller; there is no retry or fallback query.
async fn answer(request: ChatRequest) -> anyhow::Result<ChatResponse> {
  let llm = OpenRouterClient::from_env()?;
  let index = FloatIndexService::new(config::index_dir()).await?;

  // Top-1 retrieval from the persistent index, then session context.
  let question_embedding = embeddings::create_embedding(&request.message).await?;
  let retrieved = index.search_similar(&question_embedding, 1).await?;
  let persistent_context =
    retrieved.iter().map(|r| r.document.as_str()).collect::<Vec<_>>().join("\n\n");
  let context = rag::merge_context(&persistent_context, request.session_context.as_deref());

  let sql_query = rag::generate_sql(&llm, &context, &request.message).await?;
  info!("generated SQL: {sql_query}");

  let result = database::run_query(&config::database_url()?, &sql_query).await?;

  let summary = rag::summarize(&llm, &request.message, &result.rows).await?;
  let chart_type = rag::classify_chart(&llm, &request.message, &result.columns).await?;

  Ok(ChatResponse { summary, sql_query, chart_type, data: result.rows })
}
