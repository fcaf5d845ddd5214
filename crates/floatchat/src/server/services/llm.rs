//! Chat-completion client for the hosted language model
//!
//! Talks to OpenRouter's OpenAI-compatible API. The `ChatModel` trait is
//! the seam the RAG pipeline is written against, so tests can substitute
//! a scripted model.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config;

const API_BASE: &str = "https://openrouter.ai/api/v1";
const MODEL: &str = "openai/gpt-4o-mini";
const REFERER: &str = "argo-react-app-deployment";
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// A model that answers a single prompt with a single completion.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatModel: Send + Sync {
  async fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
  model: &'a str,
  messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
  role: &'a str,
  content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
  message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
  content: String,
}

/// OpenRouter-backed chat model.
pub struct OpenRouterClient {
  client: Client,
  api_key: String,
}

impl OpenRouterClient {
  /// Build a client from the environment; fails if the API key is missing.
  pub fn from_env() -> Result<Self> {
    let api_key = config::openrouter_api_key()?;
    let client = Client::builder()
      .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
      .build()
      .map_err(|e| anyhow!("failed to build HTTP client: {e}"))?;

    Ok(Self { client, api_key })
  }
}

#[async_trait]
impl ChatModel for OpenRouterClient {
  async fn complete(&self, prompt: &str) -> Result<String> {
    let request = ChatCompletionRequest {
      model: MODEL,
      messages: vec![ChatMessage { role: "user", content: prompt }],
    };

    let response = self
      .client
      .post(format!("{API_BASE}/chat/completions"))
      .bearer_auth(&self.api_key)
      .header("HTTP-Referer", REFERER)
      .json(&request)
      .send()
      .await
      .map_err(|e| anyhow!("language model request failed: {e}"))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(anyhow!("language model returned {status}: {body}"));
    }

    let completion: ChatCompletionResponse = response
      .json()
      .await
      .map_err(|e| anyhow!("failed to decode model response: {e}"))?;

    completion
      .choices
      .into_iter()
      .next()
      .map(|choice| choice.message.content)
      .ok_or_else(|| anyhow!("language model returned no choices"))
  }
}
