//! Local sentence-embedding model
//!
//! Downloads all-MiniLM-L6-v2 from the Hugging Face hub on first use and
//! runs it through ONNX Runtime: tokenize, encode, mean-pool over the
//! sequence dimension, then normalize to unit length. The loaded model
//! is process-wide and shared by ingestion and every query request.

use anyhow::{anyhow, Result};
use hf_hub::api::tokio::Api;
use ndarray::Array2;
use ort::{session::Session, value::Value};
use std::collections::HashMap;
use std::sync::OnceLock;
use tokenizers::Tokenizer;
use tokio::sync::Mutex;
use tracing::info;

const MODEL_NAME: &str = "sentence-transformers/all-MiniLM-L6-v2";
const TOKENIZER_FILE: &str = "tokenizer.json";
const MODEL_FILE: &str = "onnx/model.onnx";

/// Output dimension of the MiniLM encoder.
pub const EMBEDDING_DIMENSION: usize = 384;

pub struct EmbeddingModel {
  session: Session,
  tokenizer: Tokenizer,
}

impl EmbeddingModel {
  /// Download (if not cached) and load the model.
  pub async fn load() -> Result<Self> {
    let api = Api::new().map_err(|e| anyhow!("hub API initialization failed: {e}"))?;
    let repo = api.model(MODEL_NAME.to_string());

    info!("fetching embedding model files");
    let tokenizer_file = repo
      .get(TOKENIZER_FILE)
      .await
      .map_err(|e| anyhow!("failed to download tokenizer: {e}"))?;
    let model_file = repo
      .get(MODEL_FILE)
      .await
      .map_err(|e| anyhow!("failed to download ONNX model: {e}"))?;

    let tokenizer = Tokenizer::from_file(tokenizer_file)
      .map_err(|e| anyhow!("failed to load tokenizer: {e}"))?;
    let session = Session::builder()?.commit_from_file(model_file)?;

    info!("embedding model loaded");
    Ok(Self { session, tokenizer })
  }

  /// Generate a unit-length embedding for one text.
  pub fn embed(&mut self, text: &str) -> Result<Vec<f32>> {
    let encoding = self
      .tokenizer
      .encode(text, true)
      .map_err(|e| anyhow!("tokenization failed: {e}"))?;

    let inputs = HashMap::from([
      ("input_ids", to_tensor(encoding.get_ids())?),
      ("attention_mask", to_tensor(encoding.get_attention_mask())?),
      ("token_type_ids", to_tensor(encoding.get_type_ids())?),
    ]);

    let outputs = self.session.run(inputs)?;
    let (shape, data) = outputs
      .get("last_hidden_state")
      .or_else(|| outputs.get("0"))
      .ok_or_else(|| anyhow!("no output found from model"))?
      .try_extract_tensor::<f32>()?;

    let seq_length = shape[1] as usize;
    let hidden_size = shape[2] as usize;
    let pooled = mean_pool(seq_length, hidden_size, data)?;
    Ok(normalize(pooled))
  }
}

fn to_tensor(values: &[u32]) -> Result<Value> {
  let as_i64: Vec<i64> = values.iter().map(|&v| v as i64).collect();
  let array: Array2<i64> = Array2::from_shape_vec((1, values.len()), as_i64)?;
  Ok(Value::from_array(array)?.into())
}

/// Mean pooling over the sequence dimension of `[1, seq, hidden]` output.
fn mean_pool(seq_length: usize, hidden_size: usize, data: &[f32]) -> Result<Vec<f32>> {
  if seq_length == 0 || data.len() < seq_length * hidden_size {
    return Err(anyhow!("model output shorter than its declared shape"));
  }

  let mut pooled = vec![0.0f32; hidden_size];
  for token_idx in 0..seq_length {
    let start = token_idx * hidden_size;
    for (i, &value) in data[start..start + hidden_size].iter().enumerate() {
      pooled[i] += value;
    }
  }

  for value in pooled.iter_mut() {
    *value /= seq_length as f32;
  }
  Ok(pooled)
}

/// Scale to unit length so index distances are cosine-comparable. A
/// zero-magnitude vector is returned unchanged.
fn normalize(mut embedding: Vec<f32>) -> Vec<f32> {
  let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
  if magnitude < f32::EPSILON {
    return embedding;
  }

  for value in embedding.iter_mut() {
    *value /= magnitude;
  }
  embedding
}

/// Process-wide model handle, loaded on first use.
static MODEL: OnceLock<Mutex<Option<EmbeddingModel>>> = OnceLock::new();

/// Embed `text`, initializing the shared model on the first call.
pub async fn create_embedding(text: &str) -> Result<Vec<f32>> {
  let mutex = MODEL.get_or_init(|| Mutex::new(None));
  let mut guard = mutex.lock().await;

  if guard.is_none() {
    *guard = Some(EmbeddingModel::load().await?);
  }

  match guard.as_mut() {
    Some(model) => model.embed(text),
    None => Err(anyhow!("embedding model failed to initialize")),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn mean_pool_averages_over_tokens() {
    // Two tokens, hidden size three.
    let data = [1.0, 2.0, 3.0, 3.0, 4.0, 5.0];
    let pooled = mean_pool(2, 3, &data).unwrap();
    assert_eq!(pooled, vec![2.0, 3.0, 4.0]);
  }

  #[test]
  fn mean_pool_rejects_truncated_output() {
    assert!(mean_pool(2, 3, &[1.0, 2.0]).is_err());
    assert!(mean_pool(0, 3, &[]).is_err());
  }

  #[test]
  fn normalize_yields_unit_length() {
    let normalized = normalize(vec![3.0, 4.0]);
    assert_eq!(normalized, vec![0.6, 0.8]);

    let magnitude: f32 = normalized.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((magnitude - 1.0).abs() < 1e-6);
  }

  #[test]
  fn normalize_leaves_zero_vector_unchanged() {
    assert_eq!(normalize(vec![0.0, 0.0, 0.0]), vec![0.0, 0.0, 0.0]);
  }
}
