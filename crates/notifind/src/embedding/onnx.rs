//! Sentence embeddings via ONNX Runtime
//!
//! Tokenizer and model are fetched from the Hugging Face hub (and cached by
//! `hf-hub`), inference runs locally through `ort`. The session is behind one
//! mutex shared by every caller, since `Session::run` needs exclusive access.

use anyhow::{anyhow, Context, Result};
use hf_hub::api::tokio::{Api, ApiRepo};
use ndarray::Array2;
use ort::{session::Session, value::Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use tokenizers::{Tokenizer, TruncationParams};

use super::{normalize, Embedder};

const TOKENIZER_FILE: &str = "tokenizer.json";
const MODEL_FILES: [&str; 2] = ["onnx/model.onnx", "model.onnx"];
const MAX_SEQUENCE_LENGTH: usize = 256;
const DIMENSION_PROBE: &str = "dimension probe";

pub struct OnnxEmbedder {
  model_id: String,
  dimension: usize,
  runtime: Mutex<Runtime>,
}

struct Runtime {
  session: Session,
  tokenizer: Tokenizer,
}

struct ModelFiles {
  tokenizer_file: PathBuf,
  model_path: PathBuf,
}

// Model initialization
#[cfg(not(tarpaulin_include))]
impl OnnxEmbedder {
  /// Download (or reuse the cached copy of) `model_id` and load it
  pub async fn load(model_id: &str) -> Result<Self> {
    bentley::info!("Loading embedding model {model_id}...");

    let files = download_model(model_id).await?;
    let tokenizer = load_tokenizer(files.tokenizer_file)?;
    let session = Session::builder()?
      .commit_from_file(&files.model_path)
      .with_context(|| format!("Failed to load ONNX model {}", files.model_path.display()))?;

    let mut embedder =
      Self { model_id: model_id.to_string(), dimension: 0, runtime: Mutex::new(Runtime { session, tokenizer }) };
    embedder.dimension = embedder.infer(DIMENSION_PROBE)?.len();

    bentley::verbose!("Embedding model {model_id} produces {} dimensions", embedder.dimension);
    Ok(embedder)
  }

  fn infer(&self, text: &str) -> Result<Vec<f32>> {
    self.lock()?.infer(text)
  }

  fn lock(&self) -> Result<MutexGuard<'_, Runtime>> {
    self.runtime.lock().map_err(|_| anyhow!("Embedding model lock poisoned"))
  }
}

#[cfg(not(tarpaulin_include))]
impl Runtime {
  fn infer(&mut self, text: &str) -> Result<Vec<f32>> {
    let Runtime { session, tokenizer } = self;

    let encoding =
      tokenizer.encode(text, true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
    let input_names: Vec<String> =
      session.inputs.iter().map(|input| input.name.to_string()).collect();

    let mut input: HashMap<String, Value> = HashMap::new();
    input.insert("input_ids".to_string(), to_tensor(encoding.get_ids())?);
    input.insert("attention_mask".to_string(), to_tensor(encoding.get_attention_mask())?);
    if input_names.iter().any(|name| name == "token_type_ids") {
      input.insert("token_type_ids".to_string(), to_tensor(encoding.get_type_ids())?);
    }

    let outputs = session.run(input)?;
    let tensor = outputs
      .get("last_hidden_state")
      .or_else(|| outputs.get("token_embeddings"))
      .or_else(|| outputs.get("0"))
      .ok_or_else(|| anyhow!("No output found from model - expected 'last_hidden_state' or '0'"))?;
    let (shape, data) = tensor.try_extract_tensor::<f32>()?;

    let pooled = mean_pool(shape.as_ref(), data, encoding.get_attention_mask())?;
    Ok(normalize(pooled))
  }
}

impl Embedder for OnnxEmbedder {
  fn model_id(&self) -> &str {
    &self.model_id
  }

  fn dimension(&self) -> usize {
    self.dimension
  }

  fn embed(&self, text: &str) -> Result<Vec<f32>> {
    self.infer(text)
  }

  /// One lock acquisition for the whole batch
  fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let mut runtime = self.lock()?;
    texts.iter().map(|text| runtime.infer(text)).collect()
  }
}

#[cfg(not(tarpaulin_include))]
async fn download_model(model_id: &str) -> Result<ModelFiles> {
  let api = Api::new().map_err(|e| anyhow!("HF API initialization failed: {}", e))?;
  let repo = api.model(model_id.to_string());

  let tokenizer_file = repo
    .get(TOKENIZER_FILE)
    .await
    .map_err(|e| anyhow!("Failed to download tokenizer for {model_id}: {}", e))?;
  let model_path = download_first(&repo, &MODEL_FILES)
    .await
    .with_context(|| format!("Failed to download ONNX model for {model_id}"))?;

  Ok(ModelFiles { tokenizer_file, model_path })
}

#[cfg(not(tarpaulin_include))]
async fn download_first(repo: &ApiRepo, candidates: &[&str]) -> Result<PathBuf> {
  let mut last_error = None;
  for candidate in candidates {
    match repo.get(candidate).await {
      Ok(path) => return Ok(path),
      Err(e) => {
        bentley::verbose!("{candidate} not available: {e}");
        last_error = Some(e);
      }
    }
  }
  Err(anyhow!("none of {:?} found: {:?}", candidates, last_error))
}

fn load_tokenizer(path: PathBuf) -> Result<Tokenizer> {
  let mut tokenizer =
    Tokenizer::from_file(path).map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;
  tokenizer
    .with_truncation(Some(TruncationParams {
      max_length: MAX_SEQUENCE_LENGTH,
      ..Default::default()
    }))
    .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;
  tokenizer.with_padding(None);
  Ok(tokenizer)
}

fn to_tensor(values: &[u32]) -> Result<Value> {
  let ids: Vec<i64> = values.iter().map(|&x| x as i64).collect();
  let array: Array2<i64> = Array2::from_shape_vec((1, ids.len()), ids)?;
  Ok(Value::from_array(array)?.into())
}

/// Mean of the token vectors whose attention mask is set.
///
/// `shape` is `[batch, sequence, hidden]`; only the first batch row is used.
pub fn mean_pool(shape: &[i64], data: &[f32], attention_mask: &[u32]) -> Result<Vec<f32>> {
  if shape.len() != 3 {
    return Err(anyhow!("Expected a [batch, sequence, hidden] tensor, got shape {:?}", shape));
  }
  let seq_length = shape[1] as usize;
  let hidden_size = shape[2] as usize;
  if data.len() < seq_length * hidden_size {
    return Err(anyhow!("Tensor data shorter than its shape {:?}", shape));
  }

  let mut embedding = vec![0.0f32; hidden_size];
  let mut counted = 0usize;
  for token_idx in 0..seq_length {
    if attention_mask.get(token_idx).copied().unwrap_or(1) == 0 {
      continue;
    }
    counted += 1;
    let start = token_idx * hidden_size;
    for (i, &value) in data[start..start + hidden_size].iter().enumerate() {
      embedding[i] += value;
    }
  }

  if counted > 0 {
    for value in embedding.iter_mut() {
      *value /= counted as f32;
    }
  }
  Ok(embedding)
}
