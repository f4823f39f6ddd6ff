//! Embedding providers
//!
//! The same model identity must be used to build and to query an index; the
//! identity reported by [`Embedder::model_id`] is written to the index
//! manifest at build time and checked when the query engine opens.

pub mod hashing;
#[cfg(feature = "ml-features")]
pub mod onnx;

use anyhow::{anyhow, Result};
use std::sync::Arc;

pub use hashing::HashingEmbedder;
#[cfg(feature = "ml-features")]
pub use onnx::OnnxEmbedder;

/// Maps text to a fixed-dimension dense vector. Implementations must be
/// deterministic: the same text always yields the same vector.
#[cfg_attr(test, mockall::automock)]
pub trait Embedder: Send + Sync {
  /// Identity persisted alongside the index
  fn model_id(&self) -> &str;

  /// Length of every vector this embedder returns
  fn dimension(&self) -> usize;

  fn embed(&self, text: &str) -> Result<Vec<f32>>;

  fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    texts.iter().map(|text| self.embed(text)).collect()
  }
}

/// Load the embedder named by `model_id`.
///
/// `hashing-<dim>` selects the built-in hashing embedder; anything else is
/// treated as a Hugging Face repository with an ONNX export.
pub async fn load_embedder(model_id: &str) -> Result<Arc<dyn Embedder>> {
  if let Some(embedder) = HashingEmbedder::from_model_id(model_id)? {
    bentley::verbose!("Using hashing embedder with {} dimensions", embedder.dimension());
    return Ok(Arc::new(embedder));
  }
  load_neural_embedder(model_id).await
}

#[cfg(feature = "ml-features")]
async fn load_neural_embedder(model_id: &str) -> Result<Arc<dyn Embedder>> {
  Ok(Arc::new(OnnxEmbedder::load(model_id).await?))
}

#[cfg(not(feature = "ml-features"))]
async fn load_neural_embedder(model_id: &str) -> Result<Arc<dyn Embedder>> {
  Err(anyhow!(
    "Embedding model '{model_id}' needs the ml-features build; use a hashing-<dim> model instead"
  ))
}

/// Normalize embedding vector to unit length for consistent similarity comparisons
pub fn normalize(mut embedding: Vec<f32>) -> Vec<f32> {
  let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();

  if magnitude < f32::EPSILON {
    return embedding;
  }

  for value in embedding.iter_mut() {
    *value /= magnitude;
  }
  embedding
}

/// Reject vectors whose length disagrees with the embedder's declared dimension
pub fn check_dimension(embedder: &dyn Embedder, embedding: &[f32]) -> Result<()> {
  if embedding.len() != embedder.dimension() {
    return Err(anyhow!(
      "Embedder '{}' returned {} values, expected {}",
      embedder.model_id(),
      embedding.len(),
      embedder.dimension()
    ));
  }
  Ok(())
}
