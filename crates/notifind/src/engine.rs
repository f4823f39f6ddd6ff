//! Query phase: the long-lived search service
//!
//! [`SearchService`] owns the loaded embedder and the opened index. It is
//! built once at process start and shared (behind an `Arc`) by every request.

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Settings;
use crate::embedding::{check_dimension, load_embedder, Embedder};
use crate::error::{Result, SearchError};
use crate::index::{similarity_from_distance, IndexHit, IndexManifest, LanceIndex, VectorIndex};
use crate::metadata;
use crate::stats::{self, DatabaseStats};

/// Scalar fields of a hit, decoded back into structured values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
  pub category: String,
  pub severity: String,
  pub service_name: String,
  pub log_type: String,
  pub internal_only: bool,
  pub variables: Vec<String>,
}

/// One ranked search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
  /// 1-based position
  pub rank: usize,
  pub id: String,
  pub file_path: String,
  /// In `[0, 1]`, higher is more similar
  pub similarity_score: f32,
  /// Raw cosine distance reported by the index
  pub distance: f32,
  /// The text that was embedded for this notification
  pub document_text: String,
  pub metadata: ResultMetadata,
  /// The original notification JSON
  pub document: Value,
}

impl QueryResult {
  fn from_hit(rank: usize, hit: IndexHit) -> Self {
    let decoded = metadata::decode(&hit.metadata);
    let file_path = if decoded.file_path.is_empty() { hit.id.clone() } else { decoded.file_path };

    Self {
      rank,
      id: hit.id,
      file_path,
      similarity_score: similarity_from_distance(hit.distance),
      distance: hit.distance,
      document_text: hit.document,
      metadata: ResultMetadata {
        category: decoded.category,
        severity: decoded.severity,
        service_name: decoded.service_name,
        log_type: decoded.log_type,
        internal_only: decoded.internal_only,
        variables: decoded.variables,
      },
      document: decoded.document,
    }
  }
}

pub struct SearchService {
  embedder: Arc<dyn Embedder>,
  index: Arc<dyn VectorIndex>,
  index_path: PathBuf,
  max_results_cap: usize,
}

impl SearchService {
  pub fn new(
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    index_path: impl Into<PathBuf>,
    max_results_cap: usize,
  ) -> Self {
    Self { embedder, index, index_path: index_path.into(), max_results_cap: max_results_cap.max(1) }
  }

  /// Open the persisted index and load the configured embedding model.
  ///
  /// Fails with [`SearchError::IndexMissing`] when no built index exists at the
  /// configured path and [`SearchError::ModelMismatch`] when it was built with
  /// a different model.
  pub async fn open(settings: &Settings) -> Result<Self> {
    let manifest = read_manifest(&settings.index_path)?;
    verify_model(&manifest, &settings.index_path, &settings.embedding_model)?;

    let embedder = load_embedder(&settings.embedding_model).await?;
    Self::open_index(settings, manifest, embedder).await
  }

  /// Open with an already loaded embedder
  pub async fn open_with_embedder(settings: &Settings, embedder: Arc<dyn Embedder>) -> Result<Self> {
    let manifest = read_manifest(&settings.index_path)?;
    verify_model(&manifest, &settings.index_path, embedder.model_id())?;
    Self::open_index(settings, manifest, embedder).await
  }

  async fn open_index(
    settings: &Settings,
    manifest: IndexManifest,
    embedder: Arc<dyn Embedder>,
  ) -> Result<Self> {
    if embedder.dimension() != manifest.dimension {
      return Err(SearchError::DimensionMismatch {
        expected: manifest.dimension,
        actual: embedder.dimension(),
      });
    }

    let index = LanceIndex::open(&settings.index_path, &manifest.table).await?;
    if let Some(dimension) = index.dimension() {
      if dimension != manifest.dimension {
        return Err(SearchError::DimensionMismatch { expected: dimension, actual: manifest.dimension });
      }
    }

    bentley::verbose!(
      "Opened index at {} ({} documents, model {})",
      settings.index_path.display(),
      manifest.documents_indexed,
      manifest.model_id
    );
    Ok(Self::new(embedder, Arc::new(index), &settings.index_path, settings.max_results_cap))
  }

  pub fn index_path(&self) -> &Path {
    &self.index_path
  }

  pub fn model_id(&self) -> &str {
    self.embedder.model_id()
  }

  pub fn max_results_cap(&self) -> usize {
    self.max_results_cap
  }

  /// Validate a requested result count: non-positive is rejected, above the cap is clamped
  pub fn resolve_max_results(&self, requested: i64) -> Result<usize> {
    if requested <= 0 {
      return Err(SearchError::InvalidMaxResults(requested));
    }
    let requested = usize::try_from(requested).unwrap_or(usize::MAX);
    if requested > self.max_results_cap {
      bentley::verbose!("Clamping max_results {requested} to {}", self.max_results_cap);
    }
    Ok(requested.min(self.max_results_cap))
  }

  /// The notifications most similar to `problem_statement`, best first
  pub async fn search(&self, problem_statement: &str, max_results: i64) -> Result<Vec<QueryResult>> {
    let limit = self.resolve_max_results(max_results)?;
    let problem_statement = problem_statement.trim();
    if problem_statement.is_empty() {
      return Err(SearchError::EmptyQuery);
    }

    let query = self.embed_query(problem_statement).await?;
    let hits = self.index.search(&query, limit).await?;
    bentley::verbose!("Query matched {} of at most {limit} notifications", hits.len());

    Ok(hits.into_iter().enumerate().map(|(i, hit)| QueryResult::from_hit(i + 1, hit)).collect())
  }

  /// Distinct categories, severities and service names across the whole index
  pub async fn stats(&self) -> Result<DatabaseStats> {
    stats::collect(self.index.as_ref(), &self.index_path).await
  }

  async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
    let embedder = Arc::clone(&self.embedder);
    let text = text.to_string();
    let embedding = tokio::task::spawn_blocking(move || {
      let embedding = embedder.embed(&text)?;
      check_dimension(embedder.as_ref(), &embedding)?;
      Ok::<_, anyhow::Error>(embedding)
    })
    .await
    .map_err(|e| anyhow!("Embedding task failed: {}", e))??;
    Ok(embedding)
  }
}

/// Manifest of the index at `index_path`. Anything short of a built index is `IndexMissing`.
fn read_manifest(index_path: &Path) -> Result<IndexManifest> {
  let populated = std::fs::read_dir(index_path).map(|mut entries| entries.next().is_some());
  if !matches!(populated, Ok(true)) || !IndexManifest::path_in(index_path).is_file() {
    return Err(SearchError::IndexMissing { path: index_path.to_path_buf() });
  }
  Ok(IndexManifest::load(index_path)?)
}

fn verify_model(manifest: &IndexManifest, index_path: &Path, configured: &str) -> Result<()> {
  if manifest.model_id != configured {
    return Err(SearchError::ModelMismatch {
      path: index_path.to_path_buf(),
      built_with: manifest.model_id.clone(),
      configured: configured.to_string(),
    });
  }
  Ok(())
}
