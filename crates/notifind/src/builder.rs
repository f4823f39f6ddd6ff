//! Build phase: corpus to published vector index
//!
//! A build never touches the live index until it has proven itself. Rows are
//! written into a hidden sibling directory, the self-check query runs against
//! that directory, and only then is it renamed over the live path.

use anyhow::{anyhow, Context};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::TABLE_NAME;
use crate::document::{CorpusLoader, SkippedDocument};
use crate::embedding::{check_dimension, Embedder};
use crate::error::{Result, SearchError};
use crate::extract::SearchableRecord;
use crate::index::{similarity_from_distance, IndexManifest, IndexRow, LanceIndex, VectorIndex};
use crate::metadata;

/// Fixed query run against every freshly built index
pub const SELF_CHECK_QUERY: &str = "missing or insufficient permissions";
pub const SELF_CHECK_RESULTS: usize = 3;
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Outcome of a build
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
  pub documents_indexed: usize,
  pub documents_skipped: usize,
  /// Every file left out of the index, with the reason
  pub skipped: Vec<SkippedDocument>,
  pub categories_seen: BTreeSet<String>,
  pub self_check_hits: Vec<SelfCheckHit>,
}

impl BuildReport {
  fn skip(&mut self, skipped: SkippedDocument) {
    bentley::warn!("Skipping {}: {}", skipped.path, skipped.reason);
    self.documents_skipped += 1;
    self.skipped.push(skipped);
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelfCheckHit {
  pub id: String,
  pub similarity_score: f32,
}

pub struct IndexBuilder {
  embedder: Arc<dyn Embedder>,
  exclusions: Vec<PathBuf>,
  batch_size: usize,
}

impl IndexBuilder {
  pub fn new(embedder: Arc<dyn Embedder>) -> Self {
    Self { embedder, exclusions: Vec::new(), batch_size: DEFAULT_BATCH_SIZE }
  }

  /// Corpus-relative (or absolute) paths the loader should prune
  pub fn with_exclusions<I, P>(mut self, paths: I) -> Self
  where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
  {
    self.exclusions.extend(paths.into_iter().map(Into::into));
    self
  }

  pub fn with_batch_size(mut self, batch_size: usize) -> Self {
    self.batch_size = batch_size.max(1);
    self
  }

  /// Rebuild the index at `index_path` from every document under `corpus_root`.
  ///
  /// On any failure, including a failed self-check, the index previously at
  /// `index_path` is left as it was.
  pub async fn build(&self, corpus_root: &Path, index_path: &Path) -> Result<BuildReport> {
    let corpus_root = absolute(corpus_root)?;
    let index_path = absolute(index_path)?;
    if !corpus_root.is_dir() {
      return Err(anyhow!("Corpus directory {} does not exist", corpus_root.display()).into());
    }

    let staging = StagingDir::beside(&index_path)?;
    bentley::verbose!("Staging index in {}", staging.path().display());

    let loader = CorpusLoader::new(&corpus_root)
      .with_exclusions(self.exclusions.iter().cloned())
      .with_exclusions([index_path.clone()]);

    let index = LanceIndex::create(staging.path(), TABLE_NAME, self.embedder.dimension()).await?;
    let mut report = self.index_documents(&loader, &index).await?;
    report.self_check_hits = self_check(self.embedder.as_ref(), &index).await?;
    drop(index);

    if report.self_check_hits.is_empty() {
      return Err(SearchError::SelfCheckFailed {
        query: SELF_CHECK_QUERY.to_string(),
        report: Box::new(report),
      });
    }

    IndexManifest::new(
      self.embedder.model_id(),
      self.embedder.dimension(),
      TABLE_NAME,
      report.documents_indexed,
    )
    .save(staging.path())?;

    staging.publish(&index_path)?;
    bentley::verbose!("Published index at {}", index_path.display());
    Ok(report)
  }

  /// Load, extract, embed and store every document the loader yields
  pub async fn index_documents(
    &self,
    loader: &CorpusLoader,
    index: &dyn VectorIndex,
  ) -> Result<BuildReport> {
    let mut report = BuildReport::default();
    let mut pending: Vec<SearchableRecord> = Vec::with_capacity(self.batch_size);

    for outcome in loader.documents() {
      let document = match outcome {
        Ok(document) => document,
        Err(skipped) => {
          report.skip(skipped);
          continue;
        }
      };

      let record = SearchableRecord::from_document(document);
      if record.document_text.is_empty() {
        report.skip(SkippedDocument {
          path: record.document.relative_path,
          reason: "no searchable text".to_string(),
        });
        continue;
      }

      pending.push(record);
      if pending.len() >= self.batch_size {
        self.flush(&mut pending, index, &mut report).await?;
      }
    }
    self.flush(&mut pending, index, &mut report).await?;

    bentley::info!(
      "Indexed {} documents across {} categories ({} skipped)",
      report.documents_indexed,
      report.categories_seen.len(),
      report.documents_skipped
    );
    Ok(report)
  }

  async fn flush(
    &self,
    pending: &mut Vec<SearchableRecord>,
    index: &dyn VectorIndex,
    report: &mut BuildReport,
  ) -> Result<()> {
    if pending.is_empty() {
      return Ok(());
    }

    let texts: Vec<String> = pending.iter().map(|record| record.document_text.clone()).collect();
    let embeddings = embed_off_runtime(Arc::clone(&self.embedder), texts).await?;
    if embeddings.len() != pending.len() {
      return Err(
        anyhow!("Embedder returned {} vectors for {} documents", embeddings.len(), pending.len())
          .into(),
      );
    }

    let mut rows = Vec::with_capacity(pending.len());
    for (record, embedding) in pending.drain(..).zip(embeddings) {
      check_dimension(self.embedder.as_ref(), &embedding)?;
      let metadata = metadata::encode(&record)?;
      report.categories_seen.insert(record.document.category.clone());
      rows.push(IndexRow { id: record.id, embedding, document: record.document_text, metadata });
    }

    let added = rows.len();
    index.add(rows).await?;
    report.documents_indexed += added;
    bentley::verbose!("Stored batch of {added} documents");
    Ok(())
  }
}

/// Model inference is CPU-bound, so it runs on the blocking pool
async fn embed_off_runtime(embedder: Arc<dyn Embedder>, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
  let count = texts.len();
  let embeddings = tokio::task::spawn_blocking(move || embedder.embed_batch(&texts))
    .await
    .map_err(|e| anyhow!("Embedding task failed: {}", e))?
    .with_context(|| format!("Failed to embed a batch of {count} documents"))?;
  Ok(embeddings)
}

/// Run the fixed self-check query. An empty result means the index is not fit to serve.
pub async fn self_check(embedder: &dyn Embedder, index: &dyn VectorIndex) -> Result<Vec<SelfCheckHit>> {
  let query = embedder.embed(SELF_CHECK_QUERY)?;
  check_dimension(embedder, &query)?;

  let hits = index.search(&query, SELF_CHECK_RESULTS).await?;
  Ok(
    hits
      .into_iter()
      .map(|hit| SelfCheckHit { id: hit.id, similarity_score: similarity_from_distance(hit.distance) })
      .collect(),
  )
}

fn absolute(path: &Path) -> Result<PathBuf> {
  std::path::absolute(path)
    .with_context(|| format!("Failed to resolve {}", path.display()))
    .map_err(SearchError::from)
}

/// Hidden directory next to the live index; removed on drop unless published
struct StagingDir {
  path: PathBuf,
  published: bool,
}

impl StagingDir {
  fn beside(index_path: &Path) -> Result<Self> {
    let (parent, name) = sibling_parts(index_path)?;
    std::fs::create_dir_all(parent)
      .with_context(|| format!("Failed to create {}", parent.display()))?;
    let path = parent.join(format!(".{name}.staging-{}", Uuid::new_v4()));
    Ok(Self { path, published: false })
  }

  fn path(&self) -> &Path {
    &self.path
  }

  /// Move the staged index to `index_path`, replacing what was there
  fn publish(mut self, index_path: &Path) -> Result<()> {
    let (parent, name) = sibling_parts(index_path)?;
    let retired = parent.join(format!(".{name}.previous-{}", Uuid::new_v4()));
    let had_previous = index_path.exists();

    if had_previous {
      std::fs::rename(index_path, &retired)
        .with_context(|| format!("Failed to move aside {}", index_path.display()))?;
    }

    if let Err(e) = std::fs::rename(&self.path, index_path) {
      if had_previous {
        if let Err(restore) = std::fs::rename(&retired, index_path) {
          bentley::error!(
            "Could not restore previous index from {}: {restore}",
            retired.display()
          );
        }
      }
      return Err(anyhow!("Failed to publish index at {}: {e}", index_path.display()).into());
    }
    self.published = true;

    if had_previous {
      if let Err(e) = std::fs::remove_dir_all(&retired) {
        bentley::warn!("Failed to remove old index {}: {e}", retired.display());
      }
    }
    Ok(())
  }
}

impl Drop for StagingDir {
  fn drop(&mut self) {
    if !self.published && self.path.exists() {
      let _ = std::fs::remove_dir_all(&self.path);
    }
  }
}

fn sibling_parts(index_path: &Path) -> Result<(&Path, String)> {
  match (index_path.parent(), index_path.file_name()) {
    (Some(parent), Some(name)) => Ok((parent, name.to_string_lossy().into_owned())),
    _ => Err(anyhow!("Index path {} has no parent directory", index_path.display()).into()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::embedding::{HashingEmbedder, MockEmbedder};
  use crate::index::MemoryIndex;
  use std::fs;
  use tempfile::TempDir;

  fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
  }

  fn builder(batch_size: usize) -> IndexBuilder {
    IndexBuilder::new(Arc::new(HashingEmbedder::new(64))).with_batch_size(batch_size)
  }

  #[tokio::test]
  async fn test_index_documents_counts_and_skips() {
    let temp = TempDir::new().unwrap();
    write(
      temp.path(),
      "osd/a.json",
      r#"{"severity": "Info", "summary": "Missing permissions", "description": "Grant access."}"#,
    );
    write(temp.path(), "osd/empty.json", r#"{"severity": "Info", "internal_only": true}"#);
    write(temp.path(), "hcp/bad.json", "{");
    write(
      temp.path(),
      "hcp/b.json",
      r#"{"severity": "Major", "summary": "Quota exceeded", "description": "Raise the quota."}"#,
    );

    let index = MemoryIndex::new(64);
    let report = builder(1).index_documents(&CorpusLoader::new(temp.path()), &index).await.unwrap();

    assert_eq!(report.documents_indexed, 2);
    assert_eq!(report.documents_skipped, 2);
    assert_eq!(index.count().await.unwrap(), 2);
    assert_eq!(report.categories_seen, BTreeSet::from(["osd".to_string(), "hcp".to_string()]));

    let reasons: Vec<(&str, &str)> =
      report.skipped.iter().map(|s| (s.path.as_str(), s.reason.as_str())).collect();
    assert!(reasons.contains(&("osd/empty.json", "no searchable text")));
    assert!(reasons.iter().any(|(path, _)| *path == "hcp/bad.json"));
  }

  #[tokio::test]
  async fn test_batches_flush_remainder() {
    let temp = TempDir::new().unwrap();
    for i in 0..5 {
      write(temp.path(), &format!("osd/n{i}.json"), &format!(r#"{{"summary": "notice {i}"}}"#));
    }
    let index = MemoryIndex::new(64);
    let report = builder(2).index_documents(&CorpusLoader::new(temp.path()), &index).await.unwrap();
    assert_eq!(report.documents_indexed, 5);
    assert_eq!(index.count().await.unwrap(), 5);
  }

  #[tokio::test]
  async fn test_batches_are_embedded_off_the_runtime() {
    let temp = TempDir::new().unwrap();
    for i in 0..3 {
      write(temp.path(), &format!("osd/n{i}.json"), &format!(r#"{{"summary": "notice {i}"}}"#));
    }

    let mut mock = MockEmbedder::new();
    mock.expect_dimension().return_const(2usize);
    mock.expect_model_id().return_const("mock-model".to_string());
    mock.expect_embed_batch().times(2).returning(|texts| {
      // Handle::block_on panics when called from an async worker thread
      tokio::runtime::Handle::current().block_on(async {});
      Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
    });

    let index = MemoryIndex::new(2);
    let report = IndexBuilder::new(Arc::new(mock))
      .with_batch_size(2)
      .index_documents(&CorpusLoader::new(temp.path()), &index)
      .await
      .unwrap();
    assert_eq!(report.documents_indexed, 3);
  }

  #[tokio::test]
  async fn test_self_check_on_empty_index_finds_nothing() {
    let embedder = HashingEmbedder::new(64);
    let index = MemoryIndex::new(64);
    assert!(self_check(&embedder, &index).await.unwrap().is_empty());
  }

  #[test]
  fn test_staging_dir_is_hidden_sibling_and_cleaned_up() {
    let temp = TempDir::new().unwrap();
    let index_path = temp.path().join("notifications_db");
    let staging_path = {
      let staging = StagingDir::beside(&index_path).unwrap();
      fs::create_dir_all(staging.path()).unwrap();
      assert_eq!(staging.path().parent(), Some(temp.path()));
      let name = staging.path().file_name().unwrap().to_string_lossy().into_owned();
      assert!(name.starts_with(".notifications_db.staging-"));
      staging.path().to_path_buf()
    };
    assert!(!staging_path.exists());
  }

  #[test]
  fn test_publish_replaces_previous_directory() {
    let temp = TempDir::new().unwrap();
    let index_path = temp.path().join("db");
    fs::create_dir_all(&index_path).unwrap();
    fs::write(index_path.join("old"), "old").unwrap();

    let staging = StagingDir::beside(&index_path).unwrap();
    fs::create_dir_all(staging.path()).unwrap();
    fs::write(staging.path().join("new"), "new").unwrap();
    staging.publish(&index_path).unwrap();

    assert!(index_path.join("new").exists());
    assert!(!index_path.join("old").exists());
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
  }
}
