//! Brute-force in-memory index

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::RwLock;

use super::{IndexHit, IndexRow, VectorIndex};
use crate::metadata::Metadata;

/// Linear-scan index. Ties keep insertion order.
#[derive(Debug)]
pub struct MemoryIndex {
  dimension: usize,
  rows: RwLock<Vec<IndexRow>>,
}

impl MemoryIndex {
  pub fn new(dimension: usize) -> Self {
    Self { dimension, rows: RwLock::new(Vec::new()) }
  }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
  async fn add(&self, rows: Vec<IndexRow>) -> Result<()> {
    if let Some(row) = rows.iter().find(|row| row.embedding.len() != self.dimension) {
      return Err(anyhow!(
        "Row '{}' has {} dimensions, index expects {}",
        row.id,
        row.embedding.len(),
        self.dimension
      ));
    }
    self.rows.write().map_err(|_| anyhow!("Index lock poisoned"))?.extend(rows);
    Ok(())
  }

  async fn search(&self, query: &[f32], limit: usize) -> Result<Vec<IndexHit>> {
    let rows = self.rows.read().map_err(|_| anyhow!("Index lock poisoned"))?;

    let mut scored: Vec<(f32, &IndexRow)> =
      rows.iter().map(|row| (cosine_distance(query, &row.embedding), row)).collect();
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));
    scored.truncate(limit);

    Ok(
      scored
        .into_iter()
        .map(|(distance, row)| IndexHit {
          id: row.id.clone(),
          document: row.document.clone(),
          metadata: row.metadata.clone(),
          distance,
        })
        .collect(),
    )
  }

  async fn count(&self) -> Result<usize> {
    Ok(self.rows.read().map_err(|_| anyhow!("Index lock poisoned"))?.len())
  }

  async fn scan_metadata(&self) -> Result<Vec<Metadata>> {
    let rows = self.rows.read().map_err(|_| anyhow!("Index lock poisoned"))?;
    Ok(rows.iter().map(|row| row.metadata.clone()).collect())
  }
}

/// `1 - cos(a, b)`; zero vectors are treated as orthogonal to everything
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
  let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
  let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
  let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

  if norm_a == 0.0 || norm_b == 0.0 {
    return 1.0;
  }
  1.0 - dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn row(id: &str, embedding: Vec<f32>) -> IndexRow {
    IndexRow { id: id.to_string(), embedding, document: id.to_string(), metadata: Metadata::new() }
  }

  #[tokio::test]
  async fn test_search_orders_nearest_first() -> Result<()> {
    let index = MemoryIndex::new(2);
    index
      .add(vec![row("far", vec![-1.0, 0.0]), row("near", vec![1.0, 0.1]), row("mid", vec![0.0, 1.0])])
      .await?;

    let hits = index.search(&[1.0, 0.0], 3).await?;
    let ids: Vec<&str> = hits.iter().map(|hit| hit.id.as_str()).collect();
    assert_eq!(ids, vec!["near", "mid", "far"]);
    assert!(hits.windows(2).all(|pair| pair[0].distance <= pair[1].distance));
    Ok(())
  }

  #[tokio::test]
  async fn test_limit_and_empty_index() -> Result<()> {
    let index = MemoryIndex::new(2);
    assert!(index.search(&[1.0, 0.0], 5).await?.is_empty());

    index.add(vec![row("a", vec![1.0, 0.0]), row("b", vec![0.0, 1.0])]).await?;
    assert_eq!(index.search(&[1.0, 0.0], 1).await?.len(), 1);
    assert_eq!(index.search(&[1.0, 0.0], 10).await?.len(), 2);
    assert_eq!(index.count().await?, 2);
    Ok(())
  }

  #[tokio::test]
  async fn test_ties_keep_insertion_order() -> Result<()> {
    let index = MemoryIndex::new(2);
    index.add(vec![row("first", vec![0.0, 1.0]), row("second", vec![0.0, 1.0])]).await?;
    let hits = index.search(&[0.0, 1.0], 2).await?;
    assert_eq!(hits[0].id, "first");
    assert_eq!(hits[1].id, "second");
    Ok(())
  }

  #[tokio::test]
  async fn test_rejects_wrong_dimension() {
    let index = MemoryIndex::new(3);
    let err = index.add(vec![row("short", vec![1.0])]).await.unwrap_err();
    assert!(err.to_string().contains("expects 3"));
  }

  #[test]
  fn test_cosine_distance() {
    assert!((cosine_distance(&[1.0, 0.0], &[1.0, 0.0])).abs() < 1e-6);
    assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
    assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
  }
}
