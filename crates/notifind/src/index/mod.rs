//! Vector index abstraction
//!
//! Build and query code talk to [`VectorIndex`]; LanceDB is the persistent
//! implementation. Unit tests use a brute-force in-memory one.

pub mod lance;
pub mod manifest;
#[cfg(test)]
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::metadata::Metadata;

pub use lance::LanceIndex;
pub use manifest::IndexManifest;
#[cfg(test)]
pub use memory::MemoryIndex;

/// One row written to the index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRow {
  pub id: String,
  pub embedding: Vec<f32>,
  /// The text that was embedded
  pub document: String,
  pub metadata: Metadata,
}

/// One nearest-neighbour hit, in the order the index ranked it
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
  pub id: String,
  pub document: String,
  pub metadata: Metadata,
  /// Cosine distance in `[0, 2]`
  pub distance: f32,
}

/// Storage for vectors plus scalar metadata.
///
/// Implementations must allow concurrent readers.
#[async_trait]
pub trait VectorIndex: Send + Sync {
  /// Append rows
  async fn add(&self, rows: Vec<IndexRow>) -> Result<()>;

  /// The `limit` rows closest to `query` by cosine distance, nearest first.
  /// An empty index yields no hits.
  async fn search(&self, query: &[f32], limit: usize) -> Result<Vec<IndexHit>>;

  /// Number of stored rows
  async fn count(&self) -> Result<usize>;

  /// Metadata of every stored row
  async fn scan_metadata(&self) -> Result<Vec<Metadata>>;
}

/// Convert cosine distance to a similarity score in `[0, 1]`, higher is closer
pub fn similarity_from_distance(distance: f32) -> f32 {
  if distance.is_nan() {
    return 0.0;
  }
  (1.0 - distance / 2.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_similarity_bounds() {
    assert_eq!(similarity_from_distance(0.0), 1.0);
    assert_eq!(similarity_from_distance(1.0), 0.5);
    assert_eq!(similarity_from_distance(2.0), 0.0);
    assert_eq!(similarity_from_distance(-0.0001), 1.0);
    assert_eq!(similarity_from_distance(f32::NAN), 0.0);
  }

  #[test]
  fn test_similarity_is_monotonic() {
    let distances = [0.0, 0.1, 0.5, 1.2, 1.9];
    let scores: Vec<f32> = distances.iter().map(|&d| similarity_from_distance(d)).collect();
    assert!(scores.windows(2).all(|pair| pair[0] >= pair[1]));
  }
}
