//! Feature-hashing embedder
//!
//! Needs no model download, which makes it the embedder of choice for tests
//! and air-gapped builds. Words and their character trigrams are hashed into
//! a fixed number of signed buckets, so texts sharing vocabulary or word
//! stems ("pod"/"pods", "schedule"/"scheduling") land close together.

use anyhow::{anyhow, Result};

use super::{normalize, Embedder};

const MODEL_PREFIX: &str = "hashing-";
const WORD_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
  model_id: String,
  dimension: usize,
}

impl HashingEmbedder {
  pub fn new(dimension: usize) -> Self {
    Self { model_id: format!("{MODEL_PREFIX}{dimension}"), dimension }
  }

  /// Parse a `hashing-<dim>` model identity. Returns `Ok(None)` for any other model.
  ///
  /// Only the canonical spelling is accepted, so the identity written to the
  /// manifest is exactly the configured string.
  pub fn from_model_id(model_id: &str) -> Result<Option<Self>> {
    let Some(dimension) = model_id.strip_prefix(MODEL_PREFIX) else {
      return Ok(None);
    };
    match dimension.parse::<usize>() {
      Ok(parsed) if parsed > 0 && parsed.to_string() == dimension => Ok(Some(Self::new(parsed))),
      _ => Err(anyhow!("Invalid hashing embedder '{model_id}': expected hashing-<positive size>")),
    }
  }

  fn add_feature(&self, vector: &mut [f32], feature: &str, weight: f32) {
    let hash = fnv1a(feature.as_bytes());
    let bucket = (hash % self.dimension as u64) as usize;
    let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
    vector[bucket] += sign * weight;
  }
}

impl Embedder for HashingEmbedder {
  fn model_id(&self) -> &str {
    &self.model_id
  }

  fn dimension(&self) -> usize {
    self.dimension
  }

  fn embed(&self, text: &str) -> Result<Vec<f32>> {
    let mut vector = vec![0.0f32; self.dimension];

    for word in words(text) {
      self.add_feature(&mut vector, &word, WORD_WEIGHT);
      for trigram in trigrams(&word) {
        self.add_feature(&mut vector, &trigram, TRIGRAM_WEIGHT);
      }
    }

    Ok(normalize(vector))
  }
}

/// Lowercased alphanumeric runs
fn words(text: &str) -> impl Iterator<Item = String> + '_ {
  text
    .split(|c: char| !c.is_alphanumeric())
    .filter(|word| !word.is_empty())
    .map(str::to_lowercase)
}

/// Character trigrams of the word padded with boundary markers
fn trigrams(word: &str) -> Vec<String> {
  let padded: Vec<char> = format!("<{word}>").chars().collect();
  padded.windows(3).map(|window| window.iter().collect()).collect()
}

fn fnv1a(bytes: &[u8]) -> u64 {
  const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
  const PRIME: u64 = 0x0000_0100_0000_01b3;

  bytes.iter().fold(OFFSET_BASIS, |hash, &byte| (hash ^ byte as u64).wrapping_mul(PRIME))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
  }

  #[test]
  fn test_deterministic() {
    let embedder = HashingEmbedder::new(384);
    let first = embedder.embed("Pod failed to schedule").unwrap();
    let second = embedder.embed("Pod failed to schedule").unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 384);
  }

  #[test]
  fn test_unit_length() {
    let embedder = HashingEmbedder::new(128);
    let vector = embedder.embed("missing or insufficient permissions").unwrap();
    let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((magnitude - 1.0).abs() < 1e-5);
  }

  #[test]
  fn test_empty_text_is_zero_vector() {
    let embedder = HashingEmbedder::new(32);
    assert!(embedder.embed("  \n ").unwrap().iter().all(|&x| x == 0.0));
  }

  #[test]
  fn test_related_text_scores_higher() {
    let embedder = HashingEmbedder::new(384);
    let query = embedder.embed("pods stuck pending scheduling").unwrap();
    let related = embedder.embed("Pod ${POD} failed to schedule due to ${REASON}.").unwrap();
    let unrelated = embedder.embed("Cluster billing quota exceeded for subscription").unwrap();
    assert!(cosine(&query, &related) > cosine(&query, &unrelated));
  }

  #[test]
  fn test_case_insensitive() {
    let embedder = HashingEmbedder::new(64);
    assert_eq!(embedder.embed("Node Outage").unwrap(), embedder.embed("node outage").unwrap());
  }

  #[test]
  fn test_model_id_parsing() {
    assert_eq!(HashingEmbedder::from_model_id("hashing-384").unwrap().unwrap().dimension(), 384);
    assert!(HashingEmbedder::from_model_id("sentence-transformers/all-MiniLM-L6-v2")
      .unwrap()
      .is_none());
    assert!(HashingEmbedder::from_model_id("hashing-").is_err());
  }

  #[test]
  fn test_model_id_must_be_canonical() {
    for spelling in ["hashing-064", "hashing-+64", "hashing- 64"] {
      assert!(HashingEmbedder::from_model_id(spelling).is_err(), "{spelling} accepted");
    }
    let embedder = HashingEmbedder::from_model_id("hashing-64").unwrap().unwrap();
    assert_eq!(embedder.model_id(), "hashing-64");
  }

  #[test]
  fn test_trigrams_include_boundaries() {
    assert_eq!(trigrams("pod"), vec!["<po", "pod", "od>"]);
    assert_eq!(trigrams("a"), vec!["<a>"]);
  }
}
