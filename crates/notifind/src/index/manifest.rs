//! Index manifest: records which model built the index
//!
//! Written at the end of every build and checked before serving, so vectors
//! from one model are never compared against queries embedded by another.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "index_manifest.json";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
  pub format_version: u32,
  pub model_id: String,
  pub dimension: usize,
  pub table: String,
  pub documents_indexed: usize,
  pub built_at: DateTime<Utc>,
}

impl IndexManifest {
  pub fn new(model_id: &str, dimension: usize, table: &str, documents_indexed: usize) -> Self {
    Self {
      format_version: FORMAT_VERSION,
      model_id: model_id.to_string(),
      dimension,
      table: table.to_string(),
      documents_indexed,
      built_at: Utc::now(),
    }
  }

  pub fn path_in(index_dir: &Path) -> PathBuf {
    index_dir.join(MANIFEST_FILE)
  }

  pub fn save(&self, index_dir: &Path) -> Result<()> {
    let path = Self::path_in(index_dir);
    let contents = serde_json::to_string_pretty(self)?;
    std::fs::write(&path, contents)
      .with_context(|| format!("Failed to write index manifest {}", path.display()))
  }

  pub fn load(index_dir: &Path) -> Result<Self> {
    let path = Self::path_in(index_dir);
    let contents = std::fs::read_to_string(&path)
      .with_context(|| format!("Failed to read index manifest {}", path.display()))?;
    let manifest: Self = serde_json::from_str(&contents)
      .with_context(|| format!("Index manifest {} is corrupt", path.display()))?;

    if manifest.format_version != FORMAT_VERSION {
      return Err(anyhow!(
        "Index manifest {} has format version {}, expected {}; rebuild the index",
        path.display(),
        manifest.format_version,
        FORMAT_VERSION
      ));
    }
    Ok(manifest)
  }
}
