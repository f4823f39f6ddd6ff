//! Index introspection

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::error::Result;
use crate::index::VectorIndex;
use crate::metadata::{self, Metadata};

/// Stand-in for a metadata key a stored row does not carry
pub const MISSING_VALUE: &str = "unknown";

/// Distinct metadata values across every stored notification. Lists are sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseStats {
  pub total_documents: usize,
  pub categories: Vec<String>,
  pub severities: Vec<String>,
  pub service_names: Vec<String>,
  pub index_path: String,
}

/// Scan all stored metadata (not a sample) and collect distinct values
pub async fn collect(index: &dyn VectorIndex, index_path: &Path) -> Result<DatabaseStats> {
  let total_documents = index.count().await?;
  let rows = index.scan_metadata().await?;
  if rows.len() != total_documents {
    bentley::warn!("Index reports {total_documents} rows but {} were scanned", rows.len());
  }

  Ok(DatabaseStats {
    total_documents,
    categories: distinct(&rows, metadata::CATEGORY),
    severities: distinct(&rows, metadata::SEVERITY),
    service_names: distinct(&rows, metadata::SERVICE_NAME),
    index_path: index_path.display().to_string(),
  })
}

fn distinct(rows: &[Metadata], key: &str) -> Vec<String> {
  rows
    .iter()
    .map(|row| metadata::text(row, key).unwrap_or(MISSING_VALUE).to_string())
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::index::{IndexRow, MemoryIndex};
  use crate::metadata::MetadataValue;

  fn row(id: &str, fields: &[(&str, &str)]) -> IndexRow {
    let metadata = fields
      .iter()
      .map(|(k, v)| (k.to_string(), MetadataValue::Text(v.to_string())))
      .collect();
    IndexRow { id: id.to_string(), embedding: vec![1.0, 0.0], document: id.to_string(), metadata }
  }

  #[tokio::test]
  async fn test_distinct_sorted_values() {
    let index = MemoryIndex::new(2);
    index
      .add(vec![
        row("a", &[("category", "osd"), ("severity", "Warning"), ("service_name", "SREManualAction")]),
        row("b", &[("category", "hcp"), ("severity", "Info"), ("service_name", "SREManualAction")]),
        row("c", &[("category", "osd"), ("severity", "Warning")]),
      ])
      .await
      .unwrap();

    let stats = collect(&index, Path::new("/data/db")).await.unwrap();
    assert_eq!(stats.total_documents, 3);
    assert_eq!(stats.categories, vec!["hcp", "osd"]);
    assert_eq!(stats.severities, vec!["Info", "Warning"]);
    assert_eq!(stats.service_names, vec!["SREManualAction", MISSING_VALUE]);
    assert_eq!(stats.index_path, "/data/db");
  }

  #[tokio::test]
  async fn test_empty_index() {
    let stats = collect(&MemoryIndex::new(2), Path::new("db")).await.unwrap();
    assert_eq!(stats.total_documents, 0);
    assert!(stats.categories.is_empty());
  }
}
