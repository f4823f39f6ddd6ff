//! LanceDB-backed vector index
//!
//! The index directory is a LanceDB database holding one table. Tables are
//! never updated in place: a build always writes a fresh directory.

pub mod connection;
pub mod records;
pub mod search;
pub mod table_manager;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use lancedb::Table;
use std::path::{Path, PathBuf};

use super::{IndexHit, IndexRow, VectorIndex};
use crate::metadata::Metadata;
use connection::create_connection;
use table_manager::TableManager;

pub struct LanceIndex {
  path: PathBuf,
  table_manager: TableManager,
  table: Option<Table>,
  dimension: Option<usize>,
}

impl LanceIndex {
  /// Create an empty table in a fresh database at `path`, replacing whatever was there
  pub async fn create(path: &Path, table_name: &str, dimension: usize) -> Result<Self> {
    if path.exists() {
      std::fs::remove_dir_all(path)
        .with_context(|| format!("Failed to clear index directory {}", path.display()))?;
    }

    let connection = create_connection(path, true).await?;
    let table_manager = TableManager::new(connection, table_name);
    let table = table_manager.create_empty_table(dimension).await?;

    Ok(Self {
      path: path.to_path_buf(),
      table_manager,
      table: Some(table),
      dimension: Some(dimension),
    })
  }

  /// Open an existing database. A missing table is an empty index, not an error.
  pub async fn open(path: &Path, table_name: &str) -> Result<Self> {
    let connection = create_connection(path, false).await?;
    let table_manager = TableManager::new(connection, table_name);

    let (table, dimension) = if table_manager.table_exists().await? {
      let table = table_manager.get_table().await?;
      let dimension = table_manager.table_dimension(&table).await?;
      (Some(table), Some(dimension))
    } else {
      bentley::warn!("Index at {} has no '{table_name}' table; treating it as empty", path.display());
      (None, None)
    };

    Ok(Self { path: path.to_path_buf(), table_manager, table, dimension })
  }

  /// Embedding dimension of the table, if one exists
  pub fn dimension(&self) -> Option<usize> {
    self.dimension
  }

  fn writable_table(&self) -> Result<(&Table, usize)> {
    match (&self.table, self.dimension) {
      (Some(table), Some(dimension)) => Ok((table, dimension)),
      _ => Err(anyhow!("Index at {} has no table to write to", self.path.display())),
    }
  }
}

#[async_trait]
impl VectorIndex for LanceIndex {
  async fn add(&self, rows: Vec<IndexRow>) -> Result<()> {
    if rows.is_empty() {
      return Ok(());
    }
    let (table, dimension) = self.writable_table()?;
    self.table_manager.add_rows(table, &rows, dimension).await
  }

  async fn search(&self, query: &[f32], limit: usize) -> Result<Vec<IndexHit>> {
    let Some(table) = &self.table else {
      return Ok(Vec::new());
    };
    if limit == 0 || self.count().await? == 0 {
      return Ok(Vec::new());
    }
    search::search_similar_embeddings(table, query, limit).await
  }

  async fn count(&self) -> Result<usize> {
    match &self.table {
      Some(table) => table.count_rows(None).await.map_err(|e| anyhow!("Failed to count rows: {}", e)),
      None => Ok(0),
    }
  }

  async fn scan_metadata(&self) -> Result<Vec<Metadata>> {
    let Some(table) = &self.table else {
      return Ok(Vec::new());
    };
    let row_count = self.count().await?;
    search::scan_metadata(table, row_count).await
  }
}
