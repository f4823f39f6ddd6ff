//! Table management operations for LanceDB

use anyhow::{anyhow, Result};
use arrow::record_batch::RecordBatchIterator;
use lancedb::{Connection, Table};

use super::records::{notification_schema, rows_to_batch, schema_dimension};
use crate::index::IndexRow;

/// Table manager for LanceDB operations
pub struct TableManager {
  connection: Connection,
  table_name: String,
}

impl TableManager {
  pub fn new(connection: Connection, table_name: &str) -> Self {
    Self { connection, table_name: table_name.to_string() }
  }

  /// Check if the target table exists
  pub async fn table_exists(&self) -> Result<bool> {
    let tables = self
      .connection
      .table_names()
      .execute()
      .await
      .map_err(|e| anyhow!("Failed to list tables: {}", e))?;
    Ok(tables.contains(&self.table_name))
  }

  /// Get the table instance
  pub async fn get_table(&self) -> Result<Table> {
    self
      .connection
      .open_table(&self.table_name)
      .execute()
      .await
      .map_err(|e| anyhow!("Failed to open table '{}': {}", self.table_name, e))
  }

  /// Create an empty table sized for `dimension`-long embeddings
  pub async fn create_empty_table(&self, dimension: usize) -> Result<Table> {
    let table = self
      .connection
      .create_empty_table(&self.table_name, notification_schema(dimension))
      .execute()
      .await
      .map_err(|e| anyhow!("Failed to create table '{}': {}", self.table_name, e))?;

    bentley::verbose!("Created table '{}' with {dimension}-dimension embeddings", self.table_name);
    Ok(table)
  }

  /// Append one batch of rows
  pub async fn add_rows(&self, table: &Table, rows: &[IndexRow], dimension: usize) -> Result<()> {
    let batch = rows_to_batch(rows, dimension)?;
    let schema = batch.schema();
    let batch_iter = RecordBatchIterator::new(vec![Ok(batch)], schema);

    table
      .add(batch_iter)
      .execute()
      .await
      .map_err(|e| anyhow!("Failed to store {} rows: {}", rows.len(), e))?;

    bentley::verbose!("Stored {} rows in '{}'", rows.len(), self.table_name);
    Ok(())
  }

  /// Embedding dimension recorded in the table schema
  pub async fn table_dimension(&self, table: &Table) -> Result<usize> {
    let schema = table.schema().await.map_err(|e| anyhow!("Failed to read table schema: {}", e))?;
    schema_dimension(&schema)
      .ok_or_else(|| anyhow!("Table '{}' has no embedding column", self.table_name))
  }
}
