//! Database connection management for LanceDB

use anyhow::{anyhow, Context, Result};
use lancedb::{connect, Connection};
use std::path::Path;

/// Connect to the database directory, creating it first when `create` is set
pub async fn create_connection(data_dir: &Path, create: bool) -> Result<Connection> {
  if create {
    std::fs::create_dir_all(data_dir)
      .with_context(|| format!("Failed to create index directory {}", data_dir.display()))?;
  }

  connect(&data_dir.to_string_lossy())
    .execute()
    .await
    .map_err(|e| anyhow!("Failed to connect to LanceDB at {}: {}", data_dir.display(), e))
}
