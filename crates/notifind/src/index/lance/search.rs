//! Vector search and full scans over a LanceDB table

use anyhow::{anyhow, Result};
use arrow::record_batch::RecordBatch;
use futures::stream::{Stream, StreamExt};
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};

use super::records::{BatchColumns, EMBEDDING_COLUMN};
use crate::index::IndexHit;
use crate::metadata::Metadata;

/// Nearest neighbours of `query_embedding` by cosine distance, nearest first
pub async fn search_similar_embeddings(
  table: &Table,
  query_embedding: &[f32],
  limit: usize,
) -> Result<Vec<IndexHit>> {
  let mut results_stream = table
    .vector_search(query_embedding)?
    .column(EMBEDDING_COLUMN)
    .distance_type(DistanceType::Cosine)
    .limit(limit)
    .execute()
    .await
    .map_err(|e| anyhow!("Vector search failed: {}", e))?;

  let mut hits = Vec::new();
  for_each_batch(&mut results_stream, |batch| {
    let columns = BatchColumns::from_batch(batch)?;
    for row in 0..batch.num_rows() {
      hits.push(IndexHit {
        id: columns.id(row),
        document: columns.document(row),
        metadata: columns.metadata(row),
        distance: columns.distance(row),
      });
    }
    Ok(())
  })
  .await?;

  if hits.is_empty() {
    bentley::verbose!("No similar embeddings found");
  }
  Ok(hits)
}

/// Metadata of the first `row_count` rows (the whole table when given its row count)
pub async fn scan_metadata(table: &Table, row_count: usize) -> Result<Vec<Metadata>> {
  if row_count == 0 {
    return Ok(Vec::new());
  }

  let mut results_stream = table
    .query()
    .limit(row_count)
    .execute()
    .await
    .map_err(|e| anyhow!("Table scan failed: {}", e))?;

  let mut metadata = Vec::with_capacity(row_count);
  for_each_batch(&mut results_stream, |batch| {
    let columns = BatchColumns::from_batch(batch)?;
    metadata.extend((0..batch.num_rows()).map(|row| columns.metadata(row)));
    Ok(())
  })
  .await?;

  Ok(metadata)
}

async fn for_each_batch<S, F>(results_stream: &mut S, mut handle: F) -> Result<()>
where
  S: Stream<Item = Result<RecordBatch, lancedb::Error>> + Unpin,
  F: FnMut(&RecordBatch) -> Result<()>,
{
  while let Some(batch_result) = results_stream.next().await {
    let batch = batch_result.map_err(|e| anyhow!("Error reading batch: {}", e))?;
    handle(&batch)?;
  }
  Ok(())
}
