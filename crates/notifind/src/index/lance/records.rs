//! Arrow RecordBatch conversion for notification rows

use anyhow::{anyhow, Result};
use arrow::array::{
  Array, ArrayRef, BooleanArray, FixedSizeListBuilder, Float32Array, Float32Builder, StringArray,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

use crate::index::IndexRow;
use crate::metadata::{self, Metadata, MetadataValue, ScalarKind};

pub const ID_COLUMN: &str = "id";
pub const DOCUMENT_COLUMN: &str = "document";
pub const EMBEDDING_COLUMN: &str = "embedding";
pub const DISTANCE_COLUMN: &str = "_distance";

/// Table schema: id, document text, one nullable column per metadata field, embedding
pub fn notification_schema(dimension: usize) -> SchemaRef {
  let mut fields = vec![
    Field::new(ID_COLUMN, DataType::Utf8, false),
    Field::new(DOCUMENT_COLUMN, DataType::Utf8, false),
  ];
  fields.extend(metadata::FIELDS.iter().map(|(name, kind)| Field::new(*name, arrow_type(*kind), true)));
  fields.push(Field::new(
    EMBEDDING_COLUMN,
    DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dimension as i32),
    false,
  ));
  Arc::new(Schema::new(fields))
}

fn arrow_type(kind: ScalarKind) -> DataType {
  match kind {
    ScalarKind::Text => DataType::Utf8,
    ScalarKind::Flag => DataType::Boolean,
  }
}

/// Embedding dimension declared by a schema, if it has an embedding column
pub fn schema_dimension(schema: &Schema) -> Option<usize> {
  match schema.field_with_name(EMBEDDING_COLUMN).ok()?.data_type() {
    DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
    _ => None,
  }
}

/// Convert rows to a RecordBatch matching [`notification_schema`]
pub fn rows_to_batch(rows: &[IndexRow], dimension: usize) -> Result<RecordBatch> {
  if rows.is_empty() {
    return Err(anyhow!("Cannot create RecordBatch from empty rows"));
  }

  let schema = notification_schema(dimension);
  let mut columns: Vec<ArrayRef> = vec![
    Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.id.as_str()))),
    Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.document.as_str()))),
  ];
  columns.extend(metadata::FIELDS.iter().map(|(name, kind)| metadata_column(rows, name, *kind)));
  columns.push(Arc::new(embedding_column(rows, dimension)?));

  RecordBatch::try_new(schema, columns).map_err(|e| anyhow!("Failed to create RecordBatch: {}", e))
}

fn metadata_column(rows: &[IndexRow], name: &str, kind: ScalarKind) -> ArrayRef {
  let values = rows.iter().map(|row| row.metadata.get(name));
  match kind {
    ScalarKind::Text => {
      Arc::new(values.map(|v| v.and_then(MetadataValue::as_text)).collect::<StringArray>())
    }
    ScalarKind::Flag => {
      Arc::new(values.map(|v| v.and_then(MetadataValue::as_flag)).collect::<BooleanArray>())
    }
  }
}

fn embedding_column(
  rows: &[IndexRow],
  dimension: usize,
) -> Result<arrow::array::FixedSizeListArray> {
  let mut builder =
    FixedSizeListBuilder::new(Float32Builder::with_capacity(dimension * rows.len()), dimension as i32);

  for row in rows {
    if row.embedding.len() != dimension {
      return Err(anyhow!(
        "Row '{}' has {} dimensions, table expects {}",
        row.id,
        row.embedding.len(),
        dimension
      ));
    }
    builder.values().append_slice(&row.embedding);
    builder.append(true);
  }

  Ok(builder.finish())
}

/// Columns of a result batch, borrowed for row-wise reading
pub struct BatchColumns<'a> {
  ids: &'a StringArray,
  documents: Option<&'a StringArray>,
  metadata: Vec<(&'static str, &'a dyn Array)>,
  distances: Option<&'a Float32Array>,
}

impl<'a> BatchColumns<'a> {
  pub fn from_batch(batch: &'a RecordBatch) -> Result<Self> {
    let ids = string_column(batch, ID_COLUMN)?
      .ok_or_else(|| anyhow!("Missing '{}' column", ID_COLUMN))?;
    let documents = string_column(batch, DOCUMENT_COLUMN)?;
    let metadata = metadata::FIELDS
      .iter()
      .filter_map(|(name, _)| batch.column_by_name(name).map(|column| (*name, column.as_ref())))
      .collect();
    let distances =
      batch.column_by_name(DISTANCE_COLUMN).and_then(|c| c.as_any().downcast_ref::<Float32Array>());

    Ok(Self { ids, documents, metadata, distances })
  }

  pub fn id(&self, row: usize) -> String {
    self.ids.value(row).to_string()
  }

  pub fn document(&self, row: usize) -> String {
    match self.documents {
      Some(documents) if !documents.is_null(row) => documents.value(row).to_string(),
      _ => String::new(),
    }
  }

  /// Distance reported by a vector search; rows without one sort last
  pub fn distance(&self, row: usize) -> f32 {
    match self.distances {
      Some(distances) if !distances.is_null(row) => distances.value(row),
      _ => f32::MAX,
    }
  }

  /// Scalar metadata for `row`; null cells become missing keys
  pub fn metadata(&self, row: usize) -> Metadata {
    let mut metadata = Metadata::new();
    for (name, column) in &self.metadata {
      if column.is_null(row) {
        continue;
      }
      if let Some(text) = column.as_any().downcast_ref::<StringArray>() {
        metadata.insert(name.to_string(), MetadataValue::Text(text.value(row).to_string()));
      } else if let Some(flag) = column.as_any().downcast_ref::<BooleanArray>() {
        metadata.insert(name.to_string(), MetadataValue::Flag(flag.value(row)));
      }
    }
    metadata
  }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<Option<&'a StringArray>> {
  match batch.column_by_name(name) {
    None => Ok(None),
    Some(column) => column
      .as_any()
      .downcast_ref::<StringArray>()
      .map(Some)
      .ok_or_else(|| anyhow!("Failed to cast '{}' column to StringArray", name)),
  }
}
