//! Scalar metadata encoding
//!
//! The vector index stores only flat scalar columns. This module is the single
//! place where records are flattened into scalars (lists and the full document
//! become JSON strings) and where stored scalars are turned back into
//! structured values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::extract::SearchableRecord;

pub const FILE_PATH: &str = "file_path";
pub const CATEGORY: &str = "category";
pub const SEVERITY: &str = "severity";
pub const SERVICE_NAME: &str = "service_name";
pub const LOG_TYPE: &str = "log_type";
pub const INTERNAL_ONLY: &str = "internal_only";
pub const VARIABLES: &str = "variables";
pub const FULL_JSON: &str = "full_json";

/// Placeholder reported for a missing field in query results
pub const UNKNOWN: &str = "Unknown";

/// Scalar types the index can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
  Text,
  Flag,
}

/// Every stored metadata field with its scalar type, in column order
pub const FIELDS: &[(&str, ScalarKind)] = &[
  (FILE_PATH, ScalarKind::Text),
  (CATEGORY, ScalarKind::Text),
  (SEVERITY, ScalarKind::Text),
  (SERVICE_NAME, ScalarKind::Text),
  (LOG_TYPE, ScalarKind::Text),
  (INTERNAL_ONLY, ScalarKind::Flag),
  (VARIABLES, ScalarKind::Text),
  (FULL_JSON, ScalarKind::Text),
];

/// A single stored scalar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
  Flag(bool),
  Text(String),
}

impl MetadataValue {
  pub fn as_text(&self) -> Option<&str> {
    match self {
      MetadataValue::Text(text) => Some(text),
      MetadataValue::Flag(_) => None,
    }
  }

  pub fn as_flag(&self) -> Option<bool> {
    match self {
      MetadataValue::Flag(flag) => Some(*flag),
      MetadataValue::Text(_) => None,
    }
  }
}

/// Flat scalar metadata as stored next to a vector. Absent fields are simply missing keys.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Flatten a record into scalar metadata
pub fn encode(record: &SearchableRecord) -> Result<Metadata> {
  let document = &record.document;
  let mut metadata = Metadata::new();

  put_text(&mut metadata, FILE_PATH, Some(&document.relative_path));
  put_text(&mut metadata, CATEGORY, Some(&document.category));
  put_text(&mut metadata, SEVERITY, document.severity.as_ref().map(|s| s.as_str()));
  put_text(&mut metadata, SERVICE_NAME, document.service_name.as_deref());
  put_text(&mut metadata, LOG_TYPE, document.log_type.as_deref());
  metadata.insert(INTERNAL_ONLY.to_string(), MetadataValue::Flag(document.internal_only));

  let variables =
    serde_json::to_string(&record.variables).context("Failed to serialize variables")?;
  metadata.insert(VARIABLES.to_string(), MetadataValue::Text(variables));

  let full_json = serde_json::to_string(&document.raw).context("Failed to serialize document")?;
  metadata.insert(FULL_JSON.to_string(), MetadataValue::Text(full_json));

  Ok(metadata)
}

fn put_text(metadata: &mut Metadata, key: &str, value: Option<&str>) {
  if let Some(value) = value {
    metadata.insert(key.to_string(), MetadataValue::Text(value.to_string()));
  }
}

/// Structured view of stored metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedMetadata {
  pub file_path: String,
  pub category: String,
  pub severity: String,
  pub service_name: String,
  pub log_type: String,
  pub internal_only: bool,
  pub variables: Vec<String>,
  /// The original notification; an empty object if the stored copy is unreadable
  pub document: Value,
}

/// Rebuild structured values from stored scalars. Missing or corrupt fields fall
/// back to [`UNKNOWN`], `false`, an empty list or an empty object.
pub fn decode(metadata: &Metadata) -> DecodedMetadata {
  DecodedMetadata {
    file_path: text_or(metadata, FILE_PATH, ""),
    category: text_or(metadata, CATEGORY, UNKNOWN),
    severity: text_or(metadata, SEVERITY, UNKNOWN),
    service_name: text_or(metadata, SERVICE_NAME, UNKNOWN),
    log_type: text_or(metadata, LOG_TYPE, UNKNOWN),
    internal_only: metadata.get(INTERNAL_ONLY).and_then(MetadataValue::as_flag).unwrap_or(false),
    variables: parse_json_field(metadata, VARIABLES).unwrap_or_default(),
    document: parse_json_field(metadata, FULL_JSON)
      .unwrap_or_else(|| Value::Object(Default::default())),
  }
}

/// Text value for `key`, if present
pub fn text<'a>(metadata: &'a Metadata, key: &str) -> Option<&'a str> {
  metadata.get(key).and_then(MetadataValue::as_text)
}

fn text_or(metadata: &Metadata, key: &str, fallback: &str) -> String {
  text(metadata, key).unwrap_or(fallback).to_string()
}

fn parse_json_field<T: serde::de::DeserializeOwned>(metadata: &Metadata, key: &str) -> Option<T> {
  let raw = text(metadata, key)?;
  match serde_json::from_str(raw) {
    Ok(value) => Some(value),
    Err(e) => {
      tracing::warn!(field = key, error = %e, "stored metadata is not valid JSON");
      None
    }
  }
}
