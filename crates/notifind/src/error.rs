//! Error taxonomy for the build and query phases

use std::path::PathBuf;
use thiserror::Error;

use crate::builder::BuildReport;

/// Errors surfaced by the public build, search and stats operations.
///
/// Malformed documents never appear here: the loader records them in the
/// [`BuildReport`] and the build carries on.
#[derive(Debug, Error)]
pub enum SearchError {
  #[error(
    "notification index not found at {}. Run `notifind build` to create it before serving queries.",
    path.display()
  )]
  IndexMissing { path: PathBuf },

  #[error(
    "index at {} was built with embedding model '{built_with}' but '{configured}' is configured. Rebuild the index or set EMBEDDING_MODEL={built_with}.",
    path.display()
  )]
  ModelMismatch { path: PathBuf, built_with: String, configured: String },

  #[error("max_results must be a positive integer, got {0}")]
  InvalidMaxResults(i64),

  #[error("problem statement must not be empty")]
  EmptyQuery,

  #[error("embedding dimension mismatch: index expects {expected}, model produced {actual}")]
  DimensionMismatch { expected: usize, actual: usize },

  #[error(
    "self-check query '{query}' returned no results after indexing {} documents; the previous index was left in place",
    report.documents_indexed
  )]
  SelfCheckFailed { query: String, report: Box<BuildReport> },

  #[error(transparent)]
  Other(#[from] anyhow::Error),
}

impl SearchError {
  /// Stable machine-readable key, used by the tool server's error envelope
  pub fn key(&self) -> &'static str {
    match self {
      SearchError::IndexMissing { .. } => "index_missing",
      SearchError::ModelMismatch { .. } => "model_mismatch",
      SearchError::InvalidMaxResults(_) => "invalid_max_results",
      SearchError::EmptyQuery => "empty_query",
      SearchError::DimensionMismatch { .. } => "dimension_mismatch",
      SearchError::SelfCheckFailed { .. } => "self_check_failed",
      SearchError::Other(_) => "internal_error",
    }
  }

  /// Whether the caller can fix this by changing the request
  pub fn is_client_error(&self) -> bool {
    matches!(self, SearchError::InvalidMaxResults(_) | SearchError::EmptyQuery)
  }
}

pub type Result<T, E = SearchError> = std::result::Result<T, E>;
