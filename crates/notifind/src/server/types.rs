//! Request and response envelopes

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SearchError;
use crate::tools::{SearchOutput, StatsOutput};

// Base Response Structure
// ======================

/// Base response object for all API endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct BaseResponse<T> {
  /// API versioning information
  pub versioning: VersionInfo,

  /// Transaction ID for logging correlation
  pub transaction_id: Uuid,

  /// Optional error information
  #[serde(skip_serializing_if = "Vec::is_empty", default)]
  pub errors: Vec<ApiError>,

  /// Response data (generic for different endpoint types)
  #[serde(flatten)]
  pub data: T,
}

/// API versioning information
#[derive(Debug, Serialize, Deserialize)]
pub struct VersionInfo {
  pub latest: String,
  pub resolved: String,
}

/// API error information
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
  /// Error key, unique to the error source
  pub key: String,

  /// Human readable error message
  pub message: String,
}

// Status Endpoint
// ===============

/// Response for /status
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
  pub status: String,
  pub version: String,
  pub index_path: String,
  pub embedding_model: String,
  pub max_results_cap: usize,
}

// Tool Endpoints
// ==============

/// Request for /tools/search_service_logs
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchLogsRequest {
  /// Description of the issue being investigated
  pub problem_statement: String,

  /// Maximum number of notifications to return (default 5)
  #[serde(default)]
  pub max_results: Option<i64>,
}

/// Response for /tools/search_service_logs
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchLogsResponse {
  pub result: SearchOutput,
}

/// Response for /tools/get_database_stats
#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseStatsResponse {
  pub result: StatsOutput,
}

// Helper Functions
// ================

impl<T> BaseResponse<T> {
  /// Create a successful response
  pub fn success(data: T, transaction_id: Uuid) -> Self {
    Self::with_errors(data, Vec::new(), transaction_id)
  }

  /// Create a response carrying both data and errors
  pub fn with_errors(data: T, errors: Vec<ApiError>, transaction_id: Uuid) -> Self {
    let version = env!("CARGO_PKG_VERSION");
    Self {
      versioning: VersionInfo { latest: version.to_string(), resolved: version.to_string() },
      transaction_id,
      errors,
      data,
    }
  }
}

impl ApiError {
  pub fn new(key: &str, message: &str) -> Self {
    Self { key: key.to_string(), message: message.to_string() }
  }
}

impl From<&SearchError> for ApiError {
  fn from(error: &SearchError) -> Self {
    Self::new(error.key(), &error.to_string())
  }
}
