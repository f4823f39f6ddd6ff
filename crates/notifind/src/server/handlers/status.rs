//! Status endpoint handler

use axum::{extract::State, response::Json};
use std::sync::Arc;
use uuid::Uuid;

use crate::engine::SearchService;
use crate::server::types::{BaseResponse, StatusResponse};

/// GET /status - Health check endpoint
pub async fn status(State(service): State<Arc<SearchService>>) -> Json<BaseResponse<StatusResponse>> {
  let transaction_id = Uuid::new_v4();
  let response = StatusResponse {
    status: "healthy".to_string(),
    version: env!("CARGO_PKG_VERSION").to_string(),
    index_path: service.index_path().display().to_string(),
    embedding_model: service.model_id().to_string(),
    max_results_cap: service.max_results_cap(),
  };

  Json(BaseResponse::success(response, transaction_id))
}
