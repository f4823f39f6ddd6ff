//! Tool endpoint handlers

use axum::{
  extract::{rejection::JsonRejection, State},
  http::StatusCode,
  response::Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::engine::SearchService;
use crate::error::SearchError;
use crate::server::types::{
  ApiError, BaseResponse, DatabaseStatsResponse, SearchLogsRequest, SearchLogsResponse,
};
use crate::tools::{self, SearchOutput};

const INVALID_REQUEST_SUGGESTION: &str =
  "Send a JSON object with a string problem_statement and an optional integer max_results";

type ToolReply<T> = (StatusCode, Json<BaseResponse<T>>);

/// POST /tools/search_service_logs
pub async fn search_service_logs(
  State(service): State<Arc<SearchService>>,
  request: Result<Json<SearchLogsRequest>, JsonRejection>,
) -> ToolReply<SearchLogsResponse> {
  let transaction_id = Uuid::new_v4();
  let request = match request {
    Ok(Json(request)) => request,
    Err(rejection) => return invalid_request(rejection, transaction_id),
  };
  tracing::info!(%transaction_id, max_results = ?request.max_results, "search_service_logs");

  let (result, error) =
    tools::search_service_logs(&service, &request.problem_statement, request.max_results).await;
  reply(SearchLogsResponse { result }, error, transaction_id)
}

/// GET /tools/get_database_stats
pub async fn get_database_stats(
  State(service): State<Arc<SearchService>>,
) -> ToolReply<DatabaseStatsResponse> {
  let transaction_id = Uuid::new_v4();
  tracing::info!(%transaction_id, "get_database_stats");

  let (result, error) = tools::get_database_stats(&service).await;
  reply(DatabaseStatsResponse { result }, error, transaction_id)
}

fn reply<T>(data: T, error: Option<SearchError>, transaction_id: Uuid) -> ToolReply<T> {
  match error {
    None => (StatusCode::OK, Json(BaseResponse::success(data, transaction_id))),
    Some(error) => {
      let status = if error.is_client_error() {
        StatusCode::BAD_REQUEST
      } else {
        StatusCode::INTERNAL_SERVER_ERROR
      };
      tracing::warn!(%transaction_id, key = error.key(), "tool call failed: {error}");
      (status, Json(BaseResponse::with_errors(data, vec![ApiError::from(&error)], transaction_id)))
    }
  }
}

fn invalid_request(rejection: JsonRejection, transaction_id: Uuid) -> ToolReply<SearchLogsResponse> {
  let message = rejection.body_text();
  tracing::warn!(%transaction_id, "rejected search_service_logs request: {message}");

  let result = SearchOutput::Failed {
    error: format!("Invalid request: {message}"),
    suggestion: INVALID_REQUEST_SUGGESTION.to_string(),
  };
  let errors = vec![ApiError::new("invalid_request", &message)];
  (
    rejection.status(),
    Json(BaseResponse::with_errors(SearchLogsResponse { result }, errors, transaction_id)),
  )
}
