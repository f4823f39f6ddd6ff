//! Axum router configuration for all endpoints

use axum::{
  routing::{get, post},
  Router,
};
use std::sync::Arc;

use crate::engine::SearchService;
use crate::server::handlers::{status, tools};

/// Create the main application router
pub fn create_router(service: Arc<SearchService>) -> Router {
  Router::new()
    .route("/status", get(status::status))
    .route("/tools/search_service_logs", post(tools::search_service_logs))
    .route("/tools/get_database_stats", get(tools::get_database_stats))
    .with_state(service)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::embedding::{Embedder, HashingEmbedder};
  use crate::index::{IndexRow, MemoryIndex, VectorIndex};
  use crate::metadata::{self, Metadata, MetadataValue};
  use axum::body::{to_bytes, Body};
  use axum::http::{Request, StatusCode};
  use serde_json::Value;
  use tower::ServiceExt;

  async fn router() -> Router {
    let embedder = HashingEmbedder::new(32);
    let index = MemoryIndex::new(32);
    let mut metadata = Metadata::new();
    metadata.insert(metadata::CATEGORY.to_string(), MetadataValue::Text("osd".to_string()));
    metadata.insert(metadata::VARIABLES.to_string(), MetadataValue::Text(r#"["NODE"]"#.to_string()));
    index
      .add(vec![IndexRow {
        id: "osd/node.json".to_string(),
        embedding: embedder.embed("Node ${NODE} is not ready").unwrap(),
        document: "Node ${NODE} is not ready".to_string(),
        metadata,
      }])
      .await
      .unwrap();
    create_router(Arc::new(SearchService::new(Arc::new(embedder), Arc::new(index), "db", 10)))
  }

  async fn call(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
  }

  fn search_request(body: &str) -> Request<Body> {
    Request::post("/tools/search_service_logs")
      .header("content-type", "application/json")
      .body(Body::from(body.to_string()))
      .unwrap()
  }

  #[tokio::test]
  async fn test_status() {
    let (status, body) = call(router().await, Request::get("/status").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["embedding_model"], "hashing-32");
    assert!(body["transaction_id"].is_string());
  }

  #[tokio::test]
  async fn test_search_returns_ranked_results() {
    let (status, body) =
      call(router().await, search_request(r#"{"problem_statement": "node not ready"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"][0]["id"], "osd/node.json");
    assert_eq!(body["result"][0]["rank"], 1);
    assert_eq!(body["result"][0]["metadata"]["variables"], serde_json::json!(["NODE"]));
    assert!(body.get("errors").is_none());
  }

  #[tokio::test]
  async fn test_search_rejects_bad_max_results() {
    let (status, body) = call(
      router().await,
      search_request(r#"{"problem_statement": "node", "max_results": -2}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["key"], "invalid_max_results");
    assert!(body["result"]["error"].is_string());
    assert!(body["result"]["suggestion"].is_string());
  }

  #[tokio::test]
  async fn test_malformed_body_keeps_envelope() {
    for body in [r#"{"max_results": 3}"#, r#"{"problem_statement": "node", "max_results": "3"}"#, "{"] {
      let (status, response) = call(router().await, search_request(body)).await;
      assert!(status.is_client_error(), "{body} gave {status}");
      assert_eq!(response["errors"][0]["key"], "invalid_request");
      assert!(response["result"]["error"].as_str().unwrap().starts_with("Invalid request:"));
      assert!(response["transaction_id"].is_string());
    }
  }

  #[tokio::test]
  async fn test_database_stats() {
    let request = Request::get("/tools/get_database_stats").body(Body::empty()).unwrap();
    let (status, body) = call(router().await, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["total_documents"], 1);
    assert_eq!(body["result"]["categories"], serde_json::json!(["osd"]));
  }
}
