//! Tool server startup and configuration

use anyhow::{anyhow, Result};
use axum::serve;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::engine::SearchService;
use crate::server::routing::create_router;

/// Serve the tool endpoints on `bind_address` until Ctrl-C
#[cfg(not(tarpaulin_include))]
pub async fn start_server(bind_address: &str, service: Arc<SearchService>) -> Result<()> {
  let app = create_router(service)
    .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()));

  let listener = TcpListener::bind(bind_address)
    .await
    .map_err(|e| anyhow!("Failed to bind {}: {}", bind_address, e))?;
  bentley::info!("Server listening on {}", listener.local_addr()?);

  serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| anyhow!("Server error: {}", e))?;

  bentley::info!("Server shutdown gracefully");
  Ok(())
}

#[cfg(not(tarpaulin_include))]
async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    bentley::warn!("Failed to listen for shutdown signal: {e}");
  }
}
