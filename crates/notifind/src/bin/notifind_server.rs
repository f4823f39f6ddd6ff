//! notifind tool server
//!
//! Opens the published index once and serves `search_service_logs` and
//! `get_database_stats` over HTTP until interrupted.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;

use notifind::config::{ServerSettings, Settings};
use notifind::engine::SearchService;
use notifind::server::startup::start_server;

#[derive(Parser)]
#[command(name = "notifind_server")]
#[command(about = "notifind tool server")]
#[command(version)]
struct Args {
  #[command(flatten)]
  settings: Settings,

  #[command(flatten)]
  server: ServerSettings,

  /// Enable verbose logging
  #[arg(short, long)]
  verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  bentley::init(args.verbose);

  bentley::info!("Starting notifind tool server v{}", env!("CARGO_PKG_VERSION"));
  let service = match SearchService::open(&args.settings).await {
    Ok(service) => Arc::new(service),
    Err(e) => {
      bentley::error!("{e}");
      return Err(e.into());
    }
  };
  bentley::info!("Serving index {} with model {}", service.index_path().display(), service.model_id());

  start_server(&args.server.bind_address(), service).await
}
