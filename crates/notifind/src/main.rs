use anyhow::Result;
use clap::{Parser, Subcommand};
use notifind::cli::commands;
use notifind::config::{CorpusSettings, Settings, DEFAULT_MAX_RESULTS};

#[derive(Parser)]
#[command(name = "notifind")]
#[command(about = "Semantic search over managed service notification templates")]
#[command(version)]
struct Cli {
  #[command(flatten)]
  settings: Settings,

  /// Show detailed progress
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Rebuild the vector index from the notification corpus
  Build {
    #[command(flatten)]
    corpus: CorpusSettings,
  },
  /// Find the notifications closest to a problem statement
  Search {
    /// Problem statement (words are joined with spaces)
    #[arg(required = true)]
    terms: Vec<String>,
    /// Maximum number of notifications to return
    #[arg(short = 'n', long, default_value_t = DEFAULT_MAX_RESULTS, allow_negative_numbers = true)]
    max_results: i64,
    /// Print results as JSON
    #[arg(long)]
    json: bool,
  },
  /// Show distinct categories, severities and service names in the index
  Stats {
    /// Print statistics as JSON
    #[arg(long)]
    json: bool,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  bentley::init(cli.verbose);

  match cli.command {
    Command::Build { corpus } => commands::build(&cli.settings, &corpus).await,
    Command::Search { terms, max_results, json } => {
      commands::search(&cli.settings, &terms, max_results, json).await
    }
    Command::Stats { json } => commands::stats(&cli.settings, json).await,
  }
}
