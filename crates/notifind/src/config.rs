//! Runtime settings shared by the CLI and the tool server
//!
//! Every setting can come from a flag or from the environment, so the same
//! binary works from a shell and from a container definition.

use clap::Args;
use std::path::PathBuf;

pub const DEFAULT_CORPUS_DIR: &str = "managed-notifications";
pub const DEFAULT_INDEX_PATH: &str = "notifications_db";
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const DEFAULT_MAX_RESULTS: i64 = 5;
pub const DEFAULT_MAX_RESULTS_CAP: usize = 50;

/// Name of the table holding notification vectors inside the index directory
pub const TABLE_NAME: &str = "managed_notifications";

/// Index and model settings
#[derive(Debug, Clone, Args)]
pub struct Settings {
  /// Directory holding the persisted vector index
  #[arg(long = "db-path", global = true, env = "NOTIFICATIONS_DB_PATH", default_value = DEFAULT_INDEX_PATH)]
  pub index_path: PathBuf,

  /// Embedding model identity (a Hugging Face repo, or `hashing-<dim>` for the offline embedder)
  #[arg(long = "embedding-model", global = true, env = "EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
  pub embedding_model: String,

  /// Upper bound applied to `max_results`
  #[arg(long, global = true, env = "MAX_RESULTS_CAP", default_value_t = DEFAULT_MAX_RESULTS_CAP)]
  pub max_results_cap: usize,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      index_path: PathBuf::from(DEFAULT_INDEX_PATH),
      embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
      max_results_cap: DEFAULT_MAX_RESULTS_CAP,
    }
  }
}

/// Corpus settings, only needed by the build phase
#[derive(Debug, Clone, Args)]
pub struct CorpusSettings {
  /// Root of the notification corpus
  #[arg(long = "corpus", env = "NOTIFICATIONS_DIR", default_value = DEFAULT_CORPUS_DIR)]
  pub corpus_dir: PathBuf,

  /// Corpus-relative paths to leave out of the index (comma-separated)
  #[arg(long, env = "NOTIFICATIONS_EXCLUDE", value_delimiter = ',', default_value = "mcp")]
  pub exclude: Vec<PathBuf>,
}

/// Bind settings for the tool server
#[derive(Debug, Clone, Args)]
pub struct ServerSettings {
  /// Interface to bind
  #[arg(long, env = "HOST", default_value = "127.0.0.1")]
  pub host: String,

  /// Port to bind
  #[arg(long, env = "PORT", default_value_t = 8000)]
  pub port: u16,
}

impl ServerSettings {
  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.host, self.port)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::Parser;
  use serial_test::serial;

  #[derive(Parser)]
  struct TestCli {
    #[command(flatten)]
    settings: Settings,
    #[command(flatten)]
    corpus: CorpusSettings,
    #[command(flatten)]
    server: ServerSettings,
  }

  fn clear_env() {
    for key in [
      "NOTIFICATIONS_DB_PATH",
      "EMBEDDING_MODEL",
      "MAX_RESULTS_CAP",
      "NOTIFICATIONS_DIR",
      "NOTIFICATIONS_EXCLUDE",
      "HOST",
      "PORT",
    ] {
      std::env::remove_var(key);
    }
  }

  #[test]
  #[serial]
  fn test_defaults() {
    clear_env();
    let cli = TestCli::parse_from(["test"]);
    assert_eq!(cli.settings.index_path, PathBuf::from(DEFAULT_INDEX_PATH));
    assert_eq!(cli.settings.embedding_model, DEFAULT_EMBEDDING_MODEL);
    assert_eq!(cli.settings.max_results_cap, DEFAULT_MAX_RESULTS_CAP);
    assert_eq!(cli.corpus.corpus_dir, PathBuf::from(DEFAULT_CORPUS_DIR));
    assert_eq!(cli.corpus.exclude, vec![PathBuf::from("mcp")]);
    assert_eq!(cli.server.bind_address(), "127.0.0.1:8000");
  }

  #[test]
  #[serial]
  fn test_environment_overrides() {
    clear_env();
    std::env::set_var("NOTIFICATIONS_DB_PATH", "/var/lib/notifind");
    std::env::set_var("EMBEDDING_MODEL", "hashing-128");
    std::env::set_var("NOTIFICATIONS_EXCLUDE", "mcp,drafts");
    std::env::set_var("PORT", "9100");

    let cli = TestCli::parse_from(["test"]);
    assert_eq!(cli.settings.index_path, PathBuf::from("/var/lib/notifind"));
    assert_eq!(cli.settings.embedding_model, "hashing-128");
    assert_eq!(cli.corpus.exclude, vec![PathBuf::from("mcp"), PathBuf::from("drafts")]);
    assert_eq!(cli.server.port, 9100);

    clear_env();
  }

  #[test]
  #[serial]
  fn test_flags_beat_environment() {
    clear_env();
    std::env::set_var("EMBEDDING_MODEL", "hashing-128");
    let cli = TestCli::parse_from(["test", "--embedding-model", "hashing-64", "--db-path", "idx"]);
    assert_eq!(cli.settings.embedding_model, "hashing-64");
    assert_eq!(cli.settings.index_path, PathBuf::from("idx"));
    clear_env();
  }
}
