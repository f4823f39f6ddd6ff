//! CLI command implementations

use anyhow::Result;

use crate::builder::IndexBuilder;
use crate::cli::display;
use crate::config::{CorpusSettings, Settings};
use crate::embedding::load_embedder;
use crate::engine::SearchService;
use crate::error::SearchError;

/// Rebuild the index from the corpus
pub async fn build(settings: &Settings, corpus: &CorpusSettings) -> Result<()> {
  bentley::announce!("Building notification index");
  bentley::info!("Corpus: {}", corpus.corpus_dir.display());
  bentley::info!("Index: {}", settings.index_path.display());
  bentley::info!("Embedding model: {}", settings.embedding_model);

  let embedder = load_embedder(&settings.embedding_model).await?;
  let builder = IndexBuilder::new(embedder).with_exclusions(corpus.exclude.iter().cloned());

  match builder.build(&corpus.corpus_dir, &settings.index_path).await {
    Ok(report) => {
      display::display_build_report(&report);
      bentley::success!(
        "Index ready at {} ({} documents)",
        settings.index_path.display(),
        report.documents_indexed
      );
      Ok(())
    }
    Err(SearchError::SelfCheckFailed { query, report }) => {
      display::display_build_report(&report);
      let error = SearchError::SelfCheckFailed { query, report };
      bentley::error!("{error}");
      Err(error.into())
    }
    Err(e) => Err(e.into()),
  }
}

/// Run one query against the published index
pub async fn search(settings: &Settings, terms: &[String], max_results: i64, json: bool) -> Result<()> {
  let service = SearchService::open(settings).await?;
  let results = service.search(&terms.join(" "), max_results).await?;

  if json {
    println!("{}", serde_json::to_string_pretty(&results)?);
    return Ok(());
  }

  if results.is_empty() {
    bentley::info!("No matching notifications found");
    return Ok(());
  }
  for result in &results {
    display::display_search_result(result);
  }
  Ok(())
}

/// Print distinct metadata values held by the index
pub async fn stats(settings: &Settings, json: bool) -> Result<()> {
  let service = SearchService::open(settings).await?;
  let stats = service.stats().await?;

  if json {
    println!("{}", serde_json::to_string_pretty(&stats)?);
  } else {
    display::display_stats(&stats);
  }
  Ok(())
}
