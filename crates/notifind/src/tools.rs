//! The two operations offered to the hosting transport
//!
//! Both always return structured data. Failures become an `{error, suggestion}`
//! object instead of propagating, so a caller never sees a raw error chain.

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_MAX_RESULTS;
use crate::engine::{QueryResult, SearchService};
use crate::error::SearchError;
use crate::stats::DatabaseStats;

pub const NO_MATCH_MESSAGE: &str = "No matching notifications found";
pub const NO_MATCH_SUGGESTION: &str =
  "Try using different keywords or check if the database contains relevant notifications";
pub const BUILD_SUGGESTION: &str =
  "Ensure the notification index has been built by running `notifind build`";

/// Output of `search_service_logs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchOutput {
  Results(Vec<QueryResult>),
  NoMatch { message: String, suggestion: String },
  Failed { error: String, suggestion: String },
}

/// Output of `get_database_stats`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatsOutput {
  Stats(DatabaseStats),
  Failed { error: String },
}

/// Semantic search over notifications. `max_results` defaults to 5.
pub async fn search_service_logs(
  service: &SearchService,
  problem_statement: &str,
  max_results: Option<i64>,
) -> (SearchOutput, Option<SearchError>) {
  let max_results = max_results.unwrap_or(DEFAULT_MAX_RESULTS);
  match service.search(problem_statement, max_results).await {
    Ok(results) if results.is_empty() => (
      SearchOutput::NoMatch {
        message: NO_MATCH_MESSAGE.to_string(),
        suggestion: NO_MATCH_SUGGESTION.to_string(),
      },
      None,
    ),
    Ok(results) => (SearchOutput::Results(results), None),
    Err(e) => {
      bentley::warn!("search_service_logs failed: {e}");
      let output =
        SearchOutput::Failed { error: format!("Search failed: {e}"), suggestion: suggestion_for(&e) };
      (output, Some(e))
    }
  }
}

/// Distinct categories, severities and service names in the index
pub async fn get_database_stats(service: &SearchService) -> (StatsOutput, Option<SearchError>) {
  match service.stats().await {
    Ok(stats) => (StatsOutput::Stats(stats), None),
    Err(e) => {
      bentley::warn!("get_database_stats failed: {e}");
      (StatsOutput::Failed { error: format!("Failed to get database stats: {e}") }, Some(e))
    }
  }
}

fn suggestion_for(error: &SearchError) -> String {
  match error {
    SearchError::InvalidMaxResults(_) => "Pass a max_results value of 1 or more".to_string(),
    SearchError::EmptyQuery => "Describe the problem you are investigating".to_string(),
    _ => BUILD_SUGGESTION.to_string(),
  }
}
