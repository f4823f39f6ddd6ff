//! Display formatting utilities for CLI output

use colored::*;

use crate::builder::BuildReport;
use crate::engine::QueryResult;
use crate::stats::DatabaseStats;

const WRAP_WIDTH: usize = 80;

/// Wrap text to fit within a specified width
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
  let mut lines = Vec::new();

  for paragraph in text.split('\n') {
    if paragraph.trim().is_empty() {
      lines.push(String::new());
      continue;
    }

    let mut current_line = String::new();
    for word in paragraph.split_whitespace() {
      if current_line.is_empty() {
        current_line = word.to_string();
      } else if current_line.len() + 1 + word.len() <= width {
        current_line.push(' ');
        current_line.push_str(word);
      } else {
        lines.push(current_line);
        current_line = word.to_string();
      }
    }

    if !current_line.is_empty() {
      lines.push(current_line);
    }
  }

  lines
}

/// Render `${NAME}` placeholders so they stand out
pub fn format_variables(variables: &[String]) -> String {
  if variables.is_empty() {
    return "none".dimmed().to_string();
  }
  variables.iter().map(|name| format!("${{{name}}}").yellow().to_string()).collect::<Vec<_>>().join(", ")
}

/// Display a single ranked search result
pub fn display_search_result(result: &QueryResult) {
  let header = format!(
    "=== #{} {} ({:.3}) ===",
    result.rank,
    result.file_path.blue().bold(),
    result.similarity_score
  );
  println!("{header}");
  println!(
    "{} {}  {} {}  {} {}",
    "severity:".dimmed(),
    result.metadata.severity,
    "service:".dimmed(),
    result.metadata.service_name,
    "category:".dimmed(),
    result.metadata.category
  );
  println!("{} {}", "variables:".dimmed(), format_variables(&result.metadata.variables));
  if result.metadata.internal_only {
    println!("{}", "internal only".red());
  }

  for line in wrap_text(&result.document_text, WRAP_WIDTH) {
    println!("{line}");
  }
  println!();
}

/// Summarize a build: counts, categories, itemized skips and self-check hits
pub fn display_build_report(report: &BuildReport) {
  println!(
    "{} documents indexed, {} skipped",
    report.documents_indexed.to_string().green().bold(),
    report.documents_skipped.to_string().yellow()
  );

  if !report.categories_seen.is_empty() {
    let categories: Vec<&str> = report.categories_seen.iter().map(String::as_str).collect();
    println!("{} {}", "categories:".dimmed(), categories.join(", "));
  }

  if !report.skipped.is_empty() {
    println!("{}", "Skipped files:".yellow().bold());
    for skipped in &report.skipped {
      println!("  {} ({})", skipped.path, skipped.reason.dimmed());
    }
  }

  if !report.self_check_hits.is_empty() {
    println!("{}", "Self-check results:".bold());
    for (i, hit) in report.self_check_hits.iter().enumerate() {
      println!("  {}. {} ({:.3})", i + 1, hit.id, hit.similarity_score);
    }
  }
}

/// Display index statistics
pub fn display_stats(stats: &DatabaseStats) {
  println!("{} {}", "index:".dimmed(), stats.index_path);
  println!("{} {}", "notifications:".dimmed(), stats.total_documents.to_string().bold());
  print_list("categories", &stats.categories);
  print_list("severities", &stats.severities);
  print_list("service names", &stats.service_names);
}

fn print_list(label: &str, values: &[String]) {
  println!("{} ({})", label.blue().bold(), values.len());
  for value in values {
    println!("  {value}");
  }
}
