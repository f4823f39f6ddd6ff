//! Searchable text and template-variable extraction
//!
//! Placeholder grammar: `$`, `{`, one or more identifier characters
//! (`A-Z`, `a-z`, `0-9`, `_`), `}`. Anything else is ordinary text:
//! an unterminated `${`, empty braces `${}`, or a `$` inside the braces
//! all fail to match and scanning resumes right after the `${`.

use serde_json::Value;
use std::collections::BTreeSet;

use crate::document::NotificationDocument;

/// A document prepared for embedding and storage
#[derive(Debug, Clone, PartialEq)]
pub struct SearchableRecord {
  /// Stable identifier: the corpus-relative path
  pub id: String,
  /// Text handed to the embedding model
  pub document_text: String,
  /// Sorted, deduplicated placeholder names
  pub variables: Vec<String>,
  pub document: NotificationDocument,
}

impl SearchableRecord {
  pub fn from_document(document: NotificationDocument) -> Self {
    let (document_text, variables) = extract(&document);
    Self { id: record_id(&document.relative_path), document_text, variables, document }
  }
}

/// Record id for a corpus-relative path. Rebuilds of an unchanged corpus reuse the same ids.
pub fn record_id(relative_path: &str) -> String {
  relative_path.to_string()
}

/// Derive `(document_text, variables)` from a document
pub fn extract(document: &NotificationDocument) -> (String, Vec<String>) {
  (searchable_text(document), document_variables(document))
}

/// Concatenate summary, description, tags, service name and log type, whitespace-normalized
pub fn searchable_text(document: &NotificationDocument) -> String {
  let parts = document
    .summary
    .iter()
    .chain(document.description.iter())
    .chain(document.tags.iter())
    .chain(document.service_name.iter())
    .chain(document.log_type.iter());

  parts.flat_map(|part| part.split_whitespace()).collect::<Vec<_>>().join(" ")
}

/// Placeholders found in any string value of the document, nested values included
pub fn document_variables(document: &NotificationDocument) -> Vec<String> {
  let mut names = BTreeSet::new();
  for value in document.raw.values() {
    collect_from_value(value, &mut names);
  }
  names.into_iter().collect()
}

fn collect_from_value(value: &Value, names: &mut BTreeSet<String>) {
  match value {
    Value::String(text) => {
      names.extend(placeholders(text).into_iter().map(str::to_string));
    }
    Value::Array(items) => items.iter().for_each(|item| collect_from_value(item, names)),
    Value::Object(fields) => fields.values().for_each(|item| collect_from_value(item, names)),
    _ => {}
  }
}

/// Every placeholder name in `text`, in order of appearance (duplicates kept)
pub fn placeholders(text: &str) -> Vec<&str> {
  let bytes = text.as_bytes();
  let mut found = Vec::new();
  let mut i = 0;

  while i + 1 < bytes.len() {
    if bytes[i] != b'$' || bytes[i + 1] != b'{' {
      i += 1;
      continue;
    }

    let start = i + 2;
    let end = start + bytes[start..].iter().take_while(|&&b| is_identifier_byte(b)).count();

    if end > start && bytes.get(end) == Some(&b'}') {
      found.push(&text[start..end]);
      i = end + 1;
    } else {
      i = start;
    }
  }

  found
}

fn is_identifier_byte(byte: u8) -> bool {
  byte.is_ascii_alphanumeric() || byte == b'_'
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn document(value: Value) -> NotificationDocument {
    NotificationDocument::from_json("osd/sample.json", value).unwrap()
  }

  #[test]
  fn test_placeholders_basic() {
    assert_eq!(placeholders("Pod ${POD} failed due to ${REASON}."), vec!["POD", "REASON"]);
    assert_eq!(placeholders("at ${TIME} and again at ${TIME}"), vec!["TIME", "TIME"]);
    assert_eq!(placeholders("${lower_case_9}"), vec!["lower_case_9"]);
  }

  #[test]
  fn test_placeholders_ignore_malformed() {
    assert!(placeholders("unterminated ${TIME").is_empty());
    assert!(placeholders("empty ${} braces").is_empty());
    assert!(placeholders("spaced ${ TIME }").is_empty());
    assert!(placeholders("dashed ${CLUSTER-ID}").is_empty());
    assert!(placeholders("$TIME {TIME} $").is_empty());
    assert!(placeholders("").is_empty());
    assert!(placeholders("$").is_empty());
  }

  #[test]
  fn test_placeholders_nested_dollar_sequences() {
    // The outer `${A` is abandoned at the inner `$`, the inner one is complete.
    assert_eq!(placeholders("${A${B}}"), vec!["B"]);
    assert_eq!(placeholders("$${X}"), vec!["X"]);
    assert_eq!(placeholders("${${Y}"), vec!["Y"]);
  }

  #[test]
  fn test_placeholders_are_case_sensitive() {
    assert_eq!(placeholders("${Time} ${TIME}"), vec!["Time", "TIME"]);
  }

  #[test]
  fn test_placeholders_with_multibyte_text() {
    assert_eq!(placeholders("Nœud ${NODE} : échec ${RAISON}"), vec!["NODE", "RAISON"]);
  }

  #[test]
  fn test_variables_deduplicated_and_sorted() {
    let doc = document(json!({
      "summary": "Action required at ${TIME}",
      "description": "Worker ${TIME} count ${NUM_OF_WORKERS} dropped.",
    }));
    assert_eq!(document_variables(&doc), vec!["NUM_OF_WORKERS", "TIME"]);
  }

  #[test]
  fn test_variables_come_from_fields_outside_the_search_text() {
    let doc = document(json!({
      "summary": "Upgrade blocked",
      "doc_references": ["https://docs.example.com/${CLUSTER_ID}/upgrade"],
      "nested": {"hint": "see ${NAMESPACE}"},
      "count": 4
    }));
    assert_eq!(document_variables(&doc), vec!["CLUSTER_ID", "NAMESPACE"]);
    assert!(!searchable_text(&doc).contains("CLUSTER_ID"));
  }

  #[test]
  fn test_searchable_text_field_order_and_whitespace() {
    let doc = document(json!({
      "log_type": "cluster-lifecycle",
      "service_name": "SREManualAction",
      "description": "Nodes are\n  not ready.",
      "summary": "  Node   outage ",
      "_tags": ["t_nodes", "t_infra"],
      "internal_only": true
    }));
    assert_eq!(
      searchable_text(&doc),
      "Node outage Nodes are not ready. t_nodes t_infra SREManualAction cluster-lifecycle"
    );
  }

  #[test]
  fn test_searchable_text_empty_when_no_text_fields() {
    let doc = document(json!({"severity": "Info", "internal_only": false}));
    assert_eq!(searchable_text(&doc), "");
  }

  #[test]
  fn test_record_id_is_stable() {
    let doc = document(json!({"summary": "s"}));
    let first = SearchableRecord::from_document(doc.clone());
    let second = SearchableRecord::from_document(doc);
    assert_eq!(first.id, "osd/sample.json");
    assert_eq!(first, second);
  }
}
