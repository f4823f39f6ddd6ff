//! Notification documents and the corpus loader
//!
//! The loader walks the corpus lazily. A file that cannot be read or parsed
//! becomes a [`SkippedDocument`] instead of an error, so one bad template
//! never blocks indexing the rest.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Category given to files that sit directly in the corpus root
pub const ROOT_CATEGORY: &str = "root";

/// Notification severity. Values outside the known set are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
  Debug,
  Info,
  Warning,
  Major,
  Critical,
  Other(String),
}

impl Severity {
  pub fn as_str(&self) -> &str {
    match self {
      Severity::Debug => "Debug",
      Severity::Info => "Info",
      Severity::Warning => "Warning",
      Severity::Major => "Major",
      Severity::Critical => "Critical",
      Severity::Other(value) => value,
    }
  }
}

impl From<String> for Severity {
  fn from(value: String) -> Self {
    match value.as_str() {
      "Debug" => Severity::Debug,
      "Info" => Severity::Info,
      "Warning" => Severity::Warning,
      "Major" => Severity::Major,
      "Critical" => Severity::Critical,
      _ => Severity::Other(value),
    }
  }
}

impl From<&str> for Severity {
  fn from(value: &str) -> Self {
    Severity::from(value.to_string())
  }
}

impl From<Severity> for String {
  fn from(severity: Severity) -> Self {
    severity.as_str().to_string()
  }
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One parsed notification template.
///
/// Known fields are lifted out for convenience; `raw` keeps the whole object,
/// unknown fields included, so nothing is lost on the way into the index.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationDocument {
  /// Path relative to the corpus root, with `/` separators
  pub relative_path: String,
  pub category: String,
  pub severity: Option<Severity>,
  pub service_name: Option<String>,
  pub log_type: Option<String>,
  pub summary: Option<String>,
  pub description: Option<String>,
  pub tags: Vec<String>,
  pub doc_references: Vec<String>,
  pub internal_only: bool,
  pub raw: Map<String, Value>,
}

impl NotificationDocument {
  /// Build a document from parsed JSON. Only a non-object top level is rejected;
  /// missing or mistyped fields simply come out empty.
  pub fn from_json(relative_path: &str, value: Value) -> Result<Self, String> {
    let raw = match value {
      Value::Object(raw) => raw,
      other => return Err(format!("expected a JSON object, found {}", json_kind(&other))),
    };

    Ok(Self {
      relative_path: relative_path.to_string(),
      category: category_for(relative_path),
      severity: string_field(&raw, "severity").map(Severity::from),
      service_name: string_field(&raw, "service_name"),
      log_type: string_field(&raw, "log_type"),
      summary: string_field(&raw, "summary"),
      description: string_field(&raw, "description"),
      tags: ["_tags", "tags"].iter().flat_map(|key| string_list(&raw, key)).collect(),
      doc_references: string_list(&raw, "doc_references"),
      internal_only: raw.get("internal_only").and_then(Value::as_bool).unwrap_or(false),
      raw,
    })
  }

  /// Parse a document from file contents
  pub fn parse(relative_path: &str, contents: &str) -> Result<Self, String> {
    let value: Value = serde_json::from_str(contents).map_err(|e| format!("invalid JSON: {e}"))?;
    Self::from_json(relative_path, value)
  }
}

fn string_field(raw: &Map<String, Value>, key: &str) -> Option<String> {
  raw.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()).map(str::to_string)
}

fn string_list(raw: &Map<String, Value>, key: &str) -> Vec<String> {
  match raw.get(key) {
    Some(Value::Array(items)) => {
      items.iter().filter_map(Value::as_str).map(str::to_string).collect()
    }
    _ => Vec::new(),
  }
}

fn json_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}

/// Category is the first path segment when the file lives in a subdirectory
pub fn category_for(relative_path: &str) -> String {
  match relative_path.split_once('/') {
    Some((first, _)) if !first.is_empty() => first.to_string(),
    _ => ROOT_CATEGORY.to_string(),
  }
}

/// A file the loader could not turn into a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedDocument {
  pub path: String,
  pub reason: String,
}

/// What the loader yields for each candidate file
pub type LoadOutcome = Result<NotificationDocument, SkippedDocument>;

/// Lazy walker over a notification corpus
#[derive(Debug, Clone)]
pub struct CorpusLoader {
  root: PathBuf,
  exclude: Vec<PathBuf>,
}

impl CorpusLoader {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into(), exclude: Vec::new() }
  }

  /// Exclude paths. Relative paths are taken relative to the corpus root.
  pub fn with_exclusions<I, P>(mut self, paths: I) -> Self
  where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
  {
    for path in paths {
      let path = path.into();
      let absolute = if path.is_absolute() { path } else { self.root.join(path) };
      self.exclude.push(normalize(&absolute));
    }
    self
  }

  /// Walk the corpus in file-name order, yielding one outcome per `.json` file.
  pub fn documents(&self) -> impl Iterator<Item = LoadOutcome> + '_ {
    WalkDir::new(&self.root)
      .sort_by_file_name()
      .into_iter()
      .filter_entry(move |entry| !self.is_pruned(entry))
      .filter_map(move |entry| match entry {
        Ok(entry) if is_json_file(&entry) => Some(self.load_file(entry.path())),
        Ok(_) => None,
        Err(e) => Some(Err(SkippedDocument {
          path: e.path().map(|p| self.relative(p)).unwrap_or_else(|| self.root.display().to_string()),
          reason: format!("unreadable: {e}"),
        })),
      })
  }

  fn is_pruned(&self, entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
      return false;
    }
    let hidden = entry.file_name().to_str().is_some_and(|name| name.starts_with('.'));
    hidden || self.exclude.iter().any(|excluded| normalize(entry.path()).starts_with(excluded))
  }

  fn load_file(&self, path: &Path) -> LoadOutcome {
    let relative_path = self.relative(path);
    let skipped = |reason: String| SkippedDocument { path: relative_path.clone(), reason };

    let contents = std::fs::read_to_string(path).map_err(|e| skipped(format!("unreadable: {e}")))?;
    NotificationDocument::parse(&relative_path, &contents).map_err(skipped)
  }

  fn relative(&self, path: &Path) -> String {
    let relative = path.strip_prefix(&self.root).unwrap_or(path);
    relative
      .components()
      .map(|c| c.as_os_str().to_string_lossy())
      .collect::<Vec<_>>()
      .join("/")
  }
}

fn is_json_file(entry: &DirEntry) -> bool {
  entry.file_type().is_file() && entry.path().extension().is_some_and(|ext| ext == "json")
}

/// Lexically normalize a path (drop `.`, resolve `..`) without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
  let mut normalized = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        normalized.pop();
      }
      other => normalized.push(other.as_os_str()),
    }
  }
  normalized
}
