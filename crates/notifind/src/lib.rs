//! notifind - semantic search over managed service notification templates
//!
//! The build phase ([`builder`]) walks a corpus of notification JSON files,
//! embeds each one and publishes a LanceDB index. The query phase
//! ([`engine`]) embeds a free-text problem statement with the same model and
//! returns the closest notifications with their template variables.

pub mod builder;
pub mod cli;
pub mod config;
pub mod document;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod extract;
pub mod index;
pub mod metadata;
pub mod server;
pub mod stats;
pub mod tools;

pub use builder::{BuildReport, IndexBuilder};
pub use engine::{QueryResult, SearchService};
pub use error::{Result, SearchError};
pub use stats::DatabaseStats;
