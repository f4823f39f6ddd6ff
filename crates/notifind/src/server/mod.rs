//! HTTP tool server
//!
//! Exposes `search_service_logs` and `get_database_stats` as JSON endpoints
//! over axum. Every handler shares one [`crate::engine::SearchService`].

pub mod handlers;
pub mod routing;
pub mod startup;
pub mod types;
