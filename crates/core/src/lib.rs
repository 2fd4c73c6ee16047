//! Core types and shared functionality for portal-proxy.
//!
//! This crate provides:
//! - Versioned cache buckets with a SQLite backend
//! - Unified error types
//! - Configuration structures
//! - The compiled-in cache version and asset manifest

pub mod cache;
pub mod config;
pub mod error;
pub mod manifest;

pub use cache::{CacheDb, CacheRequest, EntrySummary, ResponseType, StoredResponse};
pub use config::AppConfig;
pub use error::Error;
