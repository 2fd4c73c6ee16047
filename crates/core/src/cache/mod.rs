//! SQLite-backed versioned cache buckets.
//!
//! This module provides the persistent request/response store the proxy
//! reads and writes, using SQLite with async access via tokio-rusqlite.
//! It supports:
//!
//! - Named buckets, one per cache version
//! - Request keys derived from method and canonical URL (SHA-256)
//! - `Vary`-aware matching on request headers
//! - All-or-nothing batch population in a single transaction
//! - Automatic schema migrations

pub mod buckets;
pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod response;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::EntrySummary;
pub use response::{CacheRequest, ResponseType, StoredResponse};
