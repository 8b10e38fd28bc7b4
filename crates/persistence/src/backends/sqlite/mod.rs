//! SQLite backend implementation.
//!
//! This module provides a SQLite implementation of the record and channel
//! storage traits. It supports both in-memory databases (great for testing)
//! and file-based databases (for development and small deployments).
//!
//! # Example
//!
//! ```no_run
//! use beacon_persistence::backends::sqlite::SqliteBackend;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Create an in-memory database
//! let backend = SqliteBackend::in_memory()?;
//!
//! // Initialize the schema
//! backend.init_schema()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE channels (
//!     slug TEXT NOT NULL PRIMARY KEY,
//!     name TEXT NOT NULL,
//!     created_at TEXT NOT NULL
//! );
//!
//! -- One row per value of a multi-valued setting
//! CREATE TABLE channel_settings (
//!     channel TEXT NOT NULL REFERENCES channels(slug),
//!     key TEXT NOT NULL,
//!     position INTEGER NOT NULL,
//!     value TEXT NOT NULL,
//!     PRIMARY KEY (channel, key, position)
//! );
//!
//! CREATE TABLE records (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     kind TEXT NOT NULL,
//!     channel TEXT NOT NULL REFERENCES channels(slug),
//!     data TEXT NOT NULL,  -- JSON fields
//!     created_at TEXT NOT NULL,
//!     updated_at TEXT NOT NULL
//! );
//! ```
//!
//! Predicates are rendered with the JSON1 functions; see [`sql`] for the
//! mapping.

mod backend;
mod schema;
pub(crate) mod sql;
mod storage;

pub use backend::{SqliteBackend, SqliteBackendConfig};
pub use schema::SCHEMA_VERSION;
