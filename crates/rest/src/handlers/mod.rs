//! HTTP request handlers.
//!
//! - [`records`] - List, create, read, update and delete records
//! - [`channel`] - The request channel and its effective settings
//! - [`health`] - Health check endpoints

pub mod channel;
pub mod health;
pub mod records;

pub use channel::channel_handler;
pub use health::{health_handler, liveness_handler, readiness_handler};
pub use records::{create_handler, delete_handler, list_handler, patch_handler, read_handler};
