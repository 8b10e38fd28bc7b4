//! Core storage traits and abstractions.
//!
//! - [`Backend`] - Driver lifecycle (schema setup, health checks)
//! - [`RecordStorage`] - Channel-scoped record persistence
//! - [`ChannelStorage`] - Channel and settings persistence
//!
//! Backends in [`crate::backends`] implement all three.

mod backend;
mod storage;

pub use backend::{Backend, BackendKind};
pub use storage::{ChannelStorage, RecordStorage};
