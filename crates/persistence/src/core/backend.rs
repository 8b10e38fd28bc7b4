//! Backend abstraction for storage drivers.
//!
//! This module defines the [`Backend`] trait, which covers the lifecycle of a
//! storage driver (schema setup and health checks) independently of the
//! record and channel operations it serves.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::BackendError;

/// Identifies the type of storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// SQLite database (file-based or in-memory).
    Sqlite,
    /// Process-local maps, used for tests and ephemeral deployments.
    Memory,
    /// Custom or unknown backend.
    Custom(&'static str),
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Sqlite => write!(f, "sqlite"),
            BackendKind::Memory => write!(f, "memory"),
            BackendKind::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// Lifecycle operations every storage backend provides.
#[async_trait]
pub trait Backend: Send + Sync + Debug {
    /// Returns the backend kind.
    fn kind(&self) -> BackendKind;

    /// Verifies the backend can serve queries.
    async fn health_check(&self) -> Result<(), BackendError>;

    /// Creates or migrates the schema. Idempotent.
    async fn initialize(&self) -> Result<(), BackendError>;
}
