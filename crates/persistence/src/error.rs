//! Error types for the persistence layer.
//!
//! Errors are grouped by category: record state, channel isolation,
//! validation and backend failures. [`StorageError`] wraps all of them.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

use crate::entity::{EntityKind, RecordId};

/// The primary error type for all storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Record state errors
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Channel isolation errors
    #[error(transparent)]
    Tenant(#[from] TenantError),

    /// Validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors related to record state.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The requested record was not found (or is not visible).
    #[error("record not found: {kind}/{id}")]
    NotFound { kind: EntityKind, id: RecordId },

    /// A record or channel with the given identity already exists.
    #[error("already exists: {what}")]
    AlreadyExists { what: String },
}

/// Errors related to channel isolation.
///
/// All of these are client errors: they are never retried and never
/// swallowed.
#[derive(Error, Debug)]
pub enum TenantError {
    /// A write was attempted without naming the owning channel.
    #[error("no channel supplied when creating a {kind} record")]
    NoTenantSupplied { kind: EntityKind },

    /// The channel was set through the record's fields instead of the
    /// dedicated creation parameter.
    #[error("{kind} records cannot set '{field}' directly; pass the channel as a parameter")]
    DirectTenantAssociation { kind: EntityKind, field: String },

    /// The supplied channel slug does not resolve to a known channel.
    #[error("channel not found: {slug}")]
    TenantNotFound { slug: String },
}

/// Errors related to validation of input.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// A channel slug is malformed.
    #[error("invalid channel slug: '{slug}'")]
    InvalidChannelSlug { slug: String },

    /// The entity kind name is not known.
    #[error("unknown entity kind: {name}")]
    UnknownEntityKind { name: String },

    /// Missing required field.
    #[error("missing required field: {field}")]
    MissingRequiredField { field: String },

    /// The record's field map is not acceptable.
    #[error("invalid record: {message}")]
    InvalidRecord { message: String },
}

/// Errors originating from the database backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Connection to the backend failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Backend is temporarily unavailable.
    #[error("backend unavailable: {backend_name}: {message}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// Schema migration error.
    #[error("schema migration failed: {message}")]
    MigrationError { message: String },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Query execution error.
    #[error("query execution failed: {message}")]
    QueryError { message: String },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    /// Returns `true` if this error was caused by the caller's input rather
    /// than by the storage layer.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StorageError::Resource(_) | StorageError::Tenant(_) | StorageError::Validation(_)
        )
    }
}
