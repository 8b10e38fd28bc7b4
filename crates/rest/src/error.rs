//! Error types for the Beacon REST API.
//!
//! Every error leaves the API as a JSON body of the form
//! `{"error": {"code": "...", "message": "..."}}`.
//!
//! # Error Mapping
//!
//! | Storage Error | HTTP Status | Code |
//! |--------------|-------------|------|
//! | NoTenantSupplied | 400 | no-channel-supplied |
//! | DirectTenantAssociation | 400 | direct-channel-association |
//! | TenantNotFound | 400 | channel-not-found |
//! | ValidationError | 400 | invalid |
//! | NotFound | 404 | not-found |
//! | AlreadyExists | 409 | conflict |
//! | Unavailable | 503 | unavailable |
//! | other BackendError | 500 | exception |

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use beacon_persistence::error::{
    BackendError, ResourceError, StorageError, TenantError, ValidationError,
};
use serde_json::json;

use crate::enforcement::ApiResponse;

/// The primary error type for REST API operations.
#[derive(Debug)]
pub enum RestError {
    /// A write named no channel (HTTP 400).
    NoChannelSupplied {
        /// Error message.
        message: String,
    },

    /// A write set the channel through the record's fields (HTTP 400).
    DirectChannelAssociation {
        /// Error message.
        message: String,
    },

    /// The requested channel does not exist (HTTP 400).
    ChannelNotFound {
        /// The slug the client supplied.
        slug: String,
    },

    /// Bad request - validation error (HTTP 400).
    BadRequest {
        /// Error message.
        message: String,
    },

    /// Record not found or not visible (HTTP 404).
    NotFound {
        /// The entity kind (e.g. "projects").
        kind: String,
        /// The record id.
        id: String,
    },

    /// The record or channel already exists (HTTP 409).
    Conflict {
        /// Error message.
        message: String,
    },

    /// Storage is temporarily unavailable (HTTP 503).
    ServiceUnavailable {
        /// Error message.
        message: String,
    },

    /// Internal server error (HTTP 500).
    InternalError {
        /// Error message.
        message: String,
    },
}

impl RestError {
    /// Returns the HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            RestError::NoChannelSupplied { .. }
            | RestError::DirectChannelAssociation { .. }
            | RestError::ChannelNotFound { .. }
            | RestError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            RestError::NotFound { .. } => StatusCode::NOT_FOUND,
            RestError::Conflict { .. } => StatusCode::CONFLICT,
            RestError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            RestError::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            RestError::NoChannelSupplied { .. } => "no-channel-supplied",
            RestError::DirectChannelAssociation { .. } => "direct-channel-association",
            RestError::ChannelNotFound { .. } => "channel-not-found",
            RestError::BadRequest { .. } => "invalid",
            RestError::NotFound { .. } => "not-found",
            RestError::Conflict { .. } => "conflict",
            RestError::ServiceUnavailable { .. } => "unavailable",
            RestError::InternalError { .. } => "exception",
        }
    }

    /// Returns `true` for 5xx errors.
    pub fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }

    /// Renders the error as the standard error response.
    pub fn to_api_response(&self) -> ApiResponse {
        ApiResponse::new(self.status()).with_body(error_body(self.code(), &self.to_string()))
    }
}

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestError::NoChannelSupplied { message }
            | RestError::DirectChannelAssociation { message }
            | RestError::BadRequest { message }
            | RestError::Conflict { message } => write!(f, "{}", message),
            RestError::ChannelNotFound { slug } => write!(f, "Channel not found: {}", slug),
            RestError::NotFound { kind, id } => write!(f, "Record not found: {}/{}", kind, id),
            RestError::ServiceUnavailable { message } => {
                write!(f, "Service unavailable: {}", message)
            }
            RestError::InternalError { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for RestError {}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        self.to_api_response().into_response()
    }
}

/// Builds the standard error body.
pub fn error_body(code: &str, message: &str) -> serde_json::Value {
    json!({
        "error": {
            "code": code,
            "message": message,
        }
    })
}

/// Result type alias for REST operations.
pub type RestResult<T> = Result<T, RestError>;

impl From<StorageError> for RestError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Resource(e) => e.into(),
            StorageError::Tenant(e) => e.into(),
            StorageError::Validation(e) => e.into(),
            StorageError::Backend(e) => e.into(),
        }
    }
}

impl From<ResourceError> for RestError {
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::NotFound { kind, id } => RestError::NotFound {
                kind: kind.to_string(),
                id: id.to_string(),
            },
            e @ ResourceError::AlreadyExists { .. } => RestError::Conflict {
                message: e.to_string(),
            },
        }
    }
}

impl From<TenantError> for RestError {
    fn from(err: TenantError) -> Self {
        match err {
            e @ TenantError::NoTenantSupplied { .. } => RestError::NoChannelSupplied {
                message: e.to_string(),
            },
            e @ TenantError::DirectTenantAssociation { .. } => {
                RestError::DirectChannelAssociation {
                    message: e.to_string(),
                }
            }
            TenantError::TenantNotFound { slug } => RestError::ChannelNotFound { slug },
        }
    }
}

impl From<ValidationError> for RestError {
    fn from(err: ValidationError) -> Self {
        RestError::BadRequest {
            message: err.to_string(),
        }
    }
}

impl From<BackendError> for RestError {
    fn from(err: BackendError) -> Self {
        match err {
            e @ BackendError::Unavailable { .. } => RestError::ServiceUnavailable {
                message: e.to_string(),
            },
            e => RestError::InternalError {
                message: e.to_string(),
            },
        }
    }
}
