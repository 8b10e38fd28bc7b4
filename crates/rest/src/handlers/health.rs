//! Health check endpoint handlers.
//!
//! Provides health, liveness and readiness endpoints for monitoring and
//! load balancers.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use beacon_persistence::core::{Backend, RecordStorage};
use tracing::{debug, warn};

use crate::error::RestResult;
use crate::state::AppState;

/// Handler for the health check endpoint.
///
/// # HTTP Request
///
/// `GET [base]/health`
///
/// # Response
///
/// - `200 OK` - Server is up
pub async fn health_handler<S>(State(state): State<AppState<S>>) -> RestResult<Response>
where
    S: RecordStorage + Backend,
{
    debug!("Processing health check request");

    let health_response = serde_json::json!({
        "status": "healthy",
        "backend": state.storage().backend_name(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    });

    Ok((StatusCode::OK, Json(health_response)).into_response())
}

/// Handler for the liveness probe.
///
/// # HTTP Request
///
/// `GET [base]/_liveness`
pub async fn liveness_handler() -> impl IntoResponse {
    StatusCode::OK
}

/// Handler for the readiness probe. Asks the backend to verify it can serve
/// queries.
///
/// # HTTP Request
///
/// `GET [base]/_readiness`
///
/// # Response
///
/// - `200 OK` - Storage answered
/// - `503 Service Unavailable` - Storage check failed
pub async fn readiness_handler<S>(State(state): State<AppState<S>>) -> RestResult<Response>
where
    S: RecordStorage + Backend,
{
    debug!("Processing readiness check request");

    let backend = state.storage().kind().to_string();
    let (status, storage) = match state.storage().health_check().await {
        Ok(()) => (StatusCode::OK, "ok".to_string()),
        Err(err) => {
            warn!(backend = %backend, error = %err, "Readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
        }
    };

    let response = serde_json::json!({
        "status": if status.is_success() { "ready" } else { "unavailable" },
        "backend": backend,
        "checks": {
            "storage": storage
        }
    });

    Ok((status, Json(response)).into_response())
}
