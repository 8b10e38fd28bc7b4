//! API route configuration.

use axum::{
    Router,
    routing::get,
};
use beacon_persistence::core::{Backend, ChannelStorage, RecordStorage};

use crate::handlers;
use crate::state::AppState;

/// Creates all API routes.
///
/// # Routes
///
/// ## System-level
/// - `GET /health` - Health check
/// - `GET /_liveness` - Liveness probe
/// - `GET /_readiness` - Readiness probe
///
/// ## Channel
/// - `GET /api/channel` - The request channel
///
/// ## Kind-level
/// - `GET /api/{kind}` - List
/// - `POST /api/{kind}` - Create
///
/// ## Instance-level
/// - `GET /api/{kind}/{id}` - Read
/// - `PATCH /api/{kind}/{id}` - Update
/// - `DELETE /api/{kind}/{id}` - Delete
pub fn create_routes<S>(state: AppState<S>) -> Router
where
    S: RecordStorage + ChannelStorage + Backend + 'static,
{
    Router::new()
        // System-level routes
        .route("/health", get(handlers::health_handler::<S>))
        .route("/_liveness", get(handlers::liveness_handler))
        .route("/_readiness", get(handlers::readiness_handler::<S>))
        // Channel
        .route("/api/channel", get(handlers::channel_handler::<S>))
        // Kind-level routes
        .route(
            "/api/{kind}",
            get(handlers::list_handler::<S>).post(handlers::create_handler::<S>),
        )
        // Instance-level routes
        .route(
            "/api/{kind}/{id}",
            get(handlers::read_handler::<S>)
                .patch(handlers::patch_handler::<S>)
                .delete(handlers::delete_handler::<S>),
        )
        .with_state(state)
}
