//! # beacon-rest - Channel-enforcing REST API
//!
//! This crate serves the records of the Beacon volunteer platform over HTTP.
//! Every request runs under a channel (a white-label tenant): reads only see
//! what the channel owns plus what the registered content flows grant it,
//! and writes always attach the request channel.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use beacon_persistence::backends::sqlite::SqliteBackend;
//! use beacon_rest::{AppState, ServerConfig, create_app_with_state, flows_from_config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = SqliteBackend::open("beacon.db")?;
//!     backend.init_schema()?;
//!
//!     let config = ServerConfig::default();
//!     let state = AppState::new(Arc::new(backend), config.clone())
//!         .with_flows(flows_from_config(&config));
//!     let app = create_app_with_state(state);
//!
//!     let listener = tokio::net::TcpListener::bind(config.socket_addr()).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## API Endpoints
//!
//! | Operation | HTTP Method | URL Pattern |
//! |-----------|-------------|-------------|
//! | list | GET | `/api/{kind}` |
//! | create | POST | `/api/{kind}` |
//! | read | GET | `/api/{kind}/{id}` |
//! | update | PATCH | `/api/{kind}/{id}` |
//! | delete | DELETE | `/api/{kind}/{id}` |
//! | channel | GET | `/api/channel` |
//! | health | GET | `/health`, `/_liveness`, `/_readiness` |
//!
//! ## HTTP Headers
//!
//! - `X-Channel` - Channel slug; requests without it run under the default
//!   channel
//! - `X-Request-ID` - Correlation id; generated when absent and echoed back
//!
//! ## Architecture
//!
//! - [`config`] - Server configuration
//! - [`state`] - Application state (storage, registry, flows, interceptors)
//! - [`error`] - Error types and their JSON bodies
//! - [`extractors`] - Channel resolution and list parameters
//! - [`enforcement`] - Channel-confined resource units, interceptors and dispatch
//! - [`handlers`] - HTTP request handlers
//! - [`routing`] - Route configuration

// Enforce documentation
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod enforcement;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod routing;
pub mod state;

// Re-export commonly used types
pub use config::{ServerConfig, flows_from_config};
pub use error::{RestError, RestResult};
pub use state::AppState;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use beacon_persistence::core::{Backend, ChannelStorage, RecordStorage};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

/// Creates the Axum application with flows taken from `config` and no
/// interceptors.
///
/// # Arguments
///
/// * `storage` - The storage backend to use
/// * `config` - Server configuration
pub fn create_app_with_config<S>(storage: S, config: ServerConfig) -> Router
where
    S: RecordStorage + ChannelStorage + Backend + 'static,
{
    let flows = flows_from_config(&config);
    let state = AppState::new(Arc::new(storage), config).with_flows(flows);
    create_app_with_state(state)
}

/// Creates the Axum application around prepared state.
///
/// Use this to register custom content flows or interceptors.
pub fn create_app_with_state<S>(state: AppState<S>) -> Router
where
    S: RecordStorage + ChannelStorage + Backend + 'static,
{
    let config = state.config().clone();
    info!(
        backend = state.storage().backend_name(),
        flows = state.flows().len(),
        interceptors = state.interceptors().len(),
        default_channel = %state.default_channel(),
        "Creating REST API server"
    );

    let router = routing::create_routes(state);

    // Build middleware stack
    let service_builder = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TimeoutLayer::with_status_code(
            axum::http::StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout),
        ));

    let router = router.layer(DefaultBodyLimit::max(config.max_body_size));

    // Add CORS if enabled
    let router = if config.enable_cors {
        router.layer(build_cors_layer(&config))
    } else {
        router
    };

    router.layer(service_builder)
}

/// Builds the CORS layer based on configuration.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let mut cors = CorsLayer::new();

    if config.cors_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    if config.cors_methods == "*" {
        cors = cors.allow_methods(Any);
    } else {
        let methods: Vec<_> = config
            .cors_methods
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_methods(methods);
    }

    if config.cors_headers == "*" {
        cors = cors.allow_headers(Any);
    } else {
        let headers: Vec<_> = config
            .cors_headers
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_headers(headers);
    }

    cors
}

/// Initializes the tracing subscriber for logging.
///
/// Call once at startup. `RUST_LOG` overrides `level` when set.
///
/// # Arguments
///
/// * `level` - The log level (error, warn, info, debug, trace)
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "beacon={level},beacon_rest={level},beacon_persistence={level},tower_http=debug"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
