//! Shared helpers for the REST API integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum_test::{TestResponse, TestServer};
use beacon_persistence::backends::sqlite::SqliteBackend;
use beacon_persistence::flow::ContentFlowManager;
use beacon_persistence::tenant::{Channel, ChannelSlug};
use beacon_rest::enforcement::InterceptorChain;
use beacon_rest::{AppState, ServerConfig, create_app_with_state};
use serde_json::{Value, json};

pub const X_CHANNEL: HeaderName = HeaderName::from_static("x-channel");

/// Channels every test server starts with.
pub const SEEDED_CHANNELS: &[&str] = &["default", "partner", "other"];

/// A running test server and the backend behind it.
pub struct TestApp {
    pub server: TestServer,
    pub backend: Arc<SqliteBackend>,
}

impl TestApp {
    /// Starts a server with no flows and no interceptors.
    pub async fn new() -> Self {
        Self::with(ContentFlowManager::empty(), InterceptorChain::new()).await
    }

    /// Starts a server with the given flows and interceptors.
    pub async fn with(flows: ContentFlowManager, interceptors: InterceptorChain) -> Self {
        Self::with_config(ServerConfig::for_testing(), flows, interceptors).await
    }

    /// Starts a server with a custom configuration.
    pub async fn with_config(
        config: ServerConfig,
        flows: ContentFlowManager,
        interceptors: InterceptorChain,
    ) -> Self {
        let backend = SqliteBackend::in_memory().expect("Failed to create SQLite backend");
        backend.init_schema().expect("Failed to init schema");
        let backend = Arc::new(backend);

        let state = AppState::new(Arc::clone(&backend), config)
            .with_flows(flows)
            .with_interceptors(interceptors);
        for slug in SEEDED_CHANNELS {
            state
                .registry()
                .create_channel(Channel::new(ChannelSlug::new(*slug), *slug))
                .await
                .expect("Failed to seed channel");
        }

        let server =
            TestServer::new(create_app_with_state(state)).expect("Failed to create test server");
        Self { server, backend }
    }

    /// Creates a record under `channel` and returns its JSON.
    pub async fn create(&self, channel: &str, kind: &str, body: Value) -> Value {
        let response = self
            .server
            .post(&format!("/api/{kind}"))
            .add_header(X_CHANNEL, channel_header(channel))
            .json(&body)
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json()
    }

    /// Lists `kind` under `channel`.
    pub async fn list(&self, channel: &str, kind: &str) -> TestResponse {
        self.server
            .get(&format!("/api/{kind}"))
            .add_header(X_CHANNEL, channel_header(channel))
            .await
    }

    /// Returns the names of the `kind` records visible under `channel`,
    /// sorted.
    pub async fn visible_names(&self, channel: &str, kind: &str) -> Vec<String> {
        let response = self.list(channel, kind).await;
        response.assert_status_ok();
        let body: Value = response.json();
        let mut names: Vec<String> = body["results"]
            .as_array()
            .expect("results must be an array")
            .iter()
            .filter_map(|record| record["name"].as_str().map(str::to_string))
            .collect();
        names.sort();
        names
    }
}

pub fn channel_header(channel: &str) -> HeaderValue {
    HeaderValue::from_str(channel).expect("invalid header value")
}

/// A project tagged with the given categories.
pub fn project(name: &str, categories: &[&str]) -> Value {
    json!({
        "name": name,
        "published": true,
        "categories": categories,
    })
}
