//! Integration tests for channel resolution, isolation and content flows
//! over HTTP.

mod common;

use axum::http::StatusCode;
use beacon_persistence::flow::{ContentFlowManager, FlowRule};
use beacon_persistence::tenant::ChannelSlug;
use beacon_rest::ServerConfig;
use beacon_rest::enforcement::InterceptorChain;
use common::{TestApp, X_CHANNEL, channel_header, project};
use serde_json::{Value, json};

fn shared_with_partner() -> ContentFlowManager {
    ContentFlowManager::builder()
        .register(FlowRule::shared_category(ChannelSlug::new("partner"), "shared"))
        .build()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new().await;

    app.server.get("/health").await.assert_status_ok();
    app.server.get("/_liveness").await.assert_status_ok();
    app.server.get("/_readiness").await.assert_status_ok();
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = TestApp::new().await;

    let response = app
        .server
        .get("/health")
        .add_header(
            axum::http::HeaderName::from_static("x-request-id"),
            channel_header("req-42"),
        )
        .await;
    assert_eq!(response.header("x-request-id"), "req-42");
}

// =============================================================================
// Channel Resolution
// =============================================================================

#[tokio::test]
async fn test_missing_header_uses_default_channel() {
    let app = TestApp::new().await;

    let created: Value = {
        let response = app
            .server
            .post("/api/projects")
            .json(&project("Beach cleanup", &[]))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json()
    };
    assert_eq!(created["channel"], "default");

    let response = app.server.get("/api/channel").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["slug"], "default");
    assert_eq!(body["is_default"], true);
}

#[tokio::test]
async fn test_malformed_header_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .server
        .get("/api/projects")
        .add_header(X_CHANNEL, channel_header("not a slug!"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "invalid");
}

#[tokio::test]
async fn test_unknown_channel_is_rejected() {
    let app = TestApp::new().await;

    for path in ["/api/projects", "/api/channel"] {
        let response = app
            .server
            .get(path)
            .add_header(X_CHANNEL, channel_header("ghost"))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "channel-not-found");
    }
}

#[tokio::test]
async fn test_channel_settings_are_merged_with_defaults() {
    let app = TestApp::new().await;

    let response = app
        .server
        .get("/api/channel")
        .add_header(X_CHANNEL, channel_header("partner"))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["slug"], "partner");
    assert_eq!(body["is_default"], false);
    assert_eq!(body["settings"]["MAPS_API_LANGUAGE"], json!(["en-US"]));
}

#[tokio::test]
async fn test_unknown_kind_is_rejected() {
    let app = TestApp::new().await;

    let response = app.server.get("/api/spaceships").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

// =============================================================================
// Writes
// =============================================================================

#[tokio::test]
async fn test_create_attaches_request_channel() {
    let app = TestApp::new().await;

    let created = app.create("partner", "projects", project("Food bank", &[])).await;
    assert_eq!(created["channel"], "partner");
    assert_eq!(created["name"], "Food bank");
    assert!(created["id"].is_i64());
}

#[tokio::test]
async fn test_create_with_channel_field_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/api/projects")
        .add_header(X_CHANNEL, channel_header("partner"))
        .json(&json!({"name": "Sneaky", "channel": "default"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "direct-channel-association");

    assert!(app.visible_names("default", "projects").await.is_empty());
}

#[tokio::test]
async fn test_create_requires_object_body() {
    let app = TestApp::new().await;

    let response = app.server.post("/api/projects").json(&json!([1, 2])).await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_patch_cannot_move_record() {
    let app = TestApp::new().await;
    let created = app.create("partner", "projects", project("Food bank", &[])).await;
    let id = created["id"].as_i64().unwrap();

    let response = app
        .server
        .patch(&format!("/api/projects/{id}"))
        .add_header(X_CHANNEL, channel_header("partner"))
        .json(&json!({"channel": "other"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    assert_eq!(app.visible_names("partner", "projects").await, vec!["Food bank"]);
}

#[tokio::test]
async fn test_patch_merges_fields() {
    let app = TestApp::new().await;
    let created = app.create("partner", "projects", project("Food bank", &[])).await;
    let id = created["id"].as_i64().unwrap();

    let response = app
        .server
        .patch(&format!("/api/projects/{id}"))
        .add_header(X_CHANNEL, channel_header("partner"))
        .json(&json!({"name": "Food bank drive"}))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["name"], "Food bank drive");
    assert_eq!(body["channel"], "partner");
    assert_eq!(body["published"], true);
}

// =============================================================================
// Isolation
// =============================================================================

#[tokio::test]
async fn test_records_are_isolated_between_channels() {
    let app = TestApp::new().await;
    app.create("default", "projects", project("Beach cleanup", &[])).await;
    app.create("partner", "projects", project("Food bank", &[])).await;

    assert_eq!(app.visible_names("default", "projects").await, vec!["Beach cleanup"]);
    assert_eq!(app.visible_names("partner", "projects").await, vec!["Food bank"]);
    assert!(app.visible_names("other", "projects").await.is_empty());
}

#[tokio::test]
async fn test_foreign_record_is_not_found() {
    let app = TestApp::new().await;
    let created = app.create("partner", "projects", project("Food bank", &[])).await;
    let path = format!("/api/projects/{}", created["id"]);

    let read = app
        .server
        .get(&path)
        .add_header(X_CHANNEL, channel_header("other"))
        .await;
    read.assert_status(StatusCode::NOT_FOUND);
    let body: Value = read.json();
    assert_eq!(body["error"]["code"], "not-found");

    app.server
        .patch(&path)
        .add_header(X_CHANNEL, channel_header("other"))
        .json(&json!({"name": "Hijacked"}))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    app.server
        .delete(&path)
        .add_header(X_CHANNEL, channel_header("other"))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    assert_eq!(app.visible_names("partner", "projects").await, vec!["Food bank"]);
}

#[tokio::test]
async fn test_owner_can_delete() {
    let app = TestApp::new().await;
    let created = app.create("partner", "projects", project("Food bank", &[])).await;
    let path = format!("/api/projects/{}", created["id"]);

    app.server
        .delete(&path)
        .add_header(X_CHANNEL, channel_header("partner"))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    app.server
        .get(&path)
        .add_header(X_CHANNEL, channel_header("partner"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_non_numeric_id_is_not_found() {
    let app = TestApp::new().await;

    app.server
        .get("/api/projects/abc")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

// =============================================================================
// Content Flows
// =============================================================================

#[tokio::test]
async fn test_partner_sees_shared_default_projects() {
    let app = TestApp::with(shared_with_partner(), InterceptorChain::new()).await;
    app.create("default", "projects", project("Beach cleanup", &["shared"])).await;
    app.create("default", "projects", project("Board meeting", &["internal"])).await;
    app.create("partner", "projects", project("Food bank", &[])).await;
    app.create("other", "projects", project("Tree planting", &["shared"])).await;

    assert_eq!(
        app.visible_names("partner", "projects").await,
        vec!["Beach cleanup", "Food bank"]
    );
    assert_eq!(
        app.visible_names("default", "projects").await,
        vec!["Beach cleanup", "Board meeting"]
    );
    assert_eq!(app.visible_names("other", "projects").await, vec!["Tree planting"]);
}

#[tokio::test]
async fn test_shared_record_is_readable_but_stays_with_owner() {
    let app = TestApp::with(shared_with_partner(), InterceptorChain::new()).await;
    let shared = app
        .create("default", "projects", project("Beach cleanup", &["shared"]))
        .await;
    let path = format!("/api/projects/{}", shared["id"]);

    let response = app
        .server
        .get(&path)
        .add_header(X_CHANNEL, channel_header("partner"))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["channel"], "default");

    let response = app
        .server
        .patch(&path)
        .add_header(X_CHANNEL, channel_header("partner"))
        .json(&json!({"published": false}))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["channel"], "default");
}

#[tokio::test]
async fn test_flow_does_not_cover_other_kinds() {
    let app = TestApp::with(shared_with_partner(), InterceptorChain::new()).await;
    app.create("default", "jobs", json!({"name": "Driver", "categories": ["shared"]}))
        .await;

    assert!(app.visible_names("partner", "jobs").await.is_empty());
}

#[tokio::test]
async fn test_list_filters_combine_with_visibility() {
    let app = TestApp::with(shared_with_partner(), InterceptorChain::new()).await;
    app.create("default", "projects", project("Beach cleanup", &["shared"])).await;
    app.create("partner", "projects", project("Food bank", &[])).await;
    app.create("other", "projects", project("Food bank", &[])).await;

    let response = app
        .server
        .get("/api/projects")
        .add_query_param("name", "Food bank")
        .add_header(X_CHANNEL, channel_header("partner"))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["total"], 1);
    assert_eq!(body["results"][0]["channel"], "partner");
}

// =============================================================================
// Pagination
// =============================================================================

#[tokio::test]
async fn test_page_size_is_clamped() {
    let config = ServerConfig {
        default_page_size: 2,
        max_page_size: 3,
        ..ServerConfig::for_testing()
    };
    let app =
        TestApp::with_config(config, ContentFlowManager::empty(), InterceptorChain::new()).await;
    for name in ["a", "b", "c", "d", "e"] {
        app.create("default", "projects", project(name, &[])).await;
    }

    let body: Value = app.list("default", "projects").await.json();
    assert_eq!(body["total"], 5);
    assert_eq!(body["count"], 2);

    let body: Value = app
        .server
        .get("/api/projects")
        .add_query_param("_count", "100")
        .await
        .json();
    assert_eq!(body["count"], 3);

    let body: Value = app
        .server
        .get("/api/projects")
        .add_query_param("_offset", "4")
        .await
        .json();
    assert_eq!(body["offset"], 4);
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn test_invalid_count_is_rejected() {
    let app = TestApp::new().await;

    app.server
        .get("/api/projects")
        .add_query_param("_count", "many")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
