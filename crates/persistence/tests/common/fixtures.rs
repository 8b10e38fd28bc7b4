//! Test fixtures.

use serde_json::{Map, Value, json};

/// Channels every test context starts with.
pub const SEEDED_CHANNELS: &[&str] = &["default", "partner", "other"];

/// Converts a JSON object literal into a field map.
pub fn fields(value: Value) -> Map<String, Value> {
    value
        .as_object()
        .cloned()
        .expect("fixture must be a JSON object")
}

/// A project tagged with the given categories.
pub fn project(name: &str, categories: &[&str]) -> Value {
    json!({
        "name": name,
        "published": true,
        "categories": categories,
    })
}

/// A project belonging to an organization.
pub fn organization_project(name: &str, organization_id: i64) -> Value {
    json!({
        "name": name,
        "published": true,
        "organization_id": organization_id,
        "categories": [],
    })
}
