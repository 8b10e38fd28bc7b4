//! Field predicate semantics against real storage.
//!
//! Every test runs against each enabled backend, so both agree on which
//! records a predicate selects.

#[macro_use]
mod common;

use beacon_persistence::core::RecordStorage;
use beacon_persistence::entity::EntityKind;
use beacon_persistence::query::{Predicate, Query};
use serde_json::json;

fn projects(predicate: Predicate) -> Query {
    Query::for_kind(EntityKind::Project).filter(predicate)
}

backend_test!(numbers_compare_by_value, |ctx| {
    ctx.create("default", EntityKind::Project, json!({"organization_id": 4.0}))
        .await;
    ctx.create("default", EntityKind::Project, json!({"organization_id": 5}))
        .await;

    let integer = projects(Predicate::in_values("organization_id", vec![json!(4)]));
    assert_eq!(ctx.storage.count(&integer).await.unwrap(), 1);

    let float = projects(Predicate::eq("organization_id", json!(5.0)));
    assert_eq!(ctx.storage.count(&float).await.unwrap(), 1);

    let text = projects(Predicate::eq("organization_id", json!("4")));
    assert_eq!(ctx.storage.count(&text).await.unwrap(), 0);
});

backend_test!(object_fields_never_match, |ctx| {
    ctx.create("default", EntityKind::Project, json!({"meta": {"a": "shared"}}))
        .await;

    let query = projects(Predicate::contains("meta", json!("shared")));
    assert_eq!(ctx.storage.count(&query).await.unwrap(), 0);
});

backend_test!(array_fields_match_any_element, |ctx| {
    ctx.create("default", EntityKind::Project, json!({"categories": ["env", "shared"]}))
        .await;
    ctx.create("default", EntityKind::Project, json!({"categories": "shared"}))
        .await;
    ctx.create("default", EntityKind::Project, json!({"categories": [["shared"]]}))
        .await;
    ctx.create("default", EntityKind::Project, json!({"name": "No categories"}))
        .await;

    let query = projects(Predicate::contains("categories", json!("shared")));
    assert_eq!(ctx.storage.count(&query).await.unwrap(), 2);
});

backend_test!(booleans_and_null_match_by_type, |ctx| {
    ctx.create("default", EntityKind::Project, json!({"published": true, "closed_at": null}))
        .await;
    ctx.create("default", EntityKind::Project, json!({"published": 1}))
        .await;

    let published = projects(Predicate::eq("published", json!(true)));
    assert_eq!(ctx.storage.count(&published).await.unwrap(), 1);

    let closed = projects(Predicate::eq("closed_at", json!(null)));
    assert_eq!(ctx.storage.count(&closed).await.unwrap(), 1);
});
