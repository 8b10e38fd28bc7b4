//! Channel isolation and write-discipline tests.
//!
//! Every test runs against each enabled backend.

#[macro_use]
mod common;

use beacon_persistence::core::RecordStorage;
use beacon_persistence::entity::{EntityKind, Record};
use beacon_persistence::error::{StorageError, TenantError};
use beacon_persistence::flow::ContentFlowManager;
use beacon_persistence::query::{Predicate, Query};
use beacon_persistence::tenant::ChannelSlug;
use serde_json::json;

use common::{fields, project};

// ============================================================================
// Isolation
// ============================================================================

backend_test!(records_invisible_across_channels_without_flows, |ctx| {
    let flows = ContentFlowManager::empty();
    let mine = ctx
        .create("partner", EntityKind::Project, project("Mine", &["shared"]))
        .await;
    ctx.create("other", EntityKind::Project, project("Theirs", &["shared"]))
        .await;

    assert_eq!(
        ctx.visible_ids(&flows, "partner", EntityKind::Project).await,
        vec![mine.id().unwrap()]
    );
});

backend_test!(isolation_holds_for_every_kind, |ctx| {
    let flows = ContentFlowManager::empty();
    for kind in EntityKind::all() {
        ctx.create("other", *kind, json!({"name": "foreign"})).await;
        assert!(
            ctx.visible_ids(&flows, "partner", *kind).await.is_empty(),
            "{} leaked across channels",
            kind
        );
        assert_eq!(ctx.visible_ids(&flows, "other", *kind).await.len(), 1);
    }
});

backend_test!(base_predicate_still_applies, |ctx| {
    let flows = ContentFlowManager::empty();
    ctx.create("partner", EntityKind::Project, json!({"published": true}))
        .await;
    ctx.create("partner", EntityKind::Project, json!({"published": false}))
        .await;

    let base = Query::for_kind(EntityKind::Project)
        .filter(Predicate::eq("published", json!(true)));
    let query = flows.filter(&ChannelSlug::new("partner"), base, true);
    assert_eq!(ctx.storage.query(&query).await.unwrap().len(), 1);
});

// ============================================================================
// Write requires a channel
// ============================================================================

backend_test!(create_without_channel_fails, |ctx| {
    for kind in EntityKind::all() {
        let err = ctx
            .scope
            .create(*kind, fields(json!({"name": "x"})), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::Tenant(TenantError::NoTenantSupplied { .. })
        ));
    }
});

backend_test!(create_with_channel_field_fails, |ctx| {
    for kind in EntityKind::all() {
        let err = ctx
            .scope
            .create(
                *kind,
                fields(json!({"name": "x", "channel": "partner"})),
                Some("partner"),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::Tenant(TenantError::DirectTenantAssociation { .. })
        ));
    }
});

backend_test!(create_with_unknown_channel_fails, |ctx| {
    let err = ctx
        .scope
        .create(EntityKind::Project, fields(json!({})), Some("ghost"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::Tenant(TenantError::TenantNotFound { .. })
    ));
    assert_eq!(
        ctx.storage
            .count(&Query::for_kind(EntityKind::Project))
            .await
            .unwrap(),
        0
    );
});

// ============================================================================
// Channel immutability
// ============================================================================

backend_test!(save_with_other_channel_keeps_owner, |ctx| {
    let created = ctx
        .create("partner", EntityKind::Organization, json!({"name": "Org"}))
        .await;

    let mut changed = created.clone();
    changed
        .fields_mut()
        .insert("name".to_string(), json!("Renamed"));
    let saved = ctx.scope.save(changed, Some("other")).await.unwrap();
    assert_eq!(saved.channel().unwrap().as_str(), "partner");

    let reloaded = ctx
        .storage
        .get(EntityKind::Organization, created.id().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.channel().unwrap().as_str(), "partner");
    assert_eq!(reloaded.field("name"), Some(&json!("Renamed")));
});

backend_test!(patch_cannot_move_record, |ctx| {
    let created = ctx
        .create("partner", EntityKind::User, json!({"email": "a@example.org"}))
        .await;
    let id = created.id().unwrap();

    for key in ["channel", "channel_id", "tenant", "tenant_id"] {
        let err = ctx
            .scope
            .update_fields(EntityKind::User, id, &json!({ key: "other" }))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::Tenant(TenantError::DirectTenantAssociation { .. })
        ));
    }

    let reloaded: Record = ctx
        .storage
        .get(EntityKind::User, id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.channel().unwrap().as_str(), "partner");
});
