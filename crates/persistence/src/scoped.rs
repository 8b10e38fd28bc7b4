//! The channel write discipline.
//!
//! Every channel-scoped record is written through [`ChannelScope`], the one
//! place that decides which channel owns a record:
//!
//! - the channel is passed as a separate parameter, never inside the field
//!   map ([`TenantError::DirectTenantAssociation`] otherwise);
//! - creating a record requires a channel
//!   ([`TenantError::NoTenantSupplied`]) that resolves to a registered one
//!   ([`TenantError::TenantNotFound`]);
//! - once a record exists its channel is fixed. Saving it again ignores any
//!   channel parameter and storage backends never rewrite the channel.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use beacon_persistence::backends::memory::MemoryBackend;
//! use beacon_persistence::entity::EntityKind;
//! use beacon_persistence::registry::ChannelRegistry;
//! use beacon_persistence::scoped::ChannelScope;
//! use beacon_persistence::tenant::{Channel, ChannelSlug};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let storage = Arc::new(MemoryBackend::new());
//! let registry = Arc::new(ChannelRegistry::new(Arc::clone(&storage)));
//! registry
//!     .create_channel(Channel::new(ChannelSlug::default_channel(), "Default"))
//!     .await
//!     .unwrap();
//!
//! let scope = ChannelScope::new(storage, registry);
//! let fields = json!({"name": "Beach cleanup"}).as_object().cloned().unwrap();
//! let record = scope
//!     .create(EntityKind::Project, fields, Some("default"))
//!     .await
//!     .unwrap();
//! assert_eq!(record.channel().unwrap().as_str(), "default");
//! # });
//! ```

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::core::{ChannelStorage, RecordStorage};
use crate::entity::{EntityKind, Record, RecordId, find_reserved_field};
use crate::error::{ResourceError, StorageResult, TenantError, ValidationError};
use crate::registry::ChannelRegistry;
use crate::tenant::ChannelSlug;

/// Writes channel-scoped records on behalf of every entity kind.
#[derive(Debug)]
pub struct ChannelScope<S> {
    storage: Arc<S>,
    registry: Arc<ChannelRegistry<S>>,
}

impl<S> Clone for ChannelScope<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            registry: Arc::clone(&self.registry),
        }
    }
}

/// Rejects field maps that carry a channel association.
fn reject_reserved(kind: EntityKind, fields: &Map<String, Value>) -> StorageResult<()> {
    match find_reserved_field(fields) {
        Some(field) => Err(TenantError::DirectTenantAssociation {
            kind,
            field: field.to_string(),
        }
        .into()),
        None => Ok(()),
    }
}

impl<S> ChannelScope<S>
where
    S: RecordStorage + ChannelStorage,
{
    /// Creates the policy over a storage backend and its channel registry.
    pub fn new(storage: Arc<S>, registry: Arc<ChannelRegistry<S>>) -> Self {
        Self { storage, registry }
    }

    /// Returns the channel registry.
    pub fn registry(&self) -> &Arc<ChannelRegistry<S>> {
        &self.registry
    }

    /// Returns the underlying storage.
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Creates a record owned by `channel`.
    ///
    /// # Arguments
    ///
    /// * `kind` - The entity kind
    /// * `fields` - The record's fields; must not name a channel
    /// * `channel` - Slug of the owning channel
    ///
    /// # Errors
    ///
    /// * `StorageError::Tenant(DirectTenantAssociation)` - If `fields` holds a
    ///   reserved channel key
    /// * `StorageError::Tenant(NoTenantSupplied)` - If `channel` is absent or
    ///   empty
    /// * `StorageError::Tenant(TenantNotFound)` - If `channel` is not a
    ///   registered channel
    pub async fn create(
        &self,
        kind: EntityKind,
        fields: Map<String, Value>,
        channel: Option<&str>,
    ) -> StorageResult<Record> {
        reject_reserved(kind, &fields)?;

        let slug = match channel.map(str::trim) {
            None | Some("") => return Err(TenantError::NoTenantSupplied { kind }.into()),
            Some(slug) => slug,
        };
        let slug = ChannelSlug::parse(slug).map_err(|_| TenantError::TenantNotFound {
            slug: slug.to_string(),
        })?;
        let owner = self.registry.require_channel(&slug).await?;

        let record = self.storage.insert(owner.slug(), kind, fields).await?;
        debug!(
            kind = %kind,
            id = ?record.id(),
            channel = %owner.slug(),
            "record created"
        );
        Ok(record)
    }

    /// Persists a record.
    ///
    /// A new record is created under `channel`. An existing record keeps the
    /// channel it was created under; `channel` is ignored for it.
    pub async fn save(&self, record: Record, channel: Option<&str>) -> StorageResult<Record> {
        if record.is_new() {
            return self
                .create(record.kind(), record.fields().clone(), channel)
                .await;
        }

        reject_reserved(record.kind(), record.fields())?;

        if let Some(requested) = channel.map(str::trim).filter(|s| !s.is_empty())
            && record.channel().map(ChannelSlug::as_str) != Some(requested)
        {
            warn!(
                kind = %record.kind(),
                id = ?record.id(),
                owner = ?record.channel(),
                requested,
                "ignoring channel change on existing record"
            );
        }

        self.storage.update(&record).await
    }

    /// Loads a record, applies a JSON merge patch to its fields and saves it.
    ///
    /// The patch is subject to the same rules as any other write: it cannot
    /// introduce a channel field.
    ///
    /// # Errors
    ///
    /// * `StorageError::Resource(NotFound)` - If the record does not exist
    /// * `StorageError::Validation(InvalidRecord)` - If the patch is not an object
    pub async fn update_fields(
        &self,
        kind: EntityKind,
        id: RecordId,
        patch: &Value,
    ) -> StorageResult<Record> {
        if !patch.is_object() {
            return Err(ValidationError::InvalidRecord {
                message: "patch must be a JSON object".to_string(),
            }
            .into());
        }

        let mut record = self
            .storage
            .get(kind, id)
            .await?
            .ok_or(ResourceError::NotFound { kind, id })?;

        let mut merged = Value::Object(std::mem::take(record.fields_mut()));
        json_patch::merge(&mut merged, patch);
        if let Value::Object(fields) = merged {
            *record.fields_mut() = fields;
        }

        self.save(record, None).await
    }
}
