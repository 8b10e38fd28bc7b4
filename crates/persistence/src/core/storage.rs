//! Storage traits for records and channels.
//!
//! [`RecordStorage`] persists channel-scoped records and [`ChannelStorage`]
//! persists channel metadata. Neither trait enforces the channel write
//! discipline on its own: callers go through
//! [`ChannelScope`](crate::scoped::ChannelScope) for writes and through the
//! [`ContentFlowManager`](crate::flow::ContentFlowManager) for reads.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::entity::{EntityKind, Record, RecordId};
use crate::error::StorageResult;
use crate::query::Query;
use crate::tenant::{Channel, ChannelSettings, ChannelSlug};

/// Storage for channel-scoped records.
///
/// # Channel Column
///
/// The owning channel is written exactly once, by [`insert`](Self::insert).
/// [`update`](Self::update) persists the field map only; implementations must
/// never write the channel on update.
///
/// # Example
///
/// ```ignore
/// use beacon_persistence::core::RecordStorage;
/// use beacon_persistence::entity::EntityKind;
/// use beacon_persistence::query::{Predicate, Query};
/// use beacon_persistence::tenant::ChannelSlug;
///
/// async fn example<S: RecordStorage>(storage: &S) -> StorageResult<()> {
///     let channel = ChannelSlug::new("partner");
///     let query = Query::for_kind(EntityKind::Project)
///         .filter(Predicate::channel_is(&channel));
///     for record in storage.query(&query).await? {
///         println!("{:?}", record.id());
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait RecordStorage: Send + Sync {
    /// Returns a human-readable name for this storage backend.
    fn backend_name(&self) -> &'static str;

    /// Inserts a new record owned by `channel`.
    ///
    /// # Returns
    ///
    /// The stored record with its assigned id and timestamps.
    async fn insert(
        &self,
        channel: &ChannelSlug,
        kind: EntityKind,
        fields: Map<String, Value>,
    ) -> StorageResult<Record>;

    /// Persists the fields of an existing record. The owning channel is
    /// preserved.
    ///
    /// # Errors
    ///
    /// * `StorageError::Resource(NotFound)` - If the record does not exist
    /// * `StorageError::Validation` - If the record has no id
    async fn update(&self, record: &Record) -> StorageResult<Record>;

    /// Reads a record by kind and id, regardless of channel.
    async fn get(&self, kind: EntityKind, id: RecordId) -> StorageResult<Option<Record>>;

    /// Runs a query. Results are ordered by id; distinct queries return each
    /// record at most once.
    async fn query(&self, query: &Query) -> StorageResult<Vec<Record>>;

    /// Counts the records a query selects, ignoring pagination.
    async fn count(&self, query: &Query) -> StorageResult<u64>;

    /// Deletes a record.
    ///
    /// # Errors
    ///
    /// * `StorageError::Resource(NotFound)` - If the record does not exist
    async fn delete(&self, kind: EntityKind, id: RecordId) -> StorageResult<()>;
}

/// Storage for channels and their settings.
///
/// Channel rows and setting rows are fetched separately; the
/// [`ChannelRegistry`](crate::registry::ChannelRegistry) combines the two and
/// caches the result.
#[async_trait]
pub trait ChannelStorage: Send + Sync {
    /// Inserts a new channel with its initial settings.
    ///
    /// # Errors
    ///
    /// * `StorageError::Resource(AlreadyExists)` - If the slug is taken
    async fn insert_channel(&self, channel: &Channel) -> StorageResult<()>;

    /// Reads a channel row. The returned channel carries no settings.
    async fn fetch_channel(&self, slug: &ChannelSlug) -> StorageResult<Option<Channel>>;

    /// Reads all setting rows of a channel.
    async fn fetch_settings(&self, slug: &ChannelSlug) -> StorageResult<ChannelSettings>;

    /// Replaces the values of one setting key.
    async fn put_setting(
        &self,
        slug: &ChannelSlug,
        key: &str,
        values: &[String],
    ) -> StorageResult<()>;

    /// Lists all channel rows, ordered by slug.
    async fn list_channels(&self) -> StorageResult<Vec<Channel>>;
}
