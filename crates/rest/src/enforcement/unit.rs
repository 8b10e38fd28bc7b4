//! Resource units and their channel-enforcing wrapper.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Method;
use beacon_persistence::core::{ChannelStorage, RecordStorage};
use beacon_persistence::entity::{EntityKind, Record, RecordId};
use beacon_persistence::flow::ContentFlowManager;
use beacon_persistence::query::{Predicate, Query};
use beacon_persistence::scoped::ChannelScope;
use beacon_persistence::tenant::ChannelSlug;
use serde_json::{Map, Value, json};

use super::ApiResponse;
use crate::error::{RestError, RestResult};
use crate::extractors::ListParams;

/// Serves list/retrieve/create/update/delete for one entity kind.
///
/// Reads go through two query accessors. [`declared_query`] is the static
/// query over the kind; [`base_query`] is the query for one list request.
/// Instance operations look records up through `declared_query`, lists run
/// `base_query`, so wrapping both accessors is enough to confine every read.
///
/// [`declared_query`]: ResourceUnit::declared_query
/// [`base_query`]: ResourceUnit::base_query
#[async_trait]
pub trait ResourceUnit: Send + Sync {
    /// The entity kind served.
    fn kind(&self) -> EntityKind;

    /// The static query over every record this unit may serve.
    fn declared_query(&self) -> Query {
        Query::for_kind(self.kind())
    }

    /// The query for a list request.
    fn base_query(&self, params: &ListParams) -> Query {
        params.apply(self.declared_query())
    }

    /// Runs a read query.
    async fn list(&self, query: &Query) -> RestResult<Vec<Record>>;

    /// Counts the records a read query selects, ignoring pagination.
    async fn count(&self, query: &Query) -> RestResult<u64>;

    /// Creates a record owned by `channel`.
    async fn create(&self, fields: Map<String, Value>, channel: &ChannelSlug)
    -> RestResult<Record>;

    /// Merges `patch` into an existing record.
    async fn update(&self, record: Record, patch: &Value) -> RestResult<Record>;

    /// Deletes an existing record.
    async fn delete(&self, record: Record) -> RestResult<()>;

    /// Finds record `id` among those [`declared_query`](Self::declared_query)
    /// selects.
    ///
    /// # Errors
    ///
    /// * `RestError::NotFound` - If the record does not exist or is not
    ///   selected
    async fn retrieve(&self, id: RecordId) -> RestResult<Record> {
        let query = self
            .declared_query()
            .filter(Predicate::ids_in([id]))
            .paginate(Some(1), 0);
        self.list(&query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RestError::NotFound {
                kind: self.kind().to_string(),
                id: id.to_string(),
            })
    }
}

/// The unit serving any entity kind straight from storage.
///
/// Writes go through the [`ChannelScope`] so the channel discipline applies.
#[derive(Debug)]
pub struct RecordUnit<S> {
    kind: EntityKind,
    scope: ChannelScope<S>,
}

impl<S> RecordUnit<S>
where
    S: RecordStorage + ChannelStorage,
{
    /// Creates a unit for `kind`.
    pub fn new(kind: EntityKind, scope: ChannelScope<S>) -> Self {
        Self { kind, scope }
    }
}

#[async_trait]
impl<S> ResourceUnit for RecordUnit<S>
where
    S: RecordStorage + ChannelStorage + 'static,
{
    fn kind(&self) -> EntityKind {
        self.kind
    }

    async fn list(&self, query: &Query) -> RestResult<Vec<Record>> {
        Ok(self.scope.storage().query(query).await?)
    }

    async fn count(&self, query: &Query) -> RestResult<u64> {
        Ok(self.scope.storage().count(query).await?)
    }

    async fn create(
        &self,
        fields: Map<String, Value>,
        channel: &ChannelSlug,
    ) -> RestResult<Record> {
        Ok(self
            .scope
            .create(self.kind, fields, Some(channel.as_str()))
            .await?)
    }

    async fn update(&self, record: Record, patch: &Value) -> RestResult<Record> {
        let id = record_id(&record)?;
        Ok(self.scope.update_fields(self.kind, id, patch).await?)
    }

    async fn delete(&self, record: Record) -> RestResult<()> {
        let id = record_id(&record)?;
        Ok(self.scope.storage().delete(self.kind, id).await?)
    }
}

fn record_id(record: &Record) -> RestResult<RecordId> {
    record.id().ok_or_else(|| RestError::BadRequest {
        message: "record has not been saved".to_string(),
    })
}

/// Confines a unit to what one channel may see.
///
/// Both query accessors are passed through
/// [`ContentFlowManager::filter`] with `distinct = true`. Everything else is
/// delegated unchanged.
#[derive(Debug)]
pub struct Scoped<U> {
    unit: U,
    flows: Arc<ContentFlowManager>,
    channel: ChannelSlug,
}

impl<U: ResourceUnit> Scoped<U> {
    /// Wraps `unit` for requests under `channel`.
    pub fn new(unit: U, flows: Arc<ContentFlowManager>, channel: ChannelSlug) -> Self {
        Self {
            unit,
            flows,
            channel,
        }
    }

    /// Returns the channel the unit is confined to.
    pub fn channel(&self) -> &ChannelSlug {
        &self.channel
    }
}

#[async_trait]
impl<U: ResourceUnit> ResourceUnit for Scoped<U> {
    fn kind(&self) -> EntityKind {
        self.unit.kind()
    }

    fn declared_query(&self) -> Query {
        self.flows
            .filter(&self.channel, self.unit.declared_query(), true)
    }

    fn base_query(&self, params: &ListParams) -> Query {
        self.flows
            .filter(&self.channel, self.unit.base_query(params), true)
    }

    async fn list(&self, query: &Query) -> RestResult<Vec<Record>> {
        self.unit.list(query).await
    }

    async fn count(&self, query: &Query) -> RestResult<u64> {
        self.unit.count(query).await
    }

    async fn create(
        &self,
        fields: Map<String, Value>,
        channel: &ChannelSlug,
    ) -> RestResult<Record> {
        self.unit.create(fields, channel).await
    }

    async fn update(&self, record: Record, patch: &Value) -> RestResult<Record> {
        self.unit.update(record, patch).await
    }

    async fn delete(&self, record: Record) -> RestResult<()> {
        self.unit.delete(record).await
    }
}

/// An operation on a resource unit.
#[derive(Debug, Clone)]
pub enum Operation {
    /// List records.
    List(ListParams),
    /// Read one record.
    Retrieve(RecordId),
    /// Create a record under the request channel.
    Create(Map<String, Value>),
    /// Merge a patch into a record.
    Update(RecordId, Value),
    /// Delete a record.
    Delete(RecordId),
}

impl Operation {
    /// The HTTP method that requests this operation.
    pub fn method(&self) -> Method {
        match self {
            Operation::List(_) | Operation::Retrieve(_) => Method::GET,
            Operation::Create(_) => Method::POST,
            Operation::Update(..) => Method::PATCH,
            Operation::Delete(_) => Method::DELETE,
        }
    }

    /// The addressed record, for instance-level operations.
    pub fn id(&self) -> Option<RecordId> {
        match self {
            Operation::Retrieve(id) | Operation::Update(id, _) | Operation::Delete(id) => {
                Some(*id)
            }
            Operation::List(_) | Operation::Create(_) => None,
        }
    }
}

/// Performs `operation` on `unit` for a request under `channel`.
///
/// Update and delete first retrieve the record, so they can only touch
/// records the unit's queries select.
pub async fn perform<U>(
    unit: &U,
    channel: &ChannelSlug,
    operation: Operation,
) -> RestResult<ApiResponse>
where
    U: ResourceUnit + ?Sized,
{
    match operation {
        Operation::List(params) => {
            let query = unit.base_query(&params);
            let total = unit.count(&query).await?;
            let records = unit.list(&query).await?;
            Ok(ApiResponse::ok(json!({
                "kind": unit.kind().as_str(),
                "total": total,
                "offset": params.offset(),
                "count": records.len(),
                "results": records.iter().map(Record::to_json).collect::<Vec<_>>(),
            })))
        }
        Operation::Retrieve(id) => {
            let record = unit.retrieve(id).await?;
            Ok(ApiResponse::ok(record.to_json()))
        }
        Operation::Create(fields) => {
            let record = unit.create(fields, channel).await?;
            Ok(ApiResponse::created(record.to_json()))
        }
        Operation::Update(id, patch) => {
            let record = unit.retrieve(id).await?;
            let updated = unit.update(record, &patch).await?;
            Ok(ApiResponse::ok(updated.to_json()))
        }
        Operation::Delete(id) => {
            let record = unit.retrieve(id).await?;
            unit.delete(record).await?;
            Ok(ApiResponse::no_content())
        }
    }
}
