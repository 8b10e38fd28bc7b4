//! Backend-agnostic test context.

use std::sync::Arc;

use beacon_persistence::backends::memory::MemoryBackend;
use beacon_persistence::core::{ChannelStorage, RecordStorage};
use beacon_persistence::entity::{EntityKind, Record, RecordId};
use beacon_persistence::flow::ContentFlowManager;
use beacon_persistence::query::Query;
use beacon_persistence::registry::ChannelRegistry;
use beacon_persistence::scoped::ChannelScope;
use beacon_persistence::tenant::{Channel, ChannelSlug};
use serde_json::Value;

use super::fixtures::{SEEDED_CHANNELS, fields};

/// Exposes a backend's storage round-trip counter to generic tests.
pub trait CountsQueries {
    fn queries(&self) -> u64;
}

impl CountsQueries for MemoryBackend {
    fn queries(&self) -> u64 {
        self.query_count()
    }
}

#[cfg(feature = "sqlite")]
impl CountsQueries for beacon_persistence::backends::sqlite::SqliteBackend {
    fn queries(&self) -> u64 {
        self.query_count()
    }
}

/// A backend with the seeded channels, its registry and the write policy.
pub struct TestContext<S> {
    pub storage: Arc<S>,
    pub registry: Arc<ChannelRegistry<S>>,
    pub scope: ChannelScope<S>,
}

impl<S> TestContext<S>
where
    S: RecordStorage + ChannelStorage + CountsQueries,
{
    /// Wraps a backend and creates the channels in [`SEEDED_CHANNELS`].
    pub async fn new(backend: S) -> Self {
        let storage = Arc::new(backend);
        let registry = Arc::new(ChannelRegistry::new(Arc::clone(&storage)));
        for slug in SEEDED_CHANNELS {
            registry
                .create_channel(Channel::new(ChannelSlug::new(*slug), *slug))
                .await
                .expect("Failed to seed channel");
        }
        let scope = ChannelScope::new(Arc::clone(&storage), Arc::clone(&registry));
        Self {
            storage,
            registry,
            scope,
        }
    }

    /// Creates a record under `channel`, panicking on failure.
    pub async fn create(&self, channel: &str, kind: EntityKind, value: Value) -> Record {
        self.scope
            .create(kind, fields(value), Some(channel))
            .await
            .expect("Failed to create record")
    }

    /// Returns the ids of `kind` records visible under `channel`, in order.
    pub async fn visible_ids(
        &self,
        flows: &ContentFlowManager,
        channel: &str,
        kind: EntityKind,
    ) -> Vec<RecordId> {
        let query = flows.filter(&ChannelSlug::new(channel), Query::for_kind(kind), true);
        self.storage
            .query(&query)
            .await
            .expect("Failed to run query")
            .iter()
            .filter_map(Record::id)
            .collect()
    }

    /// Returns the backend's storage round-trip counter.
    pub fn queries(&self) -> u64 {
        self.storage.queries()
    }
}
