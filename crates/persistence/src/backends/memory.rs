//! In-memory backend.
//!
//! Keeps records and channels in process-local maps and evaluates predicates
//! with [`Predicate::matches`](crate::query::Predicate::matches). Useful for
//! tests and for running the server without a database file.
//!
//! # Example
//!
//! ```
//! use beacon_persistence::backends::memory::MemoryBackend;
//! use beacon_persistence::core::RecordStorage;
//!
//! let backend = MemoryBackend::new();
//! assert_eq!(backend.backend_name(), "memory");
//! assert_eq!(backend.query_count(), 0);
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::core::{Backend, BackendKind, ChannelStorage, RecordStorage};
use crate::entity::{EntityKind, Record, RecordId};
use crate::error::{BackendError, ResourceError, StorageResult, ValidationError};
use crate::query::Query;
use crate::tenant::{Channel, ChannelSettings, ChannelSlug};

/// Process-local storage backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: RwLock<BTreeMap<(EntityKind, RecordId), Record>>,
    channels: RwLock<BTreeMap<ChannelSlug, Channel>>,
    settings: RwLock<HashMap<ChannelSlug, ChannelSettings>>,
    next_id: AtomicI64,
    queries: AtomicU64,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of storage round trips served so far.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }

    fn tick(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    fn select(&self, query: &Query) -> Vec<Record> {
        let records = self.records.read();
        // Records are unique by (kind, id), so distinct queries need no
        // extra pass here.
        records
            .range((query.kind(), RecordId::new(i64::MIN))..=(query.kind(), RecordId::new(i64::MAX)))
            .map(|(_, record)| record)
            .filter(|record| query.matches(record))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        Ok(())
    }

    async fn initialize(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

#[async_trait]
impl RecordStorage for MemoryBackend {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn insert(
        &self,
        channel: &ChannelSlug,
        kind: EntityKind,
        fields: Map<String, Value>,
    ) -> StorageResult<Record> {
        self.tick();
        let id = RecordId::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let now = Utc::now();
        let record = Record::from_storage(kind, id, channel.clone(), fields, now, now);
        self.records.write().insert((kind, id), record.clone());
        Ok(record)
    }

    async fn update(&self, record: &Record) -> StorageResult<Record> {
        self.tick();
        let id = record.id().ok_or_else(|| ValidationError::InvalidRecord {
            message: "cannot update a record that has not been created".to_string(),
        })?;

        let mut records = self.records.write();
        let stored = records
            .get_mut(&(record.kind(), id))
            .ok_or(ResourceError::NotFound {
                kind: record.kind(),
                id,
            })?;

        let (Some(channel), Some(created_at)) = (stored.channel().cloned(), stored.created_at())
        else {
            return Err(BackendError::Internal {
                backend_name: "memory".to_string(),
                message: format!("stored record {}/{} lost its identity", record.kind(), id),
                source: None,
            }
            .into());
        };

        let updated = Record::from_storage(
            record.kind(),
            id,
            channel,
            record.fields().clone(),
            created_at,
            Utc::now(),
        );
        *stored = updated.clone();
        Ok(updated)
    }

    async fn get(&self, kind: EntityKind, id: RecordId) -> StorageResult<Option<Record>> {
        self.tick();
        Ok(self.records.read().get(&(kind, id)).cloned())
    }

    async fn query(&self, query: &Query) -> StorageResult<Vec<Record>> {
        self.tick();
        let selected = self.select(query);
        let page = selected
            .into_iter()
            .skip(query.offset())
            .take(query.limit().unwrap_or(usize::MAX))
            .collect();
        Ok(page)
    }

    async fn count(&self, query: &Query) -> StorageResult<u64> {
        self.tick();
        Ok(self.select(query).len() as u64)
    }

    async fn delete(&self, kind: EntityKind, id: RecordId) -> StorageResult<()> {
        self.tick();
        match self.records.write().remove(&(kind, id)) {
            Some(_) => Ok(()),
            None => Err(ResourceError::NotFound { kind, id }.into()),
        }
    }
}

#[async_trait]
impl ChannelStorage for MemoryBackend {
    async fn insert_channel(&self, channel: &Channel) -> StorageResult<()> {
        self.tick();
        let mut channels = self.channels.write();
        if channels.contains_key(channel.slug()) {
            return Err(ResourceError::AlreadyExists {
                what: format!("channel {}", channel.slug()),
            }
            .into());
        }
        channels.insert(
            channel.slug().clone(),
            channel.clone().with_settings(ChannelSettings::new()),
        );
        let settings = channel
            .settings()
            .iter()
            .map(|(key, values)| (key.to_string(), values.to_vec()))
            .collect();
        self.settings.write().insert(channel.slug().clone(), settings);
        Ok(())
    }

    async fn fetch_channel(&self, slug: &ChannelSlug) -> StorageResult<Option<Channel>> {
        self.tick();
        Ok(self.channels.read().get(slug).cloned())
    }

    async fn fetch_settings(&self, slug: &ChannelSlug) -> StorageResult<ChannelSettings> {
        self.tick();
        Ok(self.settings.read().get(slug).cloned().unwrap_or_default())
    }

    async fn put_setting(
        &self,
        slug: &ChannelSlug,
        key: &str,
        values: &[String],
    ) -> StorageResult<()> {
        self.tick();
        self.settings
            .write()
            .entry(slug.clone())
            .or_default()
            .insert(key, values.to_vec());
        Ok(())
    }

    async fn list_channels(&self) -> StorageResult<Vec<Channel>> {
        self.tick();
        Ok(self.channels.read().values().cloned().collect())
    }
}
