//! RecordStorage and ChannelStorage implementations for SQLite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params, params_from_iter};
use serde_json::{Map, Value};

use crate::core::{ChannelStorage, RecordStorage};
use crate::entity::{EntityKind, Record, RecordId};
use crate::error::{BackendError, ResourceError, StorageError, StorageResult, ValidationError};
use crate::query::Query;
use crate::tenant::{Channel, ChannelSettings, ChannelSlug};

use super::SqliteBackend;
use super::sql;

fn internal_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::Internal {
        backend_name: "sqlite".to_string(),
        message,
        source: None,
    })
}

fn serialization_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::SerializationError { message })
}

fn parse_timestamp(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| serialization_error(format!("Invalid timestamp '{}': {}", value, e)))
}

/// A record row as read from the `records` table.
struct RecordRow {
    id: i64,
    kind: String,
    channel: String,
    data: String,
    created_at: String,
    updated_at: String,
}

impl RecordRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            kind: row.get(1)?,
            channel: row.get(2)?,
            data: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn into_record(self) -> StorageResult<Record> {
        let kind: EntityKind = self.kind.parse()?;
        let fields: Map<String, Value> = serde_json::from_str(&self.data)
            .map_err(|e| serialization_error(format!("Failed to deserialize record: {}", e)))?;
        Ok(Record::from_storage(
            kind,
            RecordId::new(self.id),
            ChannelSlug::new(self.channel),
            fields,
            parse_timestamp(&self.created_at)?,
            parse_timestamp(&self.updated_at)?,
        ))
    }
}

#[async_trait]
impl RecordStorage for SqliteBackend {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn insert(
        &self,
        channel: &ChannelSlug,
        kind: EntityKind,
        fields: Map<String, Value>,
    ) -> StorageResult<Record> {
        self.tick();
        let conn = self.get_connection()?;

        let data = serde_json::to_string(&fields)
            .map_err(|e| serialization_error(format!("Failed to serialize record: {}", e)))?;
        let now = Utc::now();
        let timestamp = now.to_rfc3339();

        conn.execute(
            "INSERT INTO records (kind, channel, data, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![kind.as_str(), channel.as_str(), data, timestamp],
        )
        .map_err(|e| internal_error(format!("Failed to insert record: {}", e)))?;

        let id = RecordId::new(conn.last_insert_rowid());
        Ok(Record::from_storage(kind, id, channel.clone(), fields, now, now))
    }

    async fn update(&self, record: &Record) -> StorageResult<Record> {
        self.tick();
        let id = record.id().ok_or_else(|| ValidationError::InvalidRecord {
            message: "cannot update a record that has not been created".to_string(),
        })?;
        let conn = self.get_connection()?;

        let data = serde_json::to_string(record.fields())
            .map_err(|e| serialization_error(format!("Failed to serialize record: {}", e)))?;
        let now = Utc::now().to_rfc3339();

        // Never writes the channel column.
        let changed = conn
            .execute(
                "UPDATE records SET data = ?1, updated_at = ?2 WHERE kind = ?3 AND id = ?4",
                params![data, now, record.kind().as_str(), id.get()],
            )
            .map_err(|e| internal_error(format!("Failed to update record: {}", e)))?;

        if changed == 0 {
            return Err(ResourceError::NotFound {
                kind: record.kind(),
                id,
            }
            .into());
        }

        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM records r WHERE r.kind = ?1 AND r.id = ?2",
                    sql::RECORD_COLUMNS
                ),
                params![record.kind().as_str(), id.get()],
                RecordRow::from_row,
            )
            .map_err(|e| internal_error(format!("Failed to read updated record: {}", e)))?;
        row.into_record()
    }

    async fn get(&self, kind: EntityKind, id: RecordId) -> StorageResult<Option<Record>> {
        self.tick();
        let conn = self.get_connection()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM records r WHERE r.kind = ?1 AND r.id = ?2",
                    sql::RECORD_COLUMNS
                ),
                params![kind.as_str(), id.get()],
                RecordRow::from_row,
            )
            .optional()
            .map_err(|e| internal_error(format!("Failed to read record: {}", e)))?;
        row.map(RecordRow::into_record).transpose()
    }

    async fn query(&self, query: &Query) -> StorageResult<Vec<Record>> {
        self.tick();
        let fragment = sql::render_select(query)?;
        tracing::trace!(sql = %fragment.sql, params = fragment.params.len(), "sqlite query");

        let conn = self.get_connection()?;
        let mut stmt = conn
            .prepare(&fragment.sql)
            .map_err(|e| internal_error(format!("Failed to prepare query: {}", e)))?;
        let rows = stmt
            .query_map(params_from_iter(fragment.params.iter()), RecordRow::from_row)
            .map_err(|e| internal_error(format!("Failed to run query: {}", e)))?;

        let mut records = Vec::new();
        for row in rows {
            let row = row.map_err(|e| internal_error(format!("Failed to read row: {}", e)))?;
            records.push(row.into_record()?);
        }
        Ok(records)
    }

    async fn count(&self, query: &Query) -> StorageResult<u64> {
        self.tick();
        let fragment = sql::render_count(query)?;
        let conn = self.get_connection()?;
        let count: i64 = conn
            .query_row(&fragment.sql, params_from_iter(fragment.params.iter()), |row| {
                row.get(0)
            })
            .map_err(|e| internal_error(format!("Failed to count records: {}", e)))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn delete(&self, kind: EntityKind, id: RecordId) -> StorageResult<()> {
        self.tick();
        let conn = self.get_connection()?;
        let changed = conn
            .execute(
                "DELETE FROM records WHERE kind = ?1 AND id = ?2",
                params![kind.as_str(), id.get()],
            )
            .map_err(|e| internal_error(format!("Failed to delete record: {}", e)))?;
        if changed == 0 {
            return Err(ResourceError::NotFound { kind, id }.into());
        }
        Ok(())
    }
}

#[async_trait]
impl ChannelStorage for SqliteBackend {
    async fn insert_channel(&self, channel: &Channel) -> StorageResult<()> {
        self.tick();
        let mut conn = self.get_connection()?;
        let tx = conn
            .transaction()
            .map_err(|e| internal_error(format!("Failed to begin transaction: {}", e)))?;

        let exists = tx
            .query_row(
                "SELECT 1 FROM channels WHERE slug = ?1",
                params![channel.slug().as_str()],
                |_| Ok(()),
            )
            .optional()
            .map_err(|e| internal_error(format!("Failed to check channel: {}", e)))?
            .is_some();
        if exists {
            return Err(ResourceError::AlreadyExists {
                what: format!("channel {}", channel.slug()),
            }
            .into());
        }

        tx.execute(
            "INSERT INTO channels (slug, name, created_at) VALUES (?1, ?2, ?3)",
            params![
                channel.slug().as_str(),
                channel.name(),
                channel.created_at().to_rfc3339()
            ],
        )
        .map_err(|e| internal_error(format!("Failed to insert channel: {}", e)))?;

        for (key, values) in channel.settings().iter() {
            for (position, value) in values.iter().enumerate() {
                tx.execute(
                    "INSERT INTO channel_settings (channel, key, position, value)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![channel.slug().as_str(), key, position as i64, value],
                )
                .map_err(|e| internal_error(format!("Failed to insert setting: {}", e)))?;
            }
        }

        tx.commit()
            .map_err(|e| internal_error(format!("Failed to commit channel: {}", e)))
    }

    async fn fetch_channel(&self, slug: &ChannelSlug) -> StorageResult<Option<Channel>> {
        self.tick();
        let conn = self.get_connection()?;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT name, created_at FROM channels WHERE slug = ?1",
                params![slug.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| internal_error(format!("Failed to read channel: {}", e)))?;

        match row {
            Some((name, created_at)) => Ok(Some(Channel::from_storage(
                slug.clone(),
                name,
                parse_timestamp(&created_at)?,
                ChannelSettings::new(),
            ))),
            None => Ok(None),
        }
    }

    async fn fetch_settings(&self, slug: &ChannelSlug) -> StorageResult<ChannelSettings> {
        self.tick();
        let conn = self.get_connection()?;
        let mut stmt = conn
            .prepare(
                "SELECT key, value FROM channel_settings
                 WHERE channel = ?1 ORDER BY key, position",
            )
            .map_err(|e| internal_error(format!("Failed to prepare settings query: {}", e)))?;
        let rows = stmt
            .query_map(params![slug.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| internal_error(format!("Failed to read settings: {}", e)))?;

        let mut settings = ChannelSettings::new();
        for row in rows {
            let (key, value) =
                row.map_err(|e| internal_error(format!("Failed to read setting row: {}", e)))?;
            settings.push(key, value);
        }
        Ok(settings)
    }

    async fn put_setting(
        &self,
        slug: &ChannelSlug,
        key: &str,
        values: &[String],
    ) -> StorageResult<()> {
        self.tick();
        let mut conn = self.get_connection()?;
        let tx = conn
            .transaction()
            .map_err(|e| internal_error(format!("Failed to begin transaction: {}", e)))?;

        tx.execute(
            "DELETE FROM channel_settings WHERE channel = ?1 AND key = ?2",
            params![slug.as_str(), key],
        )
        .map_err(|e| internal_error(format!("Failed to clear setting: {}", e)))?;

        for (position, value) in values.iter().enumerate() {
            tx.execute(
                "INSERT INTO channel_settings (channel, key, position, value)
                 VALUES (?1, ?2, ?3, ?4)",
                params![slug.as_str(), key, position as i64, value],
            )
            .map_err(|e| internal_error(format!("Failed to write setting: {}", e)))?;
        }

        tx.commit()
            .map_err(|e| internal_error(format!("Failed to commit setting: {}", e)))
    }

    async fn list_channels(&self) -> StorageResult<Vec<Channel>> {
        self.tick();
        let conn = self.get_connection()?;
        let mut stmt = conn
            .prepare("SELECT slug, name, created_at FROM channels ORDER BY slug")
            .map_err(|e| internal_error(format!("Failed to prepare channel list: {}", e)))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(|e| internal_error(format!("Failed to list channels: {}", e)))?;

        let mut channels = Vec::new();
        for row in rows {
            let (slug, name, created_at) =
                row.map_err(|e| internal_error(format!("Failed to read channel row: {}", e)))?;
            channels.push(Channel::from_storage(
                ChannelSlug::new(slug),
                name,
                parse_timestamp(&created_at)?,
                ChannelSettings::new(),
            ));
        }
        Ok(channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Predicate;
    use serde_json::json;

    fn create_test_backend() -> SqliteBackend {
        let backend = SqliteBackend::in_memory().unwrap();
        backend.init_schema().unwrap();
        backend
    }

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    async fn with_channels(backend: &SqliteBackend, slugs: &[&str]) {
        for slug in slugs {
            backend
                .insert_channel(&Channel::new(ChannelSlug::new(*slug), *slug))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let backend = create_test_backend();
        with_channels(&backend, &["default"]).await;

        let stored = backend
            .insert(
                &ChannelSlug::default_channel(),
                EntityKind::Project,
                fields(json!({"name": "Beach cleanup", "categories": ["shared"]})),
            )
            .await
            .unwrap();
        let id = stored.id().unwrap();

        let read = backend.get(EntityKind::Project, id).await.unwrap().unwrap();
        assert_eq!(read.channel().unwrap().as_str(), "default");
        assert_eq!(read.field("name"), Some(&json!("Beach cleanup")));

        assert!(backend.get(EntityKind::User, id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_unknown_channel_violates_foreign_key() {
        let backend = create_test_backend();
        let result = backend
            .insert(&ChannelSlug::new("ghost"), EntityKind::Project, Map::new())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_update_never_writes_channel() {
        let backend = create_test_backend();
        with_channels(&backend, &["default", "partner"]).await;

        let stored = backend
            .insert(
                &ChannelSlug::new("partner"),
                EntityKind::Organization,
                fields(json!({"name": "Org"})),
            )
            .await
            .unwrap();

        let mut changed = stored.clone();
        changed.fields_mut().insert("name".to_string(), json!("Renamed"));
        let updated = backend.update(&changed).await.unwrap();

        assert_eq!(updated.channel().unwrap().as_str(), "partner");
        assert_eq!(updated.field("name"), Some(&json!("Renamed")));
    }

    #[tokio::test]
    async fn test_query_array_membership() {
        let backend = create_test_backend();
        with_channels(&backend, &["default"]).await;
        let channel = ChannelSlug::default_channel();

        backend
            .insert(&channel, EntityKind::Project, fields(json!({"categories": ["shared", "env"]})))
            .await
            .unwrap();
        backend
            .insert(&channel, EntityKind::Project, fields(json!({"categories": ["env"]})))
            .await
            .unwrap();
        backend
            .insert(&channel, EntityKind::Project, fields(json!({"categories": "shared"})))
            .await
            .unwrap();

        let query = Query::for_kind(EntityKind::Project)
            .filter(Predicate::contains("categories", json!("shared")));
        let results = backend.query(&query).await.unwrap();
        let ids: Vec<i64> = results.iter().filter_map(|r| r.id()).map(RecordId::get).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(backend.count(&query).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_query_scalar_types() {
        let backend = create_test_backend();
        with_channels(&backend, &["default"]).await;
        let channel = ChannelSlug::default_channel();

        backend
            .insert(
                &channel,
                EntityKind::Project,
                fields(json!({"published": true, "organization_id": 7, "name": "7"})),
            )
            .await
            .unwrap();

        let by_bool = Query::for_kind(EntityKind::Project)
            .filter(Predicate::eq("published", json!(true)));
        assert_eq!(backend.count(&by_bool).await.unwrap(), 1);

        let by_int = Query::for_kind(EntityKind::Project)
            .filter(Predicate::in_values("organization_id", vec![json!(3), json!(7)]));
        assert_eq!(backend.count(&by_int).await.unwrap(), 1);

        // A string never equals a number.
        let mismatched = Query::for_kind(EntityKind::Project)
            .filter(Predicate::eq("name", json!(7)));
        assert_eq!(backend.count(&mismatched).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_query_or_across_channels_is_distinct() {
        let backend = create_test_backend();
        with_channels(&backend, &["default", "partner"]).await;

        backend
            .insert(&ChannelSlug::new("partner"), EntityKind::Project, fields(json!({"categories": ["shared"]})))
            .await
            .unwrap();
        backend
            .insert(&ChannelSlug::default_channel(), EntityKind::Project, fields(json!({"categories": ["shared"]})))
            .await
            .unwrap();

        let query = Query::for_kind(EntityKind::Project)
            .filter(Predicate::or([
                Predicate::channel_is(&ChannelSlug::new("partner")),
                Predicate::contains("categories", json!("shared")),
            ]))
            .with_distinct(true);
        assert_eq!(backend.query(&query).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete() {
        let backend = create_test_backend();
        with_channels(&backend, &["default"]).await;
        let stored = backend
            .insert(&ChannelSlug::default_channel(), EntityKind::Lead, Map::new())
            .await
            .unwrap();
        let id = stored.id().unwrap();

        backend.delete(EntityKind::Lead, id).await.unwrap();
        assert!(backend.get(EntityKind::Lead, id).await.unwrap().is_none());
        assert!(backend.delete(EntityKind::Lead, id).await.is_err());
    }

    #[tokio::test]
    async fn test_settings_round_trip() {
        let backend = create_test_backend();
        let mut settings = ChannelSettings::new();
        settings.push("ALLOWED_ORIGINS", "https://a.example");
        settings.push("ALLOWED_ORIGINS", "https://b.example");
        backend
            .insert_channel(
                &Channel::new(ChannelSlug::new("partner"), "Partner").with_settings(settings),
            )
            .await
            .unwrap();

        let slug = ChannelSlug::new("partner");
        let stored = backend.fetch_settings(&slug).await.unwrap();
        assert_eq!(
            stored.get("ALLOWED_ORIGINS").unwrap(),
            ["https://a.example", "https://b.example"]
        );

        backend
            .put_setting(&slug, "ALLOWED_ORIGINS", &["https://c.example".to_string()])
            .await
            .unwrap();
        let stored = backend.fetch_settings(&slug).await.unwrap();
        assert_eq!(stored.get("ALLOWED_ORIGINS").unwrap(), ["https://c.example"]);
    }

    #[tokio::test]
    async fn test_duplicate_channel_rejected() {
        let backend = create_test_backend();
        with_channels(&backend, &["partner"]).await;
        let err = backend
            .insert_channel(&Channel::new(ChannelSlug::new("partner"), "Again"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::Resource(ResourceError::AlreadyExists { .. })
        ));

        let channels = backend.list_channels().await.unwrap();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].name(), "partner");
    }

    #[tokio::test]
    async fn test_query_count_tracks_round_trips() {
        let backend = create_test_backend();
        let before = backend.query_count();
        backend
            .fetch_channel(&ChannelSlug::new("partner"))
            .await
            .unwrap();
        backend
            .fetch_settings(&ChannelSlug::new("partner"))
            .await
            .unwrap();
        assert_eq!(backend.query_count() - before, 2);
    }
}
