//! Channel-scoped entities.
//!
//! Every entity type of the platform is channel-scoped: its records carry
//! exactly one owning channel, set when the record is created and never
//! changed afterwards. [`Record`] is the uniform representation the storage
//! layer works with; the entity-specific payload lives in its JSON fields.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::tenant::ChannelSlug;

/// Field names that would associate a record with a channel directly.
///
/// These may never appear in a record's field map; the channel is always
/// passed out of band.
pub const RESERVED_CHANNEL_FIELDS: &[&str] = &["channel", "channel_id", "tenant", "tenant_id"];

/// Pseudo field addressing a record's identity in predicates.
pub const ID_FIELD: &str = "id";

/// Pseudo field addressing a record's owning channel in predicates.
pub const CHANNEL_FIELD: &str = "channel";

/// The entity types stored by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Organization,
    Project,
    Job,
    Work,
    Apply,
    Category,
    Cause,
    Skill,
    Upload,
    Gallery,
    Rating,
    Post,
    Lead,
}

impl EntityKind {
    /// Every entity kind, in declaration order.
    pub fn all() -> &'static [EntityKind] {
        &[
            EntityKind::User,
            EntityKind::Organization,
            EntityKind::Project,
            EntityKind::Job,
            EntityKind::Work,
            EntityKind::Apply,
            EntityKind::Category,
            EntityKind::Cause,
            EntityKind::Skill,
            EntityKind::Upload,
            EntityKind::Gallery,
            EntityKind::Rating,
            EntityKind::Post,
            EntityKind::Lead,
        ]
    }

    /// The collection name used in storage and URLs (e.g. `projects`).
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "users",
            EntityKind::Organization => "organizations",
            EntityKind::Project => "projects",
            EntityKind::Job => "jobs",
            EntityKind::Work => "works",
            EntityKind::Apply => "applies",
            EntityKind::Category => "categories",
            EntityKind::Cause => "causes",
            EntityKind::Skill => "skills",
            EntityKind::Upload => "uploads",
            EntityKind::Gallery => "galleries",
            EntityKind::Rating => "ratings",
            EntityKind::Post => "posts",
            EntityKind::Lead => "leads",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownEntityKind {
                name: s.to_string(),
            })
    }
}

/// Storage-assigned identity of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(i64);

impl RecordId {
    /// Wraps a raw id.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(RecordId)
    }
}

/// A channel-scoped record.
///
/// A record without an id is a draft that has not been persisted yet. The
/// owning channel can only be attached by the storage layer; there is no
/// public setter, which is what keeps mass-assignment from moving a record
/// between channels.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    kind: EntityKind,
    id: Option<RecordId>,
    channel: Option<ChannelSlug>,
    fields: Map<String, Value>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl Record {
    /// Creates an unsaved record.
    pub fn draft(kind: EntityKind, fields: Map<String, Value>) -> Self {
        Self {
            kind,
            id: None,
            channel: None,
            fields,
            created_at: None,
            updated_at: None,
        }
    }

    /// Rebuilds a persisted record. Only storage backends call this.
    pub fn from_storage(
        kind: EntityKind,
        id: RecordId,
        channel: ChannelSlug,
        fields: Map<String, Value>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            id: Some(id),
            channel: Some(channel),
            fields,
            created_at: Some(created_at),
            updated_at: Some(updated_at),
        }
    }

    /// Returns the entity kind.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Returns the id, or `None` for drafts.
    pub fn id(&self) -> Option<RecordId> {
        self.id
    }

    /// Returns `true` if the record has not been persisted.
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// Returns the owning channel, or `None` for drafts.
    pub fn channel(&self) -> Option<&ChannelSlug> {
        self.channel.as_ref()
    }

    /// Returns the record's fields.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Returns a mutable reference to the record's fields.
    pub fn fields_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.fields
    }

    /// Returns a single field value.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Resolves a predicate field: `id` and `channel` address the record's
    /// identity and owner, everything else its JSON fields.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        match name {
            ID_FIELD => self.id.map(|id| Value::from(id.get())),
            CHANNEL_FIELD => self
                .channel
                .as_ref()
                .map(|c| Value::String(c.as_str().to_string())),
            _ => self.fields.get(name).cloned(),
        }
    }

    /// Returns when the record was created.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Returns when the record was last updated.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Renders the record as a JSON object: identity, owning channel and
    /// fields.
    pub fn to_json(&self) -> Value {
        let mut obj = self.fields.clone();
        if let Some(id) = self.id {
            obj.insert(ID_FIELD.to_string(), Value::from(id.get()));
        }
        if let Some(channel) = &self.channel {
            obj.insert(
                CHANNEL_FIELD.to_string(),
                Value::String(channel.as_str().to_string()),
            );
        }
        Value::Object(obj)
    }
}

/// Returns the first reserved channel field present in `fields`, if any.
pub fn find_reserved_field(fields: &Map<String, Value>) -> Option<&'static str> {
    RESERVED_CHANNEL_FIELDS
        .iter()
        .copied()
        .find(|name| fields.contains_key(*name))
}
