//! Channel entity and per-channel settings.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::ChannelSlug;

/// A channel: one white-label partition of the shared dataset.
///
/// Channels are created administratively. The slug never changes once the
/// channel exists; the display name and settings may.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    slug: ChannelSlug,
    name: String,
    created_at: DateTime<Utc>,
    settings: ChannelSettings,
}

impl Channel {
    /// Creates a channel with no settings.
    pub fn new(slug: ChannelSlug, name: impl Into<String>) -> Self {
        Self {
            slug,
            name: name.into(),
            created_at: Utc::now(),
            settings: ChannelSettings::new(),
        }
    }

    /// Rebuilds a channel from stored data.
    pub fn from_storage(
        slug: ChannelSlug,
        name: impl Into<String>,
        created_at: DateTime<Utc>,
        settings: ChannelSettings,
    ) -> Self {
        Self {
            slug,
            name: name.into(),
            created_at,
            settings,
        }
    }

    /// Returns the channel slug.
    pub fn slug(&self) -> &ChannelSlug {
        &self.slug
    }

    /// Returns the display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns when the channel was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the channel's own settings (without defaults).
    pub fn settings(&self) -> &ChannelSettings {
        &self.settings
    }

    /// Replaces the settings, returning the updated channel.
    pub fn with_settings(mut self, settings: ChannelSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// Multi-valued key/value settings of a channel.
///
/// A key may carry several values, e.g. a list of allowed origins. Values keep
/// their insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelSettings(BTreeMap<String, Vec<String>>);

impl ChannelSettings {
    /// Creates an empty settings map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all values of `key`, if the key is set.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(Vec::as_slice)
    }

    /// Returns the first value of `key`, if any.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.first()).map(String::as_str)
    }

    /// Returns `true` if `key` is set.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Sets all values of `key`, replacing previous ones. An empty list
    /// removes the key, so lookups fall back to the defaults.
    pub fn insert(&mut self, key: impl Into<String>, values: Vec<String>) {
        let key = key.into();
        if values.is_empty() {
            self.0.remove(&key);
        } else {
            self.0.insert(key, values);
        }
    }

    /// Appends one value to `key`.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    /// Iterates over keys and their values in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Returns the number of keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no key is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns these settings overlaid on `defaults`.
    ///
    /// Keys set on the channel win; every other default key is filled in.
    pub fn merged_with(&self, defaults: &DefaultSettings) -> ChannelSettings {
        let mut merged = defaults.0.clone();
        for (key, values) in self.iter() {
            merged.0.insert(key.to_string(), values.to_vec());
        }
        merged
    }
}

impl FromIterator<(String, Vec<String>)> for ChannelSettings {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .filter(|(_, values)| !values.is_empty())
                .collect(),
        )
    }
}

/// Statically configured fallback values for channel settings.
///
/// Looking up a key a channel does not define falls back to this map. A key
/// absent from both means "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultSettings(ChannelSettings);

impl DefaultSettings {
    /// Creates an empty default map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds defaults from `(key, values)` pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, Vec<V>)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut settings = ChannelSettings::new();
        for (key, values) in pairs {
            settings
                .0
                .insert(key.into(), values.into_iter().map(Into::into).collect());
        }
        Self(settings)
    }

    /// The platform's built-in defaults.
    pub fn platform() -> Self {
        Self::from_pairs([
            ("MAPS_API_LANGUAGE", vec!["en-US"]),
            ("CLIENT_URL", vec!["http://localhost"]),
            ("ALLOWED_ORIGINS", Vec::<&str>::new()),
            ("PROJECT_LIST_PAGE_SIZE", vec!["20"]),
            ("CAN_CREATE_PROJECTS_WITHOUT_ORGANIZATION", vec!["0"]),
        ])
    }

    /// Returns the default values for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(key)
    }

    /// Sets a default, returning the updated map.
    pub fn with(mut self, key: impl Into<String>, values: Vec<String>) -> Self {
        self.0.0.insert(key.into(), values);
        self
    }
}
