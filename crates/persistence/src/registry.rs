//! Channel registry with a time-bounded cache.
//!
//! Channels are read on almost every request and change rarely, so the
//! registry caches each channel (row plus settings) for a short TTL. Entries
//! expire; writes do not invalidate them. A setting written through
//! [`ChannelRegistry::set_setting`] therefore becomes visible once the entry
//! expires or is invalidated explicitly.
//!
//! Concurrent misses for the same slug may both hit storage; the last one to
//! finish wins the cache slot. No lock is held across a storage call.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use beacon_persistence::backends::memory::MemoryBackend;
//! use beacon_persistence::registry::ChannelRegistry;
//! use beacon_persistence::tenant::{Channel, ChannelSlug};
//!
//! # tokio_test::block_on(async {
//! let registry = ChannelRegistry::new(Arc::new(MemoryBackend::new()));
//! registry
//!     .create_channel(Channel::new(ChannelSlug::new("partner"), "Partner"))
//!     .await
//!     .unwrap();
//!
//! let channel = registry.require_channel(&ChannelSlug::new("partner")).await.unwrap();
//! assert_eq!(channel.name(), "Partner");
//! # });
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::core::ChannelStorage;
use crate::error::{StorageResult, TenantError};
use crate::tenant::{Channel, ChannelSettings, ChannelSlug, DefaultSettings};

/// Default lifetime of a cached channel.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct CacheEntry {
    channel: Arc<Channel>,
    cached_at: Instant,
}

/// Looks up channels by slug, caching them for a fixed TTL.
#[derive(Debug)]
pub struct ChannelRegistry<S> {
    storage: Arc<S>,
    defaults: DefaultSettings,
    ttl: Duration,
    cache: RwLock<HashMap<ChannelSlug, CacheEntry>>,
}

impl<S: ChannelStorage> ChannelRegistry<S> {
    /// Creates a registry with the default TTL and the platform default
    /// settings.
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            defaults: DefaultSettings::platform(),
            ttl: DEFAULT_CACHE_TTL,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Sets the cache TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the fallback values for unset setting keys.
    pub fn with_defaults(mut self, defaults: DefaultSettings) -> Self {
        self.defaults = defaults;
        self
    }

    /// Returns the underlying storage.
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Returns the cache TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the default settings.
    pub fn defaults(&self) -> &DefaultSettings {
        &self.defaults
    }

    fn cached(&self, slug: &ChannelSlug) -> Option<Arc<Channel>> {
        let cache = self.cache.read();
        cache
            .get(slug)
            .filter(|entry| entry.cached_at.elapsed() < self.ttl)
            .map(|entry| Arc::clone(&entry.channel))
    }

    /// Returns a channel with its own settings, or `None` if no channel has
    /// this slug.
    ///
    /// A cache miss issues two storage queries (the channel row and its
    /// settings); a hit issues none. Unknown slugs are not cached.
    pub async fn get_channel(&self, slug: &ChannelSlug) -> StorageResult<Option<Arc<Channel>>> {
        if let Some(channel) = self.cached(slug) {
            debug!(channel = %slug, "channel cache hit");
            return Ok(Some(channel));
        }

        let Some(row) = self.storage.fetch_channel(slug).await? else {
            debug!(channel = %slug, "channel not found");
            return Ok(None);
        };
        let settings = self.storage.fetch_settings(slug).await?;
        let channel = Arc::new(row.with_settings(settings));

        debug!(channel = %slug, ttl = ?self.ttl, "channel cache populated");
        self.cache.write().insert(
            slug.clone(),
            CacheEntry {
                channel: Arc::clone(&channel),
                cached_at: Instant::now(),
            },
        );
        Ok(Some(channel))
    }

    /// Returns a channel, failing if the slug is unknown.
    ///
    /// # Errors
    ///
    /// * `StorageError::Tenant(TenantNotFound)` - If no channel has this slug
    pub async fn require_channel(&self, slug: &ChannelSlug) -> StorageResult<Arc<Channel>> {
        self.get_channel(slug).await?.ok_or_else(|| {
            TenantError::TenantNotFound {
                slug: slug.to_string(),
            }
            .into()
        })
    }

    /// Returns the values of a setting: the channel's own values if the key
    /// is set, else the default values, else an empty list.
    ///
    /// An empty list means "no restriction", never an error.
    pub async fn get_setting(&self, slug: &ChannelSlug, key: &str) -> StorageResult<Vec<String>> {
        let channel = self.require_channel(slug).await?;
        let values = channel
            .settings()
            .get(key)
            .or_else(|| self.defaults.get(key))
            .map(<[String]>::to_vec)
            .unwrap_or_default();
        Ok(values)
    }

    /// Returns a channel's settings merged over the defaults.
    pub async fn effective_settings(&self, slug: &ChannelSlug) -> StorageResult<ChannelSettings> {
        let channel = self.require_channel(slug).await?;
        Ok(channel.settings().merged_with(&self.defaults))
    }

    /// Writes a setting through to storage.
    ///
    /// The cached entry is left alone; the new value is served once it
    /// expires or after [`invalidate`](Self::invalidate).
    pub async fn set_setting(
        &self,
        slug: &ChannelSlug,
        key: &str,
        values: Vec<String>,
    ) -> StorageResult<()> {
        self.require_channel(slug).await?;
        self.storage.put_setting(slug, key, &values).await?;
        debug!(channel = %slug, key, "channel setting written");
        Ok(())
    }

    /// Creates a channel. Its slug can never change afterwards.
    ///
    /// # Errors
    ///
    /// * `StorageError::Resource(AlreadyExists)` - If the slug is taken
    pub async fn create_channel(&self, channel: Channel) -> StorageResult<Arc<Channel>> {
        self.storage.insert_channel(&channel).await?;
        info!(channel = %channel.slug(), name = channel.name(), "channel created");
        Ok(Arc::new(channel))
    }

    /// Creates a channel unless one with the same slug exists.
    pub async fn ensure_channel(&self, channel: Channel) -> StorageResult<Arc<Channel>> {
        match self.get_channel(channel.slug()).await? {
            Some(existing) => Ok(existing),
            None => self.create_channel(channel).await,
        }
    }

    /// Lists all channels (without settings), bypassing the cache.
    pub async fn list_channels(&self) -> StorageResult<Vec<Channel>> {
        self.storage.list_channels().await
    }

    /// Drops the cached entry for one channel.
    pub fn invalidate(&self, slug: &ChannelSlug) {
        self.cache.write().remove(slug);
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        self.cache.write().clear();
    }

    /// Returns the number of cached entries, including expired ones.
    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::memory::MemoryBackend;
    use crate::error::StorageError;

    async fn registry_with_partner() -> ChannelRegistry<MemoryBackend> {
        let registry = ChannelRegistry::new(Arc::new(MemoryBackend::new()));
        let mut settings = ChannelSettings::new();
        settings.push("CLIENT_URL", "https://partner.example");
        registry
            .create_channel(
                Channel::new(ChannelSlug::new("partner"), "Partner").with_settings(settings),
            )
            .await
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn test_miss_then_hit_query_counts() {
        let registry = registry_with_partner().await;
        let slug = ChannelSlug::new("partner");
        registry.clear();

        let before = registry.storage().query_count();
        registry.get_channel(&slug).await.unwrap().unwrap();
        assert_eq!(registry.storage().query_count() - before, 2);

        let before = registry.storage().query_count();
        registry.get_channel(&slug).await.unwrap().unwrap();
        assert_eq!(registry.storage().query_count() - before, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let registry = registry_with_partner().await;
        let slug = ChannelSlug::new("partner");
        registry.get_channel(&slug).await.unwrap();

        tokio::time::advance(Duration::from_secs(59)).await;
        let before = registry.storage().query_count();
        registry.get_channel(&slug).await.unwrap();
        assert_eq!(registry.storage().query_count(), before);

        tokio::time::advance(Duration::from_secs(2)).await;
        registry.get_channel(&slug).await.unwrap();
        assert_eq!(registry.storage().query_count() - before, 2);
    }

    #[tokio::test]
    async fn test_unknown_channel() {
        let registry = registry_with_partner().await;
        let ghost = ChannelSlug::new("ghost");
        assert!(registry.get_channel(&ghost).await.unwrap().is_none());
        assert_eq!(registry.cached_len(), 0);

        let err = registry.require_channel(&ghost).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Tenant(TenantError::TenantNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_setting_fallback() {
        let registry = registry_with_partner().await;
        let slug = ChannelSlug::new("partner");

        assert_eq!(
            registry.get_setting(&slug, "CLIENT_URL").await.unwrap(),
            vec!["https://partner.example"]
        );
        assert_eq!(
            registry.get_setting(&slug, "MAPS_API_LANGUAGE").await.unwrap(),
            vec!["en-US"]
        );
        assert!(registry.get_setting(&slug, "NO_SUCH_KEY").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_setting_visible_after_invalidate() {
        let registry = registry_with_partner().await;
        let slug = ChannelSlug::new("partner");
        registry.get_channel(&slug).await.unwrap();

        registry
            .set_setting(&slug, "MAPS_API_LANGUAGE", vec!["pt-BR".to_string()])
            .await
            .unwrap();
        // Still cached.
        assert_eq!(
            registry.get_setting(&slug, "MAPS_API_LANGUAGE").await.unwrap(),
            vec!["en-US"]
        );

        registry.invalidate(&slug);
        assert_eq!(
            registry.get_setting(&slug, "MAPS_API_LANGUAGE").await.unwrap(),
            vec!["pt-BR"]
        );
    }

    #[tokio::test]
    async fn test_effective_settings_merge_defaults() {
        let registry = registry_with_partner().await;
        let merged = registry
            .effective_settings(&ChannelSlug::new("partner"))
            .await
            .unwrap();
        assert_eq!(merged.first("CLIENT_URL"), Some("https://partner.example"));
        assert_eq!(merged.first("MAPS_API_LANGUAGE"), Some("en-US"));
    }

    #[tokio::test]
    async fn test_ensure_channel_is_idempotent() {
        let registry = registry_with_partner().await;
        let existing = registry
            .ensure_channel(Channel::new(ChannelSlug::new("partner"), "Other name"))
            .await
            .unwrap();
        assert_eq!(existing.name(), "Partner");
        assert_eq!(registry.list_channels().await.unwrap().len(), 1);
    }
}
