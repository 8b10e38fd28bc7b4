//! Application state for the Beacon REST API.
//!
//! The state carries everything a handler needs: storage, the channel
//! registry and write discipline built on it, the content-flow manager, the
//! interceptor chain and the server configuration.

use std::sync::Arc;

use beacon_persistence::core::{ChannelStorage, RecordStorage};
use beacon_persistence::entity::EntityKind;
use beacon_persistence::flow::ContentFlowManager;
use beacon_persistence::registry::ChannelRegistry;
use beacon_persistence::scoped::ChannelScope;
use beacon_persistence::tenant::ChannelSlug;

use crate::config::ServerConfig;
use crate::enforcement::{InterceptorChain, RecordUnit, Scoped};

/// Shared application state for the REST API.
///
/// # Type Parameters
///
/// * `S` - The storage backend type
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use beacon_persistence::backends::memory::MemoryBackend;
/// use beacon_persistence::flow::{ContentFlowManager, FlowRule};
/// use beacon_persistence::tenant::ChannelSlug;
/// use beacon_rest::{AppState, ServerConfig};
///
/// let flows = ContentFlowManager::builder()
///     .register(FlowRule::shared_category(ChannelSlug::new("partner"), "shared"))
///     .build();
/// let state = AppState::new(Arc::new(MemoryBackend::new()), ServerConfig::default())
///     .with_flows(flows);
/// assert_eq!(state.flows().len(), 1);
/// ```
pub struct AppState<S> {
    storage: Arc<S>,
    registry: Arc<ChannelRegistry<S>>,
    scope: ChannelScope<S>,
    flows: Arc<ContentFlowManager>,
    interceptors: Arc<InterceptorChain>,
    default_channel: ChannelSlug,
    config: Arc<ServerConfig>,
}

// S is only held behind Arc, so it need not be Clone
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            registry: Arc::clone(&self.registry),
            scope: self.scope.clone(),
            flows: Arc::clone(&self.flows),
            interceptors: Arc::clone(&self.interceptors),
            default_channel: self.default_channel.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S> AppState<S> {
    /// Returns a reference to the storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Returns the channel registry.
    pub fn registry(&self) -> &ChannelRegistry<S> {
        &self.registry
    }

    /// Returns the content-flow manager.
    pub fn flows(&self) -> &ContentFlowManager {
        &self.flows
    }

    /// Returns the interceptor chain.
    pub fn interceptors(&self) -> &InterceptorChain {
        &self.interceptors
    }

    /// Returns the channel for requests that do not name one.
    pub fn default_channel(&self) -> &ChannelSlug {
        &self.default_channel
    }

    /// Returns a reference to the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the default page size for list results.
    pub fn default_page_size(&self) -> usize {
        self.config.default_page_size
    }

    /// Returns the maximum page size for list results.
    pub fn max_page_size(&self) -> usize {
        self.config.max_page_size
    }
}

impl<S> AppState<S>
where
    S: RecordStorage + ChannelStorage,
{
    /// Creates the state with no content flows and no interceptors.
    ///
    /// # Arguments
    ///
    /// * `storage` - The storage backend (wrapped in Arc)
    /// * `config` - Server configuration; its cache TTL configures the
    ///   channel registry
    pub fn new(storage: Arc<S>, config: ServerConfig) -> Self {
        let registry =
            Arc::new(ChannelRegistry::new(Arc::clone(&storage)).with_ttl(config.channel_cache_ttl));
        Self::with_registry(storage, registry, config)
    }

    /// Creates the state around an existing registry.
    pub fn with_registry(
        storage: Arc<S>,
        registry: Arc<ChannelRegistry<S>>,
        config: ServerConfig,
    ) -> Self {
        let scope = ChannelScope::new(Arc::clone(&storage), Arc::clone(&registry));
        Self {
            storage,
            registry,
            scope,
            flows: Arc::new(ContentFlowManager::empty()),
            interceptors: Arc::new(InterceptorChain::new()),
            default_channel: config.default_channel_slug(),
            config: Arc::new(config),
        }
    }

    /// Replaces the content-flow manager.
    pub fn with_flows(mut self, flows: ContentFlowManager) -> Self {
        self.flows = Arc::new(flows);
        self
    }

    /// Replaces the interceptor chain.
    pub fn with_interceptors(mut self, interceptors: InterceptorChain) -> Self {
        self.interceptors = Arc::new(interceptors);
        self
    }

    /// Returns the write discipline.
    pub fn scope(&self) -> &ChannelScope<S> {
        &self.scope
    }

    /// Builds the unit serving `kind`, confined to `channel`.
    pub fn scoped_unit(&self, kind: EntityKind, channel: ChannelSlug) -> Scoped<RecordUnit<S>>
    where
        S: 'static,
    {
        Scoped::new(
            RecordUnit::new(kind, self.scope.clone()),
            Arc::clone(&self.flows),
            channel,
        )
    }
}
