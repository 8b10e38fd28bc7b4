//! Server configuration for the Beacon REST API.
//!
//! Configuration comes from command line arguments with environment variable
//! fallbacks, or is built programmatically.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `BEACON_PORT` | 8080 | Server port |
//! | `BEACON_HOST` | 127.0.0.1 | Host to bind |
//! | `BEACON_LOG_LEVEL` | info | Log level |
//! | `BEACON_MAX_BODY_SIZE` | 1048576 | Max request body (bytes) |
//! | `BEACON_REQUEST_TIMEOUT` | 30 | Request timeout (seconds) |
//! | `BEACON_ENABLE_CORS` | true | Enable CORS |
//! | `BEACON_CORS_ORIGINS` | * | Allowed origins |
//! | `BEACON_CORS_METHODS` | GET,POST,PATCH,DELETE,OPTIONS | Allowed methods |
//! | `BEACON_CORS_HEADERS` | Content-Type,Authorization,Accept,X-Channel,X-Request-ID | Allowed headers |
//! | `BEACON_DEFAULT_CHANNEL` | default | Channel for requests without `X-Channel` |
//! | `BEACON_DATABASE_URL` | beacon.db | SQLite path, or `:memory:` |
//! | `BEACON_CHANNEL_CACHE_TTL` | 60s | Lifetime of cached channels |
//! | `BEACON_DEFAULT_PAGE_SIZE` | 20 | Page size when `_count` is absent |
//! | `BEACON_MAX_PAGE_SIZE` | 100 | Upper bound for `_count` |
//! | `BEACON_SHARED_CATEGORY_CHANNELS` | (none) | Channels that see shared default projects |
//! | `BEACON_SHARED_CATEGORY_TAG` | shared | Category marking a project as shared |
//!
//! # Example
//!
//! ```rust
//! use beacon_rest::ServerConfig;
//!
//! let config = ServerConfig {
//!     port: 3000,
//!     host: "0.0.0.0".to_string(),
//!     shared_category_channels: vec!["partner".to_string()],
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use beacon_persistence::flow::{ContentFlowManager, FlowRule};
use beacon_persistence::tenant::{ChannelSlug, is_valid_slug};
use clap::Parser;
use tracing::warn;

/// Server configuration for the Beacon REST API.
#[derive(Debug, Clone, Parser)]
#[command(name = "beacon")]
#[command(about = "Multi-channel volunteer platform API server")]
pub struct ServerConfig {
    /// Port to listen on.
    #[arg(short, long, env = "BEACON_PORT", default_value = "8080")]
    pub port: u16,

    /// Host address to bind to.
    #[arg(long, env = "BEACON_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "BEACON_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Maximum request body size in bytes.
    #[arg(long, env = "BEACON_MAX_BODY_SIZE", default_value = "1048576")]
    pub max_body_size: usize,

    /// Request timeout in seconds.
    #[arg(long, env = "BEACON_REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout: u64,

    /// Enable CORS.
    #[arg(long, env = "BEACON_ENABLE_CORS", default_value = "true")]
    pub enable_cors: bool,

    /// Allowed CORS origins (comma-separated, or * for all).
    #[arg(long, env = "BEACON_CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// Allowed CORS methods (comma-separated, or * for all).
    #[arg(
        long,
        env = "BEACON_CORS_METHODS",
        default_value = "GET,POST,PATCH,DELETE,OPTIONS"
    )]
    pub cors_methods: String,

    /// Allowed CORS headers (comma-separated, or * for all).
    #[arg(
        long,
        env = "BEACON_CORS_HEADERS",
        default_value = "Content-Type,Authorization,Accept,X-Channel,X-Request-ID"
    )]
    pub cors_headers: String,

    /// Channel for requests without an `X-Channel` header.
    #[arg(long, env = "BEACON_DEFAULT_CHANNEL", default_value = "default")]
    pub default_channel: String,

    /// SQLite database path, or `:memory:`.
    #[arg(long, env = "BEACON_DATABASE_URL")]
    pub database_url: Option<String>,

    /// How long a channel stays cached (e.g. `60s`, `5m`).
    #[arg(
        long,
        env = "BEACON_CHANNEL_CACHE_TTL",
        default_value = "60s",
        value_parser = humantime::parse_duration
    )]
    pub channel_cache_ttl: Duration,

    /// Default page size for list results.
    #[arg(long, env = "BEACON_DEFAULT_PAGE_SIZE", default_value = "20")]
    pub default_page_size: usize,

    /// Maximum page size for list results.
    #[arg(long, env = "BEACON_MAX_PAGE_SIZE", default_value = "100")]
    pub max_page_size: usize,

    /// Channels that see default-channel projects tagged with the shared
    /// category (comma-separated).
    #[arg(
        long,
        env = "BEACON_SHARED_CATEGORY_CHANNELS",
        value_delimiter = ','
    )]
    pub shared_category_channels: Vec<String>,

    /// Category tag that marks a default-channel project as shared.
    #[arg(long, env = "BEACON_SHARED_CATEGORY_TAG", default_value = "shared")]
    pub shared_category_tag: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            log_level: "info".to_string(),
            max_body_size: 1024 * 1024,
            request_timeout: 30,
            enable_cors: true,
            cors_origins: "*".to_string(),
            cors_methods: "GET,POST,PATCH,DELETE,OPTIONS".to_string(),
            cors_headers: "Content-Type,Authorization,Accept,X-Channel,X-Request-ID".to_string(),
            default_channel: "default".to_string(),
            database_url: None,
            channel_cache_ttl: Duration::from_secs(60),
            default_page_size: 20,
            max_page_size: 100,
            shared_category_channels: Vec::new(),
            shared_category_tag: "shared".to_string(),
        }
    }
}

impl ServerConfig {
    /// Creates a configuration from environment variables, falling back to
    /// defaults if they do not parse.
    pub fn from_env() -> Self {
        Self::try_parse_from(["beacon"]).unwrap_or_default()
    }

    /// Returns the socket address to bind to.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the default channel slug, or `default` if the configured one
    /// is malformed. [`validate`](Self::validate) reports the latter.
    pub fn default_channel_slug(&self) -> ChannelSlug {
        ChannelSlug::parse(&self.default_channel).unwrap_or_else(|_| ChannelSlug::default_channel())
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.port == 0 {
            errors.push("Port cannot be 0".to_string());
        }

        if self.max_body_size == 0 {
            errors.push("Max body size cannot be 0".to_string());
        }

        if self.request_timeout == 0 {
            errors.push("Request timeout cannot be 0".to_string());
        }

        if self.default_page_size == 0 {
            errors.push("Default page size cannot be 0".to_string());
        }

        if self.default_page_size > self.max_page_size {
            errors.push("Default page size cannot exceed max page size".to_string());
        }

        if !is_valid_slug(&self.default_channel) {
            errors.push(format!(
                "Default channel '{}' is not a valid slug",
                self.default_channel
            ));
        }

        for slug in &self.shared_category_channels {
            if !is_valid_slug(slug) {
                errors.push(format!("Shared category channel '{}' is not a valid slug", slug));
            }
        }

        if self.shared_category_tag.trim().is_empty() {
            errors.push("Shared category tag cannot be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing.
    ///
    /// Uses an ephemeral port and disables CORS.
    pub fn for_testing() -> Self {
        Self {
            port: 0,
            log_level: "debug".to_string(),
            request_timeout: 5,
            enable_cors: false,
            cors_methods: "*".to_string(),
            cors_headers: "*".to_string(),
            database_url: Some(":memory:".to_string()),
            default_page_size: 10,
            max_page_size: 50,
            ..Default::default()
        }
    }
}

/// Builds the content flows described by `config`.
///
/// Each channel in `shared_category_channels` gets one flow that shares
/// default-channel projects tagged with `shared_category_tag`. Channels are
/// registered in configuration order; malformed slugs are skipped with a
/// warning and also reported by [`ServerConfig::validate`].
pub fn flows_from_config(config: &ServerConfig) -> ContentFlowManager {
    config
        .shared_category_channels
        .iter()
        .filter_map(|slug| match ChannelSlug::parse(slug.trim()) {
            Ok(destination) => Some(destination),
            Err(e) => {
                warn!(channel = %slug, error = %e, "Skipping shared-category flow");
                None
            }
        })
        .fold(ContentFlowManager::builder(), |builder, destination| {
            builder.register(FlowRule::shared_category(
                destination,
                config.shared_category_tag.trim(),
            ))
        })
        .build()
}
