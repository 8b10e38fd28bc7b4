//! Beacon Persistence Layer
//!
//! This crate provides the channel-partitioned persistence layer of the Beacon
//! volunteer platform. Every record belongs to exactly one channel (a
//! white-label tenant); content flows declare which records of one channel
//! another channel may read.
//!
//! # Architecture
//!
//! - [`tenant`] - Channel identity, metadata and settings
//! - [`entity`] - Entity kinds and the uniform [`Record`](entity::Record)
//! - [`query`] - Composable predicates and queries
//! - [`scoped`] - The write discipline every record goes through
//! - [`flow`] - Content flows and the manager that applies them to reads
//! - [`registry`] - Channel lookup with a time-bounded cache
//! - [`core`] - Storage traits
//! - [`backends`] - SQLite and in-memory implementations
//! - [`error`] - Error types for all operations
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use beacon_persistence::backends::memory::MemoryBackend;
//! use beacon_persistence::core::RecordStorage;
//! use beacon_persistence::entity::EntityKind;
//! use beacon_persistence::flow::{ContentFlowManager, FlowRule};
//! use beacon_persistence::query::Query;
//! use beacon_persistence::registry::ChannelRegistry;
//! use beacon_persistence::scoped::ChannelScope;
//! use beacon_persistence::tenant::{Channel, ChannelSlug};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let storage = Arc::new(MemoryBackend::new());
//! let registry = Arc::new(ChannelRegistry::new(Arc::clone(&storage)));
//! for slug in ["default", "partner"] {
//!     registry
//!         .create_channel(Channel::new(ChannelSlug::new(slug), slug))
//!         .await
//!         .unwrap();
//! }
//!
//! // Writes name the owning channel explicitly.
//! let scope = ChannelScope::new(Arc::clone(&storage), registry);
//! let fields = json!({"name": "Beach cleanup", "categories": ["shared"]});
//! scope
//!     .create(EntityKind::Project, fields.as_object().cloned().unwrap(), Some("default"))
//!     .await
//!     .unwrap();
//!
//! // Reads are narrowed by the registered flows.
//! let partner = ChannelSlug::new("partner");
//! let flows = ContentFlowManager::builder()
//!     .register(FlowRule::shared_category(partner.clone(), "shared"))
//!     .build();
//! let query = flows.filter(&partner, Query::for_kind(EntityKind::Project), true);
//! assert_eq!(storage.query(&query).await.unwrap().len(), 1);
//! # });
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod core;
pub mod entity;
pub mod error;
pub mod flow;
pub mod query;
pub mod registry;
pub mod scoped;
pub mod tenant;

// Re-export commonly used types at crate root
pub use entity::{EntityKind, Record, RecordId};
pub use error::{StorageError, StorageResult};
pub use flow::{ChannelSelector, ContentFlow, ContentFlowManager, FlowRule};
pub use query::{Predicate, Query};
pub use registry::ChannelRegistry;
pub use scoped::ChannelScope;
pub use tenant::{Channel, ChannelContext, ChannelSlug};

// Re-export core traits
pub use core::{Backend, BackendKind, ChannelStorage, RecordStorage};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
