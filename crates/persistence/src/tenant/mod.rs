//! Channel (tenant) management.
//!
//! Every persisted record belongs to exactly one channel. This module holds
//! the identity and metadata types of channels; the caching lookup lives in
//! [`crate::registry`] and the write discipline in [`crate::scoped`].
//!
//! # Core Types
//!
//! - [`ChannelSlug`] - Validated, immutable channel identifier
//! - [`Channel`] - Channel metadata with its [`ChannelSettings`]
//! - [`DefaultSettings`] - Fallback values for unset setting keys
//! - [`ChannelContext`] - The channel an operation runs under
//!
//! # Examples
//!
//! ```
//! use beacon_persistence::tenant::{ChannelContext, ChannelSlug, DEFAULT_CHANNEL};
//!
//! let ctx = ChannelContext::new(ChannelSlug::parse("partner").unwrap());
//! assert!(!ctx.is_default());
//! assert_eq!(ChannelSlug::default_channel().as_str(), DEFAULT_CHANNEL);
//! ```

mod channel;
mod context;
mod id;

pub use channel::{Channel, ChannelSettings, DefaultSettings};
pub use context::{ChannelContext, ChannelContextBuilder};
pub use id::{ChannelSlug, DEFAULT_CHANNEL, MAX_SLUG_LEN, is_valid_slug};
