//! Channel context for storage operations.
//!
//! This module defines [`ChannelContext`], the resolved channel an operation
//! runs under. Every read path narrows its query with the context's channel
//! and every write path attaches it to the new record.

use super::id::ChannelSlug;
use crate::error::ValidationError;

/// The channel an operation is executed under.
///
/// A context is cheap to clone and carries optional tracing metadata
/// (correlation and user ids) that flows into log events.
///
/// ```
/// use beacon_persistence::tenant::{ChannelContext, ChannelSlug};
///
/// let ctx = ChannelContext::new(ChannelSlug::new("partner"))
///     .with_correlation_id("req-1");
/// assert_eq!(ctx.channel().as_str(), "partner");
/// assert_eq!(ctx.correlation_id(), Some("req-1"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelContext {
    channel: ChannelSlug,
    correlation_id: Option<String>,
    user_id: Option<String>,
}

impl ChannelContext {
    /// Creates a context for the given channel.
    pub fn new(channel: ChannelSlug) -> Self {
        Self {
            channel,
            correlation_id: None,
            user_id: None,
        }
    }

    /// Creates a context for the default channel.
    pub fn default_channel() -> Self {
        Self::new(ChannelSlug::default_channel())
    }

    /// Attaches a correlation ID for request tracing.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Attaches the acting user's ID for auditing.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Returns the channel slug.
    pub fn channel(&self) -> &ChannelSlug {
        &self.channel
    }

    /// Returns the correlation ID, if set.
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Returns the user ID, if set.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Returns `true` if this context runs under the default channel.
    pub fn is_default(&self) -> bool {
        self.channel.is_default()
    }
}

/// Builder for channel contexts constructed from external input.
#[derive(Debug, Default)]
pub struct ChannelContextBuilder {
    channel: Option<String>,
    correlation_id: Option<String>,
    user_id: Option<String>,
}

impl ChannelContextBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the channel slug (validated on build).
    pub fn channel(mut self, slug: impl Into<String>) -> Self {
        self.channel = Some(slug.into());
        self
    }

    /// Sets the correlation ID.
    pub fn correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Sets the user ID.
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Builds the context.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingRequiredField`] when no channel was
    /// given and [`ValidationError::InvalidChannelSlug`] when it is malformed.
    pub fn build(self) -> Result<ChannelContext, ValidationError> {
        let slug = self
            .channel
            .ok_or_else(|| ValidationError::MissingRequiredField {
                field: "channel".to_string(),
            })?;

        Ok(ChannelContext {
            channel: ChannelSlug::parse(&slug)?,
            correlation_id: self.correlation_id,
            user_id: self.user_id,
        })
    }
}
