//! Channel identifier type.
//!
//! This module defines [`ChannelSlug`], the immutable identifier of a channel
//! (a white-label tenant of the platform).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The slug of the shared channel that owns platform-wide content.
///
/// Requests that do not name a channel are served under this channel, and
/// most content flows pull their shared content from it.
pub const DEFAULT_CHANNEL: &str = "default";

/// Maximum length accepted for a channel slug.
pub const MAX_SLUG_LEN: usize = 64;

/// The unique, immutable slug identifying a channel.
///
/// Slugs are restricted to ASCII alphanumerics, `-` and `_` so they can travel
/// safely in headers and URLs.
///
/// # Examples
///
/// ```
/// use beacon_persistence::tenant::ChannelSlug;
///
/// let slug = ChannelSlug::parse("partner-1").unwrap();
/// assert_eq!(slug.as_str(), "partner-1");
/// assert!(ChannelSlug::parse("bad slug").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelSlug(String);

impl ChannelSlug {
    /// Creates a slug without validating it.
    ///
    /// Use [`ChannelSlug::parse`] for anything that comes from outside the
    /// process.
    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    /// Parses and validates a slug.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidChannelSlug`] if the slug is empty,
    /// longer than [`MAX_SLUG_LEN`] or contains characters other than ASCII
    /// alphanumerics, `-` and `_`.
    pub fn parse(slug: &str) -> Result<Self, ValidationError> {
        if is_valid_slug(slug) {
            Ok(Self(slug.to_string()))
        } else {
            Err(ValidationError::InvalidChannelSlug {
                slug: slug.to_string(),
            })
        }
    }

    /// Returns the slug of the default channel.
    pub fn default_channel() -> Self {
        Self(DEFAULT_CHANNEL.to_string())
    }

    /// Returns the slug as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if this is the default channel.
    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_CHANNEL
    }
}

/// Returns `true` if `slug` is a well-formed channel slug.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= MAX_SLUG_LEN
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl fmt::Display for ChannelSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ChannelSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelSlug({})", self.0)
    }
}

impl FromStr for ChannelSlug {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<&str> for ChannelSlug {
    fn from(s: &str) -> Self {
        ChannelSlug::new(s)
    }
}

impl AsRef<str> for ChannelSlug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
