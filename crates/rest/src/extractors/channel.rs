//! Channel context extractor.
//!
//! Resolves the request channel from the `X-Channel` header, falling back to
//! the configured default channel when the header is absent or blank.

use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, HeaderName, request::Parts};
use beacon_persistence::tenant::{ChannelContext, ChannelSlug};

use crate::error::RestError;
use crate::state::AppState;

/// Header naming the request channel.
pub static X_CHANNEL: HeaderName = HeaderName::from_static("x-channel");

/// Header carrying the request correlation id.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Axum extractor for the request channel.
///
/// The slug is only checked for well-formedness here; whether the channel
/// exists is decided by the handler through the channel registry.
///
/// # Example
///
/// ```rust,ignore
/// use beacon_rest::extractors::ChannelExtractor;
///
/// async fn handler(channel: ChannelExtractor) {
///     println!("Channel: {}", channel.slug());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ChannelExtractor {
    context: ChannelContext,
}

impl ChannelExtractor {
    /// Creates an extractor for the given channel.
    pub fn new(slug: ChannelSlug) -> Self {
        Self {
            context: ChannelContext::new(slug),
        }
    }

    /// Returns the resolved context.
    pub fn context(&self) -> &ChannelContext {
        &self.context
    }

    /// Returns the channel slug.
    pub fn slug(&self) -> &ChannelSlug {
        self.context.channel()
    }

    /// Consumes the extractor and returns the context.
    pub fn into_context(self) -> ChannelContext {
        self.context
    }
}

impl std::fmt::Display for ChannelExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.slug())
    }
}

/// Resolves the channel slug from headers.
fn channel_from_headers(headers: &HeaderMap, default: &ChannelSlug) -> Result<ChannelSlug, RestError> {
    let raw = match headers.get(&X_CHANNEL) {
        None => return Ok(default.clone()),
        Some(value) => value.to_str().map_err(|_| RestError::BadRequest {
            message: "X-Channel header is not valid ASCII".to_string(),
        })?,
    };
    match raw.trim() {
        "" => Ok(default.clone()),
        slug => Ok(ChannelSlug::parse(slug)?),
    }
}

fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

impl<S> FromRequestParts<AppState<S>> for ChannelExtractor
where
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        let slug = channel_from_headers(&parts.headers, state.default_channel())?;
        let context =
            ChannelContext::new(slug).with_correlation_id(correlation_id(&parts.headers));
        Ok(Self { context })
    }
}
