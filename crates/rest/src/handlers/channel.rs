//! Current channel handler.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use beacon_persistence::core::ChannelStorage;
use beacon_persistence::tenant::{ChannelSettings, ChannelSlug};
use serde::Serialize;
use tracing::debug;

use crate::enforcement::ApiResponse;
use crate::error::{RestError, RestResult};
use crate::extractors::ChannelExtractor;
use crate::state::AppState;

/// Body of `GET /api/channel`.
#[derive(Debug, Serialize)]
pub struct ChannelResponse {
    /// The channel slug.
    pub slug: ChannelSlug,
    /// Display name.
    pub name: String,
    /// Creation time, RFC 3339.
    pub created_at: String,
    /// Whether this is the platform's default channel.
    pub is_default: bool,
    /// Settings merged over the platform defaults.
    pub settings: ChannelSettings,
}

/// Handler returning the request channel.
///
/// Settings are merged over the platform defaults, so clients see the
/// effective value of every known key.
///
/// # HTTP Request
///
/// `GET [base]/api/channel`
///
/// # Response
///
/// - `200 OK` - The channel
/// - `400 Bad Request` - The channel does not exist
pub async fn channel_handler<S>(
    State(state): State<AppState<S>>,
    channel: ChannelExtractor,
) -> RestResult<Response>
where
    S: ChannelStorage,
{
    debug!(channel = %channel, "Processing channel request");

    let current = state.registry().require_channel(channel.slug()).await?;
    let settings = state.registry().effective_settings(channel.slug()).await?;

    let body = ChannelResponse {
        slug: current.slug().clone(),
        name: current.name().to_string(),
        created_at: current.created_at().to_rfc3339(),
        is_default: current.slug().is_default(),
        settings,
    };
    let body = serde_json::to_value(&body).map_err(|e| RestError::InternalError {
        message: e.to_string(),
    })?;

    Ok(ApiResponse::ok(body).into_response())
}
