//! Startup phase: channel seeding and content-flow registration.
//!
//! Flows are registered here, once, before the server accepts requests.

use std::sync::Arc;

use beacon_persistence::core::{ChannelStorage, RecordStorage};
use beacon_persistence::tenant::{Channel, ChannelSlug};
use beacon_rest::{AppState, ServerConfig, flows_from_config};
use tracing::{info, warn};

/// Builds the application state for `storage`.
///
/// Creates the default channel if it is missing, registers the configured
/// content flows and reports flows that expose a whole kind.
pub async fn prepare_state<S>(storage: Arc<S>, config: ServerConfig) -> anyhow::Result<AppState<S>>
where
    S: RecordStorage + ChannelStorage,
{
    let flows = flows_from_config(&config);
    let state = AppState::new(storage, config).with_flows(flows);

    let default = state.default_channel().clone();
    state
        .registry()
        .ensure_channel(Channel::new(default.clone(), default.as_str()))
        .await?;

    for slug in &state.config().shared_category_channels {
        let slug = ChannelSlug::new(slug.trim());
        if state.registry().get_channel(&slug).await?.is_none() {
            warn!(channel = %slug, "Shared-category channel does not exist yet");
        }
    }

    for grant in state.flows().open_grants() {
        warn!(
            flow = %grant.flow,
            kind = %grant.kind,
            source = ?grant.source,
            destination = ?grant.destination,
            "Flow shares every record of a kind"
        );
    }

    info!(
        flows = state.flows().len(),
        default_channel = %default,
        "Channel setup complete"
    );
    Ok(state)
}
