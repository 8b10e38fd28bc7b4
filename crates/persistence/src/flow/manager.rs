//! The content-flow manager.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::{ChannelSelector, ContentFlow};
use crate::entity::EntityKind;
use crate::query::{Predicate, Query};
use crate::tenant::ChannelSlug;

/// A flow that shares an entity kind without any restriction beyond its
/// source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenGrant {
    /// Name of the flow.
    pub flow: String,
    /// The kind shared without restriction.
    pub kind: EntityKind,
    /// The channels whose records are exposed.
    pub source: ChannelSelector,
    /// The channels that gain visibility.
    pub destination: ChannelSelector,
}

/// Applies registered content flows to read queries.
///
/// Flows are kept in registration order. For a query issued under channel
/// `T`, every flow whose destination selects `T` contributes its grant for
/// the query's kind; all contributions are OR-ed with "owned by `T`" and the
/// result is AND-ed onto the query. A flow that does not cover the kind
/// contributes nothing. With no contributions the query sees only `T`'s own
/// records.
#[derive(Debug, Clone, Default)]
pub struct ContentFlowManager {
    flows: Vec<Arc<dyn ContentFlow>>,
}

impl ContentFlowManager {
    /// Starts an explicit registration phase.
    pub fn builder() -> ContentFlowManagerBuilder {
        ContentFlowManagerBuilder::default()
    }

    /// A manager without flows: every channel sees only its own records.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the number of registered flows.
    pub fn len(&self) -> usize {
        self.flows.len()
    }

    /// Returns `true` if no flow is registered.
    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    /// Returns the flows in registration order.
    pub fn flows(&self) -> &[Arc<dyn ContentFlow>] {
        &self.flows
    }

    /// Returns the flows whose destination selects `channel`, in
    /// registration order.
    pub fn applicable_rules<'a>(
        &'a self,
        channel: &'a ChannelSlug,
    ) -> impl Iterator<Item = &'a Arc<dyn ContentFlow>> + 'a {
        self.flows
            .iter()
            .filter(move |flow| flow.destination().matches(channel))
    }

    /// Returns the OR of every applicable flow's grant for `kind`, or
    /// [`Predicate::False`] if no flow contributes.
    pub fn grant_predicate(&self, channel: &ChannelSlug, kind: EntityKind) -> Predicate {
        let mut contributions = Vec::new();
        for flow in self.applicable_rules(channel) {
            match flow.contribution(kind) {
                Ok(predicate) => contributions.push(predicate),
                Err(skipped) => trace!(channel = %channel, %skipped, "flow skipped"),
            }
        }
        Predicate::or(contributions)
    }

    /// Returns the predicate selecting every `kind` record visible under
    /// `channel`: owned by it, or granted by a flow.
    pub fn visibility(&self, channel: &ChannelSlug, kind: EntityKind) -> Predicate {
        Predicate::or([
            Predicate::channel_is(channel),
            self.grant_predicate(channel, kind),
        ])
    }

    /// Narrows `base` to the records visible under `channel`.
    ///
    /// The base predicate is preserved and AND-ed with the visibility
    /// predicate. With `distinct`, results are deduplicated by record id.
    pub fn filter(&self, channel: &ChannelSlug, base: Query, distinct: bool) -> Query {
        let kind = base.kind();
        let visibility = self.visibility(channel, kind);
        debug!(
            channel = %channel,
            kind = %kind,
            rules = self.applicable_rules(channel).count(),
            visibility = %visibility,
            "content flow filter applied"
        );
        let distinct = distinct || base.is_distinct();
        base.filter(visibility).with_distinct(distinct)
    }

    /// Lists grants that share a kind without restriction.
    ///
    /// Such grants may be intentional or placeholders; they are surfaced
    /// for review rather than interpreted.
    pub fn open_grants(&self) -> Vec<OpenGrant> {
        self.flows.iter().flat_map(|flow| open_grants_of(flow.as_ref())).collect()
    }
}

fn open_grants_of(flow: &dyn ContentFlow) -> Vec<OpenGrant> {
    EntityKind::all()
        .iter()
        .copied()
        .filter(|kind| {
            flow.predicate_for(*kind)
                .is_ok_and(|predicate| predicate.is_always_true())
        })
        .map(|kind| OpenGrant {
            flow: flow.name().to_string(),
            kind,
            source: flow.source().clone(),
            destination: flow.destination().clone(),
        })
        .collect()
}

/// Collects flows in registration order.
#[derive(Debug, Default)]
pub struct ContentFlowManagerBuilder {
    flows: Vec<Arc<dyn ContentFlow>>,
}

impl ContentFlowManagerBuilder {
    /// Registers a flow after those already registered.
    pub fn register<F: ContentFlow + 'static>(self, flow: F) -> Self {
        self.register_arc(Arc::new(flow))
    }

    /// Registers a shared flow after those already registered.
    pub fn register_arc(mut self, flow: Arc<dyn ContentFlow>) -> Self {
        for grant in open_grants_of(flow.as_ref()) {
            warn!(
                flow = %grant.flow,
                kind = %grant.kind,
                source = %grant.source,
                destination = %grant.destination,
                "flow shares kind without restriction; confirm this is intended"
            );
        }
        debug!(
            flow = flow.name(),
            source = %flow.source(),
            destination = %flow.destination(),
            position = self.flows.len(),
            "content flow registered"
        );
        self.flows.push(flow);
        self
    }

    /// Finishes registration.
    pub fn build(self) -> ContentFlowManager {
        ContentFlowManager { flows: self.flows }
    }
}
