//! Content flows: declarative cross-channel visibility grants.
//!
//! Records are owned by exactly one channel. A content flow widens what a
//! *destination* channel sees by granting it read access to records that
//! originate from a *source* channel and satisfy a per-kind predicate. Flows
//! never copy records; they only add disjuncts to read queries.
//!
//! # Core Types
//!
//! - [`ChannelSelector`] - A literal channel or any channel
//! - [`ContentFlow`] - The trait every flow implements
//! - [`FlowRule`] - Table-driven flow with ready-made constructors
//! - [`ContentFlowManager`] - Ordered collection of flows that rewrites queries
//!
//! # Example
//!
//! ```
//! use beacon_persistence::entity::EntityKind;
//! use beacon_persistence::flow::{ContentFlowManager, FlowRule};
//! use beacon_persistence::query::Query;
//! use beacon_persistence::tenant::ChannelSlug;
//!
//! let partner = ChannelSlug::new("partner");
//! let manager = ContentFlowManager::builder()
//!     .register(FlowRule::shared_category(partner.clone(), "shared"))
//!     .build();
//!
//! let query = manager.filter(&partner, Query::for_kind(EntityKind::Project), true);
//! assert!(query.is_distinct());
//! ```

mod manager;
mod rule;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::EntityKind;
use crate::query::Predicate;
use crate::tenant::ChannelSlug;

pub use manager::{ContentFlowManager, ContentFlowManagerBuilder, OpenGrant};
pub use rule::FlowRule;

/// Selects the channels a flow applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelSelector {
    /// Every channel.
    Any,
    /// One specific channel.
    Channel(ChannelSlug),
}

impl ChannelSelector {
    /// Returns `true` if `channel` is selected.
    pub fn matches(&self, channel: &ChannelSlug) -> bool {
        match self {
            ChannelSelector::Any => true,
            ChannelSelector::Channel(selected) => selected == channel,
        }
    }

    /// Predicate restricting records to the selected channels.
    pub fn ownership_predicate(&self) -> Predicate {
        match self {
            ChannelSelector::Any => Predicate::True,
            ChannelSelector::Channel(slug) => Predicate::channel_is(slug),
        }
    }
}

impl fmt::Display for ChannelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelSelector::Any => write!(f, "*"),
            ChannelSelector::Channel(slug) => write!(f, "{}", slug),
        }
    }
}

impl From<ChannelSlug> for ChannelSelector {
    fn from(slug: ChannelSlug) -> Self {
        ChannelSelector::Channel(slug)
    }
}

/// Signals that a flow has nothing to say about an entity kind.
///
/// The [`ContentFlowManager`] treats this as "no contribution"; it never
/// reaches callers of the manager.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("flow '{flow}' does not apply to {kind}")]
pub struct NoApplicableFlow {
    /// Name of the flow.
    pub flow: String,
    /// The kind the flow was asked about.
    pub kind: EntityKind,
}

/// A cross-channel visibility grant.
///
/// A flow is consulted for queries issued under a channel its
/// [`destination`](Self::destination) selects.
pub trait ContentFlow: Send + Sync + fmt::Debug {
    /// A name for logs and diagnostics.
    fn name(&self) -> &str;

    /// The channels whose records this flow exposes.
    fn source(&self) -> &ChannelSelector;

    /// The channels that gain visibility.
    fn destination(&self) -> &ChannelSelector;

    /// The predicate selecting exposed records of `kind`, before the source
    /// restriction is applied.
    ///
    /// # Errors
    ///
    /// Returns [`NoApplicableFlow`] if the flow does not cover `kind`.
    fn predicate_for(&self, kind: EntityKind) -> Result<Predicate, NoApplicableFlow>;

    /// The full grant for `kind`: owned by a source channel and selected by
    /// [`predicate_for`](Self::predicate_for).
    fn contribution(&self, kind: EntityKind) -> Result<Predicate, NoApplicableFlow> {
        let predicate = self.predicate_for(kind)?;
        Ok(Predicate::and([self.source().ownership_predicate(), predicate]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_matches() {
        let partner = ChannelSlug::new("partner");
        assert!(ChannelSelector::Any.matches(&partner));
        assert!(ChannelSelector::Channel(partner.clone()).matches(&partner));
        assert!(!ChannelSelector::Channel(ChannelSlug::new("other")).matches(&partner));
    }

    #[test]
    fn test_selector_ownership_predicate() {
        assert_eq!(ChannelSelector::Any.ownership_predicate(), Predicate::True);
        assert_eq!(
            ChannelSelector::from(ChannelSlug::default_channel()).ownership_predicate(),
            Predicate::channel_is(&ChannelSlug::default_channel())
        );
    }

    #[test]
    fn test_no_applicable_flow_display() {
        let err = NoApplicableFlow {
            flow: "shared".to_string(),
            kind: EntityKind::Rating,
        };
        assert_eq!(err.to_string(), "flow 'shared' does not apply to ratings");
    }
}
