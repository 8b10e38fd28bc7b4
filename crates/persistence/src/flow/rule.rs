//! Table-driven content flows.

use std::collections::BTreeMap;

use serde_json::Value;

use super::{ChannelSelector, ContentFlow, NoApplicableFlow};
use crate::entity::{EntityKind, RecordId};
use crate::query::Predicate;
use crate::tenant::ChannelSlug;

/// A content flow backed by a lookup table from entity kind to predicate.
///
/// Kinds absent from the table are not covered by the rule. A kind mapped to
/// [`Predicate::True`] is shared without restriction; such grants are
/// reported by [`ContentFlowManager::open_grants`](super::ContentFlowManager::open_grants).
#[derive(Debug, Clone, PartialEq)]
pub struct FlowRule {
    name: String,
    source: ChannelSelector,
    destination: ChannelSelector,
    grants: BTreeMap<EntityKind, Predicate>,
    organization_ids: Vec<RecordId>,
}

impl FlowRule {
    /// Creates a rule with no grants.
    pub fn new(
        name: impl Into<String>,
        source: impl Into<ChannelSelector>,
        destination: impl Into<ChannelSelector>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            destination: destination.into(),
            grants: BTreeMap::new(),
            organization_ids: Vec::new(),
        }
    }

    /// Grants visibility of `kind` records matching `predicate`. Granting the
    /// same kind twice replaces the earlier predicate.
    pub fn grant(mut self, kind: EntityKind, predicate: Predicate) -> Self {
        self.grants.insert(kind, predicate);
        self
    }

    /// Grants visibility of every `kind` record of the source.
    pub fn grant_all(self, kind: EntityKind) -> Self {
        self.grant(kind, Predicate::True)
    }

    /// Shares projects of the default channel whose `categories` contain
    /// `tag` with `destination`.
    pub fn shared_category(destination: ChannelSlug, tag: &str) -> Self {
        let name = format!("shared-category:{}->{}", tag, destination);
        Self::new(name, ChannelSlug::default_channel(), destination).grant(
            EntityKind::Project,
            Predicate::contains("categories", Value::String(tag.to_string())),
        )
    }

    /// Shares an allow-list of organizations from any channel with
    /// `destination`: the organizations themselves and their projects.
    pub fn organization_allow_list(
        destination: ChannelSlug,
        organization_ids: Vec<RecordId>,
    ) -> Self {
        let name = format!("organization-allow-list->{}", destination);
        let values: Vec<Value> = organization_ids
            .iter()
            .map(|id| Value::from(id.get()))
            .collect();
        let mut rule = Self::new(name, ChannelSelector::Any, destination)
            .grant(
                EntityKind::Project,
                Predicate::in_values("organization_id", values),
            )
            .grant(
                EntityKind::Organization,
                Predicate::ids_in(organization_ids.iter().copied()),
            );
        rule.organization_ids = organization_ids;
        rule
    }

    /// Returns the kinds this rule covers.
    pub fn kinds(&self) -> impl Iterator<Item = EntityKind> + '_ {
        self.grants.keys().copied()
    }

    /// Returns the allow-listed organizations, if this rule was built with
    /// [`organization_allow_list`](Self::organization_allow_list).
    pub fn organization_ids(&self) -> &[RecordId] {
        &self.organization_ids
    }
}

impl ContentFlow for FlowRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn source(&self) -> &ChannelSelector {
        &self.source
    }

    fn destination(&self) -> &ChannelSelector {
        &self.destination
    }

    fn predicate_for(&self, kind: EntityKind) -> Result<Predicate, NoApplicableFlow> {
        self.grants
            .get(&kind)
            .cloned()
            .ok_or_else(|| NoApplicableFlow {
                flow: self.name.clone(),
                kind,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_uncovered_kind_is_not_applicable() {
        let rule = FlowRule::shared_category(ChannelSlug::new("partner"), "shared");
        let err = rule.predicate_for(EntityKind::User).unwrap_err();
        assert_eq!(err.kind, EntityKind::User);
        assert!(rule.contribution(EntityKind::User).is_err());
    }

    #[test]
    fn test_shared_category_contribution() {
        let rule = FlowRule::shared_category(ChannelSlug::new("partner"), "shared");
        assert_eq!(rule.source(), &ChannelSelector::Channel(ChannelSlug::default_channel()));
        assert_eq!(
            rule.contribution(EntityKind::Project).unwrap(),
            Predicate::And(vec![
                Predicate::channel_is(&ChannelSlug::default_channel()),
                Predicate::contains("categories", json!("shared")),
            ])
        );
    }

    #[test]
    fn test_organization_allow_list() {
        let ids = vec![RecordId::new(1), RecordId::new(2), RecordId::new(3)];
        let rule = FlowRule::organization_allow_list(ChannelSlug::new("partner"), ids.clone());
        assert_eq!(rule.organization_ids(), ids.as_slice());
        assert_eq!(rule.source(), &ChannelSelector::Any);

        assert_eq!(
            rule.contribution(EntityKind::Project).unwrap(),
            Predicate::in_values("organization_id", vec![json!(1), json!(2), json!(3)])
        );
        assert_eq!(
            rule.predicate_for(EntityKind::Organization).unwrap(),
            Predicate::ids_in(ids)
        );
        assert!(rule.predicate_for(EntityKind::Job).is_err());
    }

    #[test]
    fn test_empty_allow_list_grants_nothing() {
        let rule = FlowRule::organization_allow_list(ChannelSlug::new("partner"), Vec::new());
        assert_eq!(
            rule.contribution(EntityKind::Project).unwrap(),
            Predicate::False
        );
    }

    #[test]
    fn test_grant_all_is_open() {
        let rule = FlowRule::new("open", ChannelSelector::Any, ChannelSlug::new("partner"))
            .grant_all(EntityKind::Cause);
        assert!(rule.predicate_for(EntityKind::Cause).unwrap().is_always_true());
        assert_eq!(rule.kinds().collect::<Vec<_>>(), vec![EntityKind::Cause]);
    }
}
