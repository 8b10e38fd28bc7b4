//! Query and predicate model.
//!
//! A [`Query`] selects records of one [`EntityKind`] with a composable
//! [`Predicate`]. Backends either evaluate predicates in memory
//! ([`Predicate::matches`]) or render them to their own query language.
//!
//! # Field semantics
//!
//! Field names address a record's JSON fields, except for the pseudo fields
//! `id` and `channel` which address its identity and owning channel. When a
//! field holds an array, [`Predicate::Eq`] and [`Predicate::In`] match if any
//! element matches; this is how membership in many-to-many relations such as
//! a project's categories is expressed.
//!
//! ```
//! use beacon_persistence::entity::EntityKind;
//! use beacon_persistence::query::{Predicate, Query};
//! use serde_json::json;
//!
//! let query = Query::for_kind(EntityKind::Project)
//!     .filter(Predicate::contains("categories", json!("shared")))
//!     .filter(Predicate::eq("published", json!(true)));
//! assert!(!query.predicate().is_always_true());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::{CHANNEL_FIELD, EntityKind, ID_FIELD, Record, RecordId};
use crate::tenant::ChannelSlug;

/// A composable filter over records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    /// Matches every record.
    True,
    /// Matches no record.
    False,
    /// Field equals a value (any element, for array fields).
    Eq { field: String, value: Value },
    /// Field is one of the values (any element, for array fields).
    In { field: String, values: Vec<Value> },
    /// All sub-predicates match.
    And(Vec<Predicate>),
    /// At least one sub-predicate matches.
    Or(Vec<Predicate>),
    /// The sub-predicate does not match.
    Not(Box<Predicate>),
}

impl Predicate {
    /// Field equality.
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Predicate::Eq {
            field: field.into(),
            value,
        }
    }

    /// Field membership. An empty set matches nothing.
    pub fn in_values(field: impl Into<String>, values: Vec<Value>) -> Self {
        if values.is_empty() {
            return Predicate::False;
        }
        Predicate::In {
            field: field.into(),
            values,
        }
    }

    /// Array field contains `value`.
    pub fn contains(field: impl Into<String>, value: Value) -> Self {
        Predicate::In {
            field: field.into(),
            values: vec![value],
        }
    }

    /// Record is owned by `channel`.
    pub fn channel_is(channel: &ChannelSlug) -> Self {
        Predicate::eq(CHANNEL_FIELD, Value::String(channel.as_str().to_string()))
    }

    /// Record is owned by one of `channels`.
    pub fn channel_in<'a>(channels: impl IntoIterator<Item = &'a ChannelSlug>) -> Self {
        Predicate::in_values(
            CHANNEL_FIELD,
            channels
                .into_iter()
                .map(|c| Value::String(c.as_str().to_string()))
                .collect(),
        )
    }

    /// Record id is one of `ids`.
    pub fn ids_in(ids: impl IntoIterator<Item = RecordId>) -> Self {
        Predicate::in_values(ID_FIELD, ids.into_iter().map(|id| Value::from(id.get())).collect())
    }

    /// Conjunction, simplified: `True` terms are dropped, any `False` term
    /// collapses the result, nested conjunctions are flattened.
    pub fn and(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        let mut terms = Vec::new();
        for predicate in predicates {
            match predicate {
                Predicate::True => {}
                Predicate::False => return Predicate::False,
                Predicate::And(inner) => terms.extend(inner),
                other => terms.push(other),
            }
        }
        match terms.len() {
            0 => Predicate::True,
            1 => terms.remove(0),
            _ => Predicate::And(terms),
        }
    }

    /// Disjunction, simplified: `False` terms are dropped, any `True` term
    /// collapses the result, nested disjunctions are flattened.
    pub fn or(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        let mut terms = Vec::new();
        for predicate in predicates {
            match predicate {
                Predicate::False => {}
                Predicate::True => return Predicate::True,
                Predicate::Or(inner) => terms.extend(inner),
                other => terms.push(other),
            }
        }
        match terms.len() {
            0 => Predicate::False,
            1 => terms.remove(0),
            _ => Predicate::Or(terms),
        }
    }

    /// Negation.
    #[allow(clippy::should_implement_trait)]
    pub fn not(predicate: Predicate) -> Self {
        match predicate {
            Predicate::True => Predicate::False,
            Predicate::False => Predicate::True,
            Predicate::Not(inner) => *inner,
            other => Predicate::Not(Box::new(other)),
        }
    }

    /// Returns `true` for the unrestricted predicate.
    pub fn is_always_true(&self) -> bool {
        matches!(self, Predicate::True)
    }

    /// Returns `true` for the predicate that matches nothing.
    pub fn is_always_false(&self) -> bool {
        matches!(self, Predicate::False)
    }

    /// Evaluates the predicate against a record.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Predicate::True => true,
            Predicate::False => false,
            Predicate::Eq { field, value } => record
                .lookup(field)
                .is_some_and(|actual| any_element(&actual, |v| scalar_eq(v, value))),
            Predicate::In { field, values } => record
                .lookup(field)
                .is_some_and(|actual| {
                    any_element(&actual, |v| values.iter().any(|value| scalar_eq(v, value)))
                }),
            Predicate::And(terms) => terms.iter().all(|p| p.matches(record)),
            Predicate::Or(terms) => terms.iter().any(|p| p.matches(record)),
            Predicate::Not(inner) => !inner.matches(record),
        }
    }
}

/// Applies `test` to a scalar, or to each element of an array. Objects
/// never match.
fn any_element(value: &Value, test: impl Fn(&Value) -> bool) -> bool {
    match value {
        Value::Array(items) => items.iter().any(test),
        Value::Object(_) => false,
        scalar => test(scalar),
    }
}

/// Compares two JSON values, treating numbers by numeric value (`4 == 4.0`).
fn scalar_eq(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => a == b,
            _ => a.as_f64().is_some_and(|a| b.as_f64() == Some(a)),
        },
        (Value::Array(_) | Value::Object(_), _) => false,
        _ => actual == expected,
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::True => write!(f, "TRUE"),
            Predicate::False => write!(f, "FALSE"),
            Predicate::Eq { field, value } => write!(f, "{} = {}", field, value),
            Predicate::In { field, values } => {
                write!(f, "{} IN [", field)?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Predicate::And(terms) => write_joined(f, terms, " AND "),
            Predicate::Or(terms) => write_joined(f, terms, " OR "),
            Predicate::Not(inner) => write!(f, "NOT ({})", inner),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, terms: &[Predicate], sep: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, term) in terms.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        write!(f, "{}", term)?;
    }
    write!(f, ")")
}

/// A query over the records of one entity kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    kind: EntityKind,
    predicate: Predicate,
    distinct: bool,
    limit: Option<usize>,
    offset: usize,
}

impl Query {
    /// Selects every record of `kind`.
    pub fn for_kind(kind: EntityKind) -> Self {
        Self {
            kind,
            predicate: Predicate::True,
            distinct: false,
            limit: None,
            offset: 0,
        }
    }

    /// Narrows the query with an additional conjunct.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        let current = std::mem::replace(&mut self.predicate, Predicate::True);
        self.predicate = Predicate::and([current, predicate]);
        self
    }

    /// Requests (or clears) deduplication by record identity.
    pub fn with_distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    /// Limits the result window.
    pub fn paginate(mut self, limit: Option<usize>, offset: usize) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    /// Returns the entity kind.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Returns the predicate.
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// Returns `true` if results must be deduplicated by identity.
    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    /// Returns the page size, if any.
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Returns the number of records to skip.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns `true` if the record is selected by this query, ignoring
    /// pagination.
    pub fn matches(&self, record: &Record) -> bool {
        record.kind() == self.kind && self.predicate.matches(record)
    }
}
