//! List parameters.
//!
//! Parses the query string of list requests: `_count` and `_offset` for
//! pagination, every other `field=value` pair as an equality filter.

use beacon_persistence::query::{Predicate, Query};
use serde_json::Value;
use thiserror::Error;

use crate::error::RestError;

/// Name of the page size parameter.
pub const COUNT_PARAM: &str = "_count";

/// Name of the offset parameter.
pub const OFFSET_PARAM: &str = "_offset";

/// A malformed list parameter.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamError {
    /// A pagination parameter is not a non-negative integer.
    #[error("parameter '{name}' must be a non-negative integer, got '{value}'")]
    InvalidNumber {
        /// The parameter name.
        name: String,
        /// The supplied value.
        value: String,
    },

    /// A filter names something other than a plain field.
    #[error("invalid filter field '{name}'")]
    InvalidField {
        /// The parameter name.
        name: String,
    },

    /// A parameter starting with `_` that is not understood.
    #[error("unknown parameter '{name}'")]
    Unknown {
        /// The parameter name.
        name: String,
    },
}

impl From<ParamError> for RestError {
    fn from(err: ParamError) -> Self {
        RestError::BadRequest {
            message: err.to_string(),
        }
    }
}

/// Parsed list parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ListParams {
    filters: Vec<(String, Value)>,
    count: usize,
    offset: usize,
}

impl ListParams {
    /// Parameters with no filters and the given page size.
    pub fn new(count: usize) -> Self {
        Self {
            filters: Vec::new(),
            count,
            offset: 0,
        }
    }

    /// Parses query-string pairs.
    ///
    /// `_count` is clamped to `max_count`; a missing `_count` means
    /// `default_count`. Filter values that read as JSON scalars (`true`,
    /// `4`, `null`) are compared as such, anything else as a string.
    ///
    /// # Errors
    ///
    /// Returns a [`ParamError`] for malformed pagination values, field names
    /// outside `[A-Za-z0-9_]` and unknown `_`-prefixed parameters.
    pub fn parse(
        pairs: &[(String, String)],
        default_count: usize,
        max_count: usize,
    ) -> Result<Self, ParamError> {
        let mut params = Self::new(default_count.min(max_count));
        for (name, value) in pairs {
            match name.as_str() {
                COUNT_PARAM => params.count = parse_number(name, value)?.min(max_count),
                OFFSET_PARAM => params.offset = parse_number(name, value)?,
                _ if name.starts_with('_') => {
                    return Err(ParamError::Unknown { name: name.clone() });
                }
                _ if !is_field_name(name) => {
                    return Err(ParamError::InvalidField { name: name.clone() });
                }
                _ => params.filters.push((name.clone(), filter_value(value))),
            }
        }
        Ok(params)
    }

    /// Returns the equality filters in query-string order.
    pub fn filters(&self) -> &[(String, Value)] {
        &self.filters
    }

    /// Returns the page size.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns the offset.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Adds the filters and pagination to `query`.
    pub fn apply(&self, query: Query) -> Query {
        let predicate = Predicate::and(
            self.filters
                .iter()
                .map(|(field, value)| Predicate::eq(field.clone(), value.clone())),
        );
        query
            .filter(predicate)
            .paginate(Some(self.count), self.offset)
    }
}

fn parse_number(name: &str, value: &str) -> Result<usize, ParamError> {
    value.trim().parse().map_err(|_| ParamError::InvalidNumber {
        name: name.to_string(),
        value: value.to_string(),
    })
}

fn is_field_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn filter_value(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Bool(_) | Value::Number(_) | Value::Null)) => value,
        _ => Value::String(raw.to_string()),
    }
}
