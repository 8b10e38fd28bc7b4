//! Rendering of predicates to SQLite SQL.
//!
//! JSON fields are addressed through the JSON1 extension. Field conditions
//! go through `json_each`, which walks the elements of an array and yields a
//! scalar as a single row, so array fields match when any element matches.
//! Object-valued fields never match. The `id` and `channel` pseudo fields
//! map to columns.

use rusqlite::types::Value as SqlValue;
use serde_json::Value;

use crate::entity::{CHANNEL_FIELD, ID_FIELD};
use crate::error::{BackendError, StorageError, StorageResult};
use crate::query::{Predicate, Query};

/// A rendered SQL fragment with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SqlFragment {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl SqlFragment {
    fn literal(sql: &str) -> Self {
        Self {
            sql: sql.to_string(),
            params: Vec::new(),
        }
    }
}

fn query_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::QueryError { message })
}

/// Column list shared by every record select.
pub(crate) const RECORD_COLUMNS: &str = "r.id, r.kind, r.channel, r.data, r.created_at, r.updated_at";

/// Renders the `WHERE` clause of a query (kind restriction and predicate).
pub(crate) fn render_where(query: &Query) -> StorageResult<SqlFragment> {
    let predicate = render_predicate(query.predicate())?;
    let mut params = vec![SqlValue::Text(query.kind().as_str().to_string())];
    params.extend(predicate.params);
    Ok(SqlFragment {
        sql: format!("r.kind = ? AND ({})", predicate.sql),
        params,
    })
}

/// Renders a full `SELECT` for a query, ordered by id.
pub(crate) fn render_select(query: &Query) -> StorageResult<SqlFragment> {
    let clause = render_where(query)?;
    let mut sql = format!(
        "SELECT {}{} FROM records r WHERE {} ORDER BY r.id",
        if query.is_distinct() { "DISTINCT " } else { "" },
        RECORD_COLUMNS,
        clause.sql
    );
    let mut params = clause.params;
    if query.limit().is_some() || query.offset() > 0 {
        sql.push_str(" LIMIT ? OFFSET ?");
        let limit = query
            .limit()
            .map(|l| i64::try_from(l).unwrap_or(i64::MAX))
            .unwrap_or(-1);
        params.push(SqlValue::Integer(limit));
        params.push(SqlValue::Integer(
            i64::try_from(query.offset()).unwrap_or(i64::MAX),
        ));
    }
    Ok(SqlFragment { sql, params })
}

/// Renders a `SELECT COUNT` for a query.
pub(crate) fn render_count(query: &Query) -> StorageResult<SqlFragment> {
    let clause = render_where(query)?;
    Ok(SqlFragment {
        sql: format!(
            "SELECT COUNT(DISTINCT r.id) FROM records r WHERE {}",
            clause.sql
        ),
        params: clause.params,
    })
}

/// Renders a predicate to a boolean SQL expression.
pub(crate) fn render_predicate(predicate: &Predicate) -> StorageResult<SqlFragment> {
    match predicate {
        Predicate::True => Ok(SqlFragment::literal("1")),
        Predicate::False => Ok(SqlFragment::literal("0")),
        Predicate::Eq { field, value } => render_membership(field, std::slice::from_ref(value)),
        Predicate::In { field, values } => render_membership(field, values),
        Predicate::And(terms) => render_joined(terms, " AND ", "1"),
        Predicate::Or(terms) => render_joined(terms, " OR ", "0"),
        Predicate::Not(inner) => {
            let inner = render_predicate(inner)?;
            Ok(SqlFragment {
                sql: format!("NOT ({})", inner.sql),
                params: inner.params,
            })
        }
    }
}

fn render_joined(terms: &[Predicate], sep: &str, empty: &str) -> StorageResult<SqlFragment> {
    if terms.is_empty() {
        return Ok(SqlFragment::literal(empty));
    }
    let mut parts = Vec::with_capacity(terms.len());
    let mut params = Vec::new();
    for term in terms {
        let rendered = render_predicate(term)?;
        parts.push(format!("({})", rendered.sql));
        params.extend(rendered.params);
    }
    Ok(SqlFragment {
        sql: parts.join(sep),
        params,
    })
}

fn render_membership(field: &str, values: &[Value]) -> StorageResult<SqlFragment> {
    if values.is_empty() {
        return Ok(SqlFragment::literal("0"));
    }
    match field {
        ID_FIELD | CHANNEL_FIELD => render_column_membership(field, values),
        _ => render_json_membership(field, values),
    }
}

fn render_column_membership(column: &str, values: &[Value]) -> StorageResult<SqlFragment> {
    let params = values
        .iter()
        .map(|v| scalar_param(column, v))
        .collect::<StorageResult<Vec<_>>>()?;
    let placeholders = vec!["?"; params.len()].join(", ");
    Ok(SqlFragment {
        sql: format!("r.{} IN ({})", column, placeholders),
        params,
    })
}

fn render_json_membership(field: &str, values: &[Value]) -> StorageResult<SqlFragment> {
    if field.is_empty()
        || !field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(query_error(format!("invalid field name '{}'", field)));
    }

    let path = SqlValue::Text(format!("$.{}", field));
    let mut params = vec![path.clone(), path];
    let mut conditions = Vec::with_capacity(values.len());
    for value in values {
        match value {
            Value::Null => conditions.push("je.type = 'null'".to_string()),
            Value::Bool(true) => conditions.push("je.type = 'true'".to_string()),
            Value::Bool(false) => conditions.push("je.type = 'false'".to_string()),
            Value::String(_) => {
                conditions.push("(je.type = 'text' AND je.value = ?)".to_string());
                params.push(scalar_param(field, value)?);
            }
            Value::Number(_) => {
                conditions.push("(je.type IN ('integer', 'real') AND je.value = ?)".to_string());
                params.push(scalar_param(field, value)?);
            }
            Value::Array(_) | Value::Object(_) => {
                return Err(query_error(format!(
                    "field '{}' cannot be compared with a structured value",
                    field
                )));
            }
        }
    }

    Ok(SqlFragment {
        sql: format!(
            "(json_type(r.data, ?) IS NOT 'object' \
             AND EXISTS (SELECT 1 FROM json_each(r.data, ?) AS je WHERE {}))",
            conditions.join(" OR ")
        ),
        params,
    })
}

fn scalar_param(field: &str, value: &Value) -> StorageResult<SqlValue> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
        Value::String(s) => Ok(SqlValue::Text(s.clone())),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(SqlValue::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(SqlValue::Real(f))
            } else {
                Err(query_error(format!(
                    "number {} for field '{}' is out of range",
                    n, field
                )))
            }
        }
        Value::Array(_) | Value::Object(_) => Err(query_error(format!(
            "field '{}' cannot be compared with a structured value",
            field
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityKind;
    use crate::tenant::ChannelSlug;
    use serde_json::json;

    #[test]
    fn test_render_trivial() {
        assert_eq!(render_predicate(&Predicate::True).unwrap().sql, "1");
        assert_eq!(render_predicate(&Predicate::False).unwrap().sql, "0");
    }

    #[test]
    fn test_render_channel_column() {
        let fragment =
            render_predicate(&Predicate::channel_is(&ChannelSlug::new("partner"))).unwrap();
        assert_eq!(fragment.sql, "r.channel IN (?)");
        assert_eq!(fragment.params, vec![SqlValue::Text("partner".to_string())]);
    }

    #[test]
    fn test_render_json_membership() {
        let fragment =
            render_predicate(&Predicate::contains("categories", json!("shared"))).unwrap();
        assert!(fragment.sql.starts_with("(json_type(r.data, ?) IS NOT 'object'"));
        assert!(fragment.sql.contains("EXISTS (SELECT 1 FROM json_each(r.data, ?)"));
        assert_eq!(
            fragment.params,
            vec![
                SqlValue::Text("$.categories".to_string()),
                SqlValue::Text("$.categories".to_string()),
                SqlValue::Text("shared".to_string())
            ]
        );
    }

    #[test]
    fn test_render_or_of_terms() {
        let predicate = Predicate::or([
            Predicate::channel_is(&ChannelSlug::new("partner")),
            Predicate::in_values("organization_id", vec![json!(1), json!(2)]),
        ]);
        let fragment = render_predicate(&predicate).unwrap();
        assert!(fragment.sql.contains(" OR "));
        assert_eq!(fragment.params.len(), 5);
    }

    #[test]
    fn test_rejects_unsafe_field_names() {
        let err = render_predicate(&Predicate::eq("name') OR 1=1 --", json!("x"))).unwrap_err();
        assert!(matches!(
            err,
            StorageError::Backend(BackendError::QueryError { .. })
        ));
    }

    #[test]
    fn test_render_select_distinct_and_paging() {
        let query = Query::for_kind(EntityKind::Project)
            .with_distinct(true)
            .paginate(Some(10), 20);
        let fragment = render_select(&query).unwrap();
        assert!(fragment.sql.starts_with("SELECT DISTINCT "));
        assert!(fragment.sql.ends_with("ORDER BY r.id LIMIT ? OFFSET ?"));
        assert_eq!(fragment.params.len(), 3);
    }
}
