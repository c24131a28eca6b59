//! Clause building for SQL statements
//!
//! Compiles `Conditions` into a parameterized WHERE clause and validates the
//! sort, group and pagination directives of a read. Values never appear in the
//! clause text; they are returned in bind order next to it.

use serde_json::Value;

use crate::error::{DataError, Result};
use crate::metadata::TableMetadata;
use crate::query::{Condition, Conditions, LimitClause, Operator};
use crate::sql::convert::to_db;
use crate::sql::sanitize::quote_identifier;

/// Build the WHERE condition (without the `WHERE` keyword)
///
/// Returns `(clause, params)` where:
/// - `clause` joins one predicate per column with ` AND `, using `?` placeholders
/// - `params` holds the converted bind values in placeholder order
///
/// A `null` value compiles to the null-safe `col <=> ?`, negated as
/// `NOT (col <=> ?)` for any operator other than `=`. `IN` expands one
/// placeholder per element (comma-separated strings are split first) and
/// `LIKE` wraps its placeholder as `LIKE(?)`.
pub fn build_where_clause(
    metadata: &TableMetadata,
    conditions: &Conditions,
) -> Result<(String, Vec<Value>)> {
    let mut parts = Vec::with_capacity(conditions.len());
    let mut params = Vec::new();

    for (column, condition) in conditions.iter() {
        let (part, mut values) = build_predicate(metadata, column, condition)?;
        parts.push(part);
        params.append(&mut values);
    }

    Ok((parts.join(" AND "), params))
}

fn build_predicate(
    metadata: &TableMetadata,
    column: &str,
    condition: &Condition,
) -> Result<(String, Vec<Value>)> {
    let field = quote_identifier(column);
    let column_type = condition.column_type.or_else(|| metadata.column_type(column));

    if condition.value.is_null() {
        let clause = match condition.operator {
            Operator::Eq => format!("{} <=> ?", field),
            _ => format!("NOT ({} <=> ?)", field),
        };
        return Ok((clause, vec![Value::Null]));
    }

    match condition.operator {
        Operator::In => {
            let items = in_list(&condition.value);
            if items.is_empty() {
                return Err(DataError::invalid_condition(format!(
                    "IN condition on '{}' requires at least one value",
                    column
                )));
            }
            let placeholders = vec!["?"; items.len()].join(",");
            let values = items.iter().map(|v| to_db(column_type, v)).collect();
            Ok((format!("{} IN ({})", field, placeholders), values))
        }
        Operator::Like => Ok((
            format!("{} LIKE(?)", field),
            vec![to_db(column_type, &condition.value)],
        )),
        op => Ok((
            format!("{}{}?", field, op.as_sql()),
            vec![to_db(column_type, &condition.value)],
        )),
    }
}

/// Elements of an IN condition
fn in_list(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Value::String(s.to_string()))
            .collect(),
        other => vec![other.clone()],
    }
}

/// Build the ORDER BY list (without the `ORDER BY` keyword)
///
/// `sort` is a comma-separated list of columns, each optionally followed by
/// `ASC` or `DESC` (default `ASC`). Every column must belong to the table.
pub fn build_order_by_clause(sort: &str, metadata: &TableMetadata) -> Result<String> {
    let mut parts = Vec::new();

    for item in sort.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let mut tokens = item.split_whitespace();
        let column = tokens.next().unwrap_or_default();
        let order = tokens
            .next()
            .map(|s| s.to_uppercase())
            .unwrap_or_else(|| "ASC".to_string());

        if tokens.next().is_some() || (order != "ASC" && order != "DESC") {
            return Err(DataError::invalid_data(format!(
                "Invalid sort expression: '{}'",
                item
            )));
        }
        ensure_column(metadata, column)?;

        parts.push(format!("{} {}", quote_identifier(column), order));
    }

    Ok(parts.join(", "))
}

/// Build the GROUP BY list (without the `GROUP BY` keyword)
pub fn build_group_by_clause(group: &str, metadata: &TableMetadata) -> Result<String> {
    let mut parts = Vec::new();

    for column in group.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        ensure_column(metadata, column)?;
        parts.push(quote_identifier(column));
    }

    Ok(parts.join(", "))
}

/// Build the LIMIT clause, or `None` when no limit applies
pub fn build_limit_clause(limit: &LimitClause) -> Option<String> {
    limit.resolve().map(|resolved| match resolved.offset {
        Some(offset) => format!("LIMIT {}, {}", offset, resolved.size),
        None => format!("LIMIT {}", resolved.size),
    })
}

fn ensure_column(metadata: &TableMetadata, column: &str) -> Result<()> {
    if metadata.has_column(column) {
        Ok(())
    } else {
        Err(DataError::column_not_found(format!(
            "'{}' is not a column of '{}'",
            column,
            metadata.table_name()
        )))
    }
}
