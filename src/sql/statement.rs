//! Parameterized statement compilation
//!
//! Every `get_sql_*` function is pure: it turns table metadata plus
//! conditions, data and clauses into SQL text with `?` placeholders and the
//! matching bind values. Nothing is sent to a database here.

use serde_json::Value;

use crate::error::{DataError, Result};
use crate::metadata::TableMetadata;
use crate::objects::object_cleanup;
use crate::query::{Clauses, Conditions, DataObject};
use crate::sql::condition::{
    build_group_by_clause, build_limit_clause, build_order_by_clause, build_where_clause,
};
use crate::sql::convert::to_db;
use crate::sql::sanitize::quote_identifier;

/// What a statement does, which decides how a session executes it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

/// SQL text plus ordered bind values
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub sql: String,
    pub values: Vec<Value>,
}

impl Statement {
    pub fn new(kind: StatementKind, sql: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            kind,
            sql: sql.into(),
            values,
        }
    }

    /// Whether the statement returns rows
    pub fn returns_rows(&self) -> bool {
        self.kind == StatementKind::Select
    }
}

/// Compile a SELECT returning one JSON object per row
///
/// `columns` defaults to every column of the table. Fails with
/// `QueryConditionsRequired` when `conditions` is empty and the effective row
/// limit is exactly 1.
pub fn get_sql_select(
    metadata: &TableMetadata,
    conditions: &Conditions,
    columns: Option<&[String]>,
    clauses: &Clauses,
) -> Result<Statement> {
    if conditions.is_empty() && clauses.effective_size() == Some(1) {
        return Err(DataError::conditions_required(format!(
            "Single-row read on '{}' requires conditions",
            metadata.table_name()
        )));
    }

    let columns = match columns {
        Some(cols) if !cols.is_empty() => {
            for column in cols {
                if !metadata.has_column(column) {
                    return Err(DataError::column_not_found(format!(
                        "'{}' is not a column of '{}'",
                        column,
                        metadata.table_name()
                    )));
                }
            }
            cols
        }
        _ => metadata.columns(),
    };

    let mut sql = format!(
        "SELECT {} FROM {}",
        json_object_expr(columns),
        metadata.quoted_table_name()
    );
    let mut values = Vec::new();

    push_where(&mut sql, &mut values, metadata, conditions)?;

    if let Some(group) = clauses.group.as_deref() {
        let group_by = build_group_by_clause(group, metadata)?;
        if !group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&group_by);
        }
    }

    if let Some(sort) = clauses.sort.as_deref() {
        let order_by = build_order_by_clause(sort, metadata)?;
        if !order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order_by);
        }
    }

    if let Some(limit) = clauses.limit.as_ref().and_then(build_limit_clause) {
        sql.push(' ');
        sql.push_str(&limit);
    }

    Ok(Statement::new(StatementKind::Select, sql, values))
}

/// Compile `SELECT JSON_OBJECT('count',COUNT(*))` over the matching rows
pub fn get_sql_count(metadata: &TableMetadata, conditions: &Conditions) -> Result<Statement> {
    let mut sql = format!(
        "SELECT JSON_OBJECT('count',COUNT(*)) FROM {}",
        metadata.quoted_table_name()
    );
    let mut values = Vec::new();
    push_where(&mut sql, &mut values, metadata, conditions)?;

    Ok(Statement::new(StatementKind::Select, sql, values))
}

/// Compile an INSERT of the editable columns present in `data`
pub fn get_sql_insert(metadata: &TableMetadata, data: &DataObject) -> Result<Statement> {
    let (columns, values) = editable_values(metadata, data)?;

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        metadata.quoted_table_name(),
        quoted_list(&columns),
        vec!["?"; columns.len()].join(",")
    );

    Ok(Statement::new(StatementKind::Insert, sql, values))
}

/// Compile an atomic insert-or-update
///
/// Relies on the table's primary or unique keys: a conflicting row has every
/// inserted column overwritten with the new value.
pub fn get_sql_upsert(metadata: &TableMetadata, data: &DataObject) -> Result<Statement> {
    let (columns, values) = editable_values(metadata, data)?;

    let updates = columns
        .iter()
        .map(|c| {
            let q = quote_identifier(c);
            format!("{}=VALUES({})", q, q)
        })
        .collect::<Vec<_>>()
        .join(",");

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) ON DUPLICATE KEY UPDATE {}",
        metadata.quoted_table_name(),
        quoted_list(&columns),
        vec!["?"; columns.len()].join(","),
        updates
    );

    Ok(Statement::new(StatementKind::Insert, sql, values))
}

/// Compile an UPDATE of the editable columns present in `data`
///
/// Data values bind before condition values. An empty condition set
/// compiles without a WHERE clause.
pub fn get_sql_update(
    metadata: &TableMetadata,
    data: &DataObject,
    conditions: &Conditions,
    limit: Option<u64>,
) -> Result<Statement> {
    let (columns, mut values) = editable_values(metadata, data)?;

    let assignments = columns
        .iter()
        .map(|c| format!("{}=?", quote_identifier(c)))
        .collect::<Vec<_>>()
        .join(",");

    let mut sql = format!(
        "UPDATE {} SET {}",
        metadata.quoted_table_name(),
        assignments
    );
    push_where(&mut sql, &mut values, metadata, conditions)?;
    push_limit(&mut sql, limit);

    Ok(Statement::new(StatementKind::Update, sql, values))
}

/// Compile a DELETE of the matching rows
///
/// An empty condition set is rejected with `QueryConditionsRequired`.
pub fn get_sql_delete(
    metadata: &TableMetadata,
    conditions: &Conditions,
    limit: Option<u64>,
) -> Result<Statement> {
    require_conditions(metadata, conditions, "delete")?;

    let mut sql = format!("DELETE FROM {}", metadata.quoted_table_name());
    let mut values = Vec::new();
    push_where(&mut sql, &mut values, metadata, conditions)?;
    push_limit(&mut sql, limit);

    Ok(Statement::new(StatementKind::Delete, sql, values))
}

// ============================================================================
// Helpers
// ============================================================================

/// `JSON_OBJECT('a',a,'b',b)` over the given columns
fn json_object_expr(columns: &[String]) -> String {
    let pairs = columns
        .iter()
        .map(|c| format!("'{}',{}", c.replace('\'', "''"), quote_identifier(c)))
        .collect::<Vec<_>>()
        .join(",");
    format!("JSON_OBJECT({})", pairs)
}

fn quoted_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(",")
}

/// Editable columns present in `data` (model order) and their converted values
fn editable_values(
    metadata: &TableMetadata,
    data: &DataObject,
) -> Result<(Vec<String>, Vec<Value>)> {
    let cleaned = object_cleanup(data, metadata.editable_columns());
    if cleaned.is_empty() {
        return Err(DataError::invalid_data(format!(
            "No editable columns of '{}' in data",
            metadata.table_name()
        )));
    }

    let mut columns = Vec::with_capacity(cleaned.len());
    let mut values = Vec::with_capacity(cleaned.len());
    for column in metadata.editable_columns() {
        if let Some(value) = cleaned.get(column) {
            values.push(to_db(metadata.column_type(column), value));
            columns.push(column.clone());
        }
    }
    Ok((columns, values))
}

fn require_conditions(metadata: &TableMetadata, conditions: &Conditions, action: &str) -> Result<()> {
    if conditions.is_empty() {
        return Err(DataError::conditions_required(format!(
            "Refusing to {} every row of '{}'",
            action,
            metadata.table_name()
        )));
    }
    Ok(())
}

fn push_where(
    sql: &mut String,
    values: &mut Vec<Value>,
    metadata: &TableMetadata,
    conditions: &Conditions,
) -> Result<()> {
    if conditions.is_empty() {
        return Ok(());
    }
    let (clause, mut params) = build_where_clause(metadata, conditions)?;
    sql.push_str(" WHERE ");
    sql.push_str(&clause);
    values.append(&mut params);
    Ok(())
}

fn push_limit(sql: &mut String, limit: Option<u64>) {
    if let Some(n) = limit {
        sql.push_str(&format!(" LIMIT {}", n));
    }
}
