//! Query inputs: conditions, clauses and data objects
//!
//! Conditions are an ordered column → `Condition` list joined with AND.
//! Clauses carry sort/group/pagination directives for reads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DataError, Result};
use crate::types::ColumnType;

/// Column → value map written by INSERT/UPDATE
pub type DataObject = serde_json::Map<String, Value>;

/// Default page size when a page is requested without a size
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Default row count when an offset is given without a size
pub const DEFAULT_OFFSET_SIZE: u64 = 100;

// ============================================================================
// Operators and Conditions
// ============================================================================

/// Comparison operator of a single condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "LIKE")]
    Like,
}

impl Operator {
    /// SQL spelling of the operator
    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lte => "<=",
            Operator::Ne => "!=",
            Operator::In => "IN",
            Operator::Like => "LIKE",
        }
    }
}

impl std::str::FromStr for Operator {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "=" => Ok(Operator::Eq),
            "<" => Ok(Operator::Lt),
            ">" => Ok(Operator::Gt),
            ">=" => Ok(Operator::Gte),
            "<=" => Ok(Operator::Lte),
            "!=" => Ok(Operator::Ne),
            "IN" => Ok(Operator::In),
            "LIKE" => Ok(Operator::Like),
            other => Err(DataError::invalid_condition(format!(
                "Unknown operator '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A single column filter
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub operator: Operator,
    pub value: Value,
    /// Overrides the column type from the table model
    pub column_type: Option<ColumnType>,
}

impl Condition {
    pub fn new(operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            operator,
            value: value.into(),
            column_type: None,
        }
    }

    pub fn eq(value: impl Into<Value>) -> Self {
        Self::new(Operator::Eq, value)
    }

    pub fn with_type(mut self, column_type: ColumnType) -> Self {
        self.column_type = Some(column_type);
        self
    }

    /// Parse the positional `[value]`, `[op, value]` or `[op, value, type]` form
    fn from_tuple(column: &str, items: &[Value]) -> Result<Self> {
        match items {
            [value] => Ok(Self::eq(value.clone())),
            [op, value] => Ok(Self::new(parse_operator(column, op)?, value.clone())),
            [op, value, column_type] => {
                let column_type = column_type
                    .as_str()
                    .ok_or_else(|| {
                        DataError::invalid_condition(format!(
                            "Type of condition '{}' must be a string",
                            column
                        ))
                    })?
                    .parse::<ColumnType>()
                    .map_err(DataError::invalid_condition)?;
                Ok(Self::new(parse_operator(column, op)?, value.clone()).with_type(column_type))
            }
            _ => Err(DataError::invalid_condition(format!(
                "Condition '{}' must have 1 to 3 elements, got {}",
                column,
                items.len()
            ))),
        }
    }
}

fn parse_operator(column: &str, op: &Value) -> Result<Operator> {
    op.as_str()
        .ok_or_else(|| {
            DataError::invalid_condition(format!(
                "Operator of condition '{}' must be a string",
                column
            ))
        })?
        .parse()
}

/// Ordered set of column conditions, AND-joined
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions {
    entries: Vec<(String, Condition)>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a condition
    pub fn insert(&mut self, column: impl Into<String>, condition: Condition) {
        let column = column.into();
        match self.entries.iter_mut().find(|(c, _)| *c == column) {
            Some(existing) => existing.1 = condition,
            None => self.entries.push((column, condition)),
        }
    }

    /// Equality condition: column = value
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, Condition::eq(value));
        self
    }

    /// Condition with an explicit operator
    pub fn with(
        mut self,
        column: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Self {
        self.insert(column, Condition::new(operator, value));
        self
    }

    /// Condition with an explicit operator and column type
    pub fn typed(
        mut self,
        column: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
        column_type: ColumnType,
    ) -> Self {
        self.insert(column, Condition::new(operator, value).with_type(column_type));
        self
    }

    /// Parse a JSON conditions object
    ///
    /// Scalar values mean equality; arrays are positional
    /// `[value]`, `[op, value]` or `[op, value, type]` tuples.
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = match value {
            Value::Null => return Ok(Self::new()),
            Value::Object(obj) => obj,
            _ => {
                return Err(DataError::invalid_condition(
                    "Conditions must be a JSON object",
                ));
            }
        };

        let mut conditions = Self::new();
        for (column, raw) in obj {
            let condition = match raw {
                Value::Array(items) => Condition::from_tuple(column, items)?,
                other => Condition::eq(other.clone()),
            };
            conditions.insert(column.clone(), condition);
        }
        Ok(conditions)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, column: &str) -> Option<&Condition> {
        self.entries
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, cond)| cond)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.entries.iter().map(|(c, cond)| (c.as_str(), cond))
    }
}

// ============================================================================
// Clauses
// ============================================================================

/// Pagination request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitClause {
    pub page: Option<u64>,
    pub offset: Option<u64>,
    pub size: Option<u64>,
}

/// Pagination after defaults are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedLimit {
    pub offset: Option<u64>,
    pub size: u64,
}

impl LimitClause {
    /// Page-based pagination (1-based)
    pub fn page(page: u64, size: u64) -> Self {
        Self {
            page: Some(page),
            offset: None,
            size: Some(size),
        }
    }

    /// Plain row limit
    pub fn rows(size: u64) -> Self {
        Self {
            page: None,
            offset: None,
            size: Some(size),
        }
    }

    /// Apply the pagination rules
    ///
    /// A page always recomputes the offset as `(page - 1) * size`, with size
    /// defaulting to 20 and any supplied offset ignored. An offset alone
    /// defaults size to 100.
    pub fn resolve(&self) -> Option<ResolvedLimit> {
        match (self.page, self.offset, self.size) {
            (Some(page), _, size) => {
                let size = size.unwrap_or(DEFAULT_PAGE_SIZE);
                Some(ResolvedLimit {
                    offset: Some(page.saturating_sub(1).saturating_mul(size)),
                    size,
                })
            }
            (None, Some(offset), size) => Some(ResolvedLimit {
                offset: Some(offset),
                size: size.unwrap_or(DEFAULT_OFFSET_SIZE),
            }),
            (None, None, Some(size)) => Some(ResolvedLimit { offset: None, size }),
            (None, None, None) => None,
        }
    }
}

/// Sort, group and pagination directives of a read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clauses {
    /// Comma-separated columns, each optionally followed by ASC or DESC
    pub sort: Option<String>,
    /// Comma-separated columns
    pub group: Option<String>,
    pub limit: Option<LimitClause>,
}

impl Clauses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bare row limit
    pub fn rows(size: u64) -> Self {
        Self {
            limit: Some(LimitClause::rows(size)),
            ..Self::default()
        }
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn limit(mut self, limit: LimitClause) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Row count the statement will be limited to, if any
    pub fn effective_size(&self) -> Option<u64> {
        self.limit.and_then(|l| l.resolve()).map(|r| r.size)
    }

    /// Parse a JSON clauses value
    ///
    /// A number or numeric string is the legacy bare-limit form.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::Number(_) | Value::String(_) => Ok(Self::rows(parse_count("limit", value)?)),
            Value::Object(obj) => {
                let mut clauses = Self::new();
                if let Some(sort) = obj.get("sort").and_then(Value::as_str) {
                    clauses.sort = Some(sort.to_string());
                }
                if let Some(group) = obj.get("group").and_then(Value::as_str) {
                    clauses.group = Some(group.to_string());
                }
                match obj.get("limit") {
                    None | Some(Value::Null) => {}
                    Some(Value::Object(limit)) => {
                        let field = |name: &str| -> Result<Option<u64>> {
                            match limit.get(name) {
                                None | Some(Value::Null) => Ok(None),
                                Some(v) => parse_count(name, v).map(Some),
                            }
                        };
                        clauses.limit = Some(LimitClause {
                            page: field("page")?,
                            offset: field("offset")?,
                            size: field("size")?,
                        });
                    }
                    Some(other) => clauses.limit = Some(LimitClause::rows(parse_count("limit", other)?)),
                }
                Ok(clauses)
            }
            _ => Err(DataError::invalid_data("Clauses must be an object or a row limit")),
        }
    }
}

fn parse_count(name: &str, value: &Value) -> Result<u64> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        DataError::invalid_data(format!("'{}' must be a non-negative integer", name))
    })
}
