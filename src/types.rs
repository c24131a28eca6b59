//! Core type definitions
//!
//! Includes column types, column descriptors, and the action kinds passed to
//! validation hooks.

use serde::{Deserialize, Serialize};

// ============================================================================
// Column Types
// ============================================================================

/// Column type used for value coercion and validation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Free text
    String,
    /// Integer or floating point number
    Number,
    /// Date/time, stored as a SQL datetime string
    Date,
    /// Text that must look like an email address
    Email,
    /// Non-blank text, trimmed on validation
    Title,
    /// JSON document, stored as text
    Json,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Number => "number",
            ColumnType::Date => "date",
            ColumnType::Email => "email",
            ColumnType::Title => "title",
            ColumnType::Json => "json",
        }
    }
}

impl std::str::FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "string" => Ok(ColumnType::String),
            "number" => Ok(ColumnType::Number),
            "date" => Ok(ColumnType::Date),
            "email" => Ok(ColumnType::Email),
            "title" => Ok(ColumnType::Title),
            "json" => Ok(ColumnType::Json),
            other => Err(format!("Unknown column type: '{}'", other)),
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Column Descriptors
// ============================================================================

/// Descriptor for one column of a table model
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// Database-assigned sequence column (at most one per table)
    #[serde(default, rename = "autoIncrement")]
    pub auto_increment: bool,

    /// Value computed by the database, never written by callers
    #[serde(default)]
    pub generated: bool,

    /// Optional type used for coercion and validation
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub column_type: Option<ColumnType>,
}

impl ColumnDescriptor {
    /// Untyped, editable column
    pub fn new() -> Self {
        Self::default()
    }

    /// Editable column with a type
    pub fn typed(column_type: ColumnType) -> Self {
        Self {
            column_type: Some(column_type),
            ..Self::default()
        }
    }

    /// Mark as the auto-increment column
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Mark as generated by the database
    pub fn generated(mut self) -> Self {
        self.generated = true;
        self
    }

    /// Set the column type
    pub fn with_type(mut self, column_type: ColumnType) -> Self {
        self.column_type = Some(column_type);
        self
    }

    /// Auto-increment columns are implicitly generated
    pub fn is_generated(&self) -> bool {
        self.generated || self.auto_increment
    }

    /// Whether the column may appear in INSERT/UPDATE payloads
    pub fn is_editable(&self) -> bool {
        !self.is_generated()
    }
}

// ============================================================================
// Action Types
// ============================================================================

/// Operation kind handed to validation hooks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Read,
    Add,
    Modify,
    Remove,
    Merge,
}

impl ActionType {
    /// Actions that write a data object
    pub fn is_editing(&self) -> bool {
        matches!(self, ActionType::Add | ActionType::Modify | ActionType::Merge)
    }

    /// Actions that delete rows
    pub fn is_removing(&self) -> bool {
        matches!(self, ActionType::Remove)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Read => "read",
            ActionType::Add => "add",
            ActionType::Modify => "modify",
            ActionType::Remove => "remove",
            ActionType::Merge => "merge",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
