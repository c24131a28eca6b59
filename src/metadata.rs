//! Table metadata
//!
//! A `TableMetadata` is derived once from a table name and column model and is
//! shared read-only by every operation of the DAO that owns it.

use serde::{Deserialize, Serialize};

use crate::error::{DataError, Result};
use crate::sql::sanitize::{quote_identifier, validate_identifier};
use crate::types::{ColumnDescriptor, ColumnType};

/// Ordered column model of a table
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TableModel {
    columns: Vec<(String, ColumnDescriptor)>,
}

impl TableModel {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column (replaces an existing column of the same name)
    pub fn column(mut self, name: impl Into<String>, descriptor: ColumnDescriptor) -> Self {
        let name = name.into();
        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = descriptor,
            None => self.columns.push((name, descriptor)),
        }
        self
    }

    /// Build a model from a JSON object of `{column: descriptor}`
    pub fn from_json(model: &serde_json::Value) -> Result<Self> {
        let obj = model
            .as_object()
            .ok_or_else(|| DataError::configuration("Table model must be a JSON object"))?;

        let mut table_model = Self::new();
        for (name, descriptor) in obj {
            let descriptor: ColumnDescriptor = serde_json::from_value(descriptor.clone())
                .map_err(|e| {
                    DataError::configuration(format!("Invalid descriptor for '{}': {}", name, e))
                })?;
            table_model = table_model.column(name.clone(), descriptor);
        }
        Ok(table_model)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnDescriptor)> {
        self.columns.iter().map(|(n, d)| (n.as_str(), d))
    }
}

/// Immutable schema descriptor of one table
#[derive(Debug, Clone, PartialEq)]
pub struct TableMetadata {
    table_name: String,
    quoted_table_name: String,
    table_model: TableModel,
    columns: Vec<String>,
    editable_columns: Vec<String>,
    auto_increment_column: Option<String>,
}

/// Derive table metadata from a table name and column model
///
/// Fails with a configuration error when the name or model is empty, or when
/// more than one column is marked auto-increment.
pub fn create_metadata(table_name: &str, table_model: TableModel) -> Result<TableMetadata> {
    if table_name.trim().is_empty() {
        return Err(DataError::configuration("Table name is required"));
    }
    if table_model.is_empty() {
        return Err(DataError::configuration(format!(
            "Table model is required for '{}'",
            table_name
        )));
    }

    validate_identifier(table_name).map_err(DataError::configuration)?;

    let mut auto_increment_column = None;
    for (name, descriptor) in table_model.iter() {
        validate_identifier(name).map_err(|e| {
            DataError::configuration(format!("Invalid column in '{}': {}", table_name, e))
        })?;
        if descriptor.auto_increment {
            if let Some(existing) = &auto_increment_column {
                return Err(DataError::configuration(format!(
                    "Table '{}' has more than one autoIncrement column ('{}', '{}')",
                    table_name, existing, name
                )));
            }
            auto_increment_column = Some(name.to_string());
        }
    }

    let columns: Vec<String> = table_model.iter().map(|(n, _)| n.to_string()).collect();
    let editable_columns = table_model
        .iter()
        .filter(|(_, d)| d.is_editable())
        .map(|(n, _)| n.to_string())
        .collect();

    Ok(TableMetadata {
        table_name: table_name.to_string(),
        quoted_table_name: quote_identifier(table_name),
        table_model,
        columns,
        editable_columns,
        auto_increment_column,
    })
}

impl TableMetadata {
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Table name escaped for MySQL
    pub fn quoted_table_name(&self) -> &str {
        &self.quoted_table_name
    }

    pub fn table_model(&self) -> &TableModel {
        &self.table_model
    }

    /// All column names in model order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Columns eligible for INSERT/UPDATE payloads
    pub fn editable_columns(&self) -> &[String] {
        &self.editable_columns
    }

    pub fn auto_increment_column(&self) -> Option<&str> {
        self.auto_increment_column.as_deref()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn descriptor(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.table_model
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, d)| d)
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.descriptor(name).and_then(|d| d.column_type)
    }
}
