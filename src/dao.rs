//! Single-table data access object
//!
//! A `Dao` binds one `TableMetadata` to connection-scoped operations. Every
//! call runs validate → compile → execute → post-process and fails with the
//! most specific `DataError` kind, logged once where it is detected.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

use crate::connection::{DbConnection, execute_sql};
use crate::error::{DataError, Result};
use crate::metadata::TableMetadata;
use crate::objects::object_cleanup;
use crate::query::{Clauses, Conditions, DataObject};
use crate::sql::convert::{parse_date, row_from_db};
use crate::sql::{
    get_sql_count, get_sql_delete, get_sql_insert, get_sql_select, get_sql_update,
    get_sql_upsert,
};
use crate::types::{ActionType, ColumnType};

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

/// Result of a delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveResult {
    pub record_count: u64,
}

// ============================================================================
// Validation
// ============================================================================

/// Validation hook run before every DAO operation
///
/// Returns the data object the operation continues with, which may be
/// normalized. Read and remove actions receive an empty data object.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(
        &self,
        metadata: &TableMetadata,
        action: ActionType,
        data: DataObject,
        conditions: &Conditions,
    ) -> Result<DataObject>;
}

/// Checks written values against the column types of the table model
///
/// - `number`: a JSON number or a numeric string
/// - `email`: an address of the form `local@domain.tld`
/// - `date`: any value the date coercion accepts
/// - `title`: a non-blank string, stored trimmed
/// - `string`: a scalar
/// - `json`: anything
///
/// Nulls and untyped columns always pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelValidator;

impl ModelValidator {
    fn check(column: &str, column_type: ColumnType, value: Value) -> Result<Value> {
        let invalid = |expected: &str| {
            DataError::invalid_data(format!("Column '{}' expects {}", column, expected))
        };

        match (column_type, value) {
            (_, Value::Null) => Ok(Value::Null),
            (ColumnType::Json, v) => Ok(v),
            (ColumnType::Number, Value::Number(n)) => Ok(Value::Number(n)),
            (ColumnType::Number, Value::String(s))
                if s.trim().parse::<f64>().is_ok_and(f64::is_finite) =>
            {
                Ok(Value::String(s))
            }
            (ColumnType::Number, _) => Err(invalid("a number")),
            (ColumnType::Email, Value::String(s)) if EMAIL_PATTERN.is_match(s.trim()) => {
                Ok(Value::String(s.trim().to_string()))
            }
            (ColumnType::Email, _) => Err(invalid("an email address")),
            (ColumnType::Date, v) if parse_date(&v).is_some() => Ok(v),
            (ColumnType::Date, _) => Err(invalid("a date")),
            (ColumnType::Title, Value::String(s)) if !s.trim().is_empty() => {
                Ok(Value::String(s.trim().to_string()))
            }
            (ColumnType::Title, _) => Err(invalid("a non-blank title")),
            (ColumnType::String, v @ (Value::String(_) | Value::Number(_) | Value::Bool(_))) => {
                Ok(v)
            }
            (ColumnType::String, _) => Err(invalid("a scalar value")),
        }
    }
}

#[async_trait]
impl Validator for ModelValidator {
    async fn validate(
        &self,
        metadata: &TableMetadata,
        action: ActionType,
        data: DataObject,
        _conditions: &Conditions,
    ) -> Result<DataObject> {
        if !action.is_editing() {
            return Ok(data);
        }

        data.into_iter()
            .map(|(column, value)| match metadata.column_type(&column) {
                Some(column_type) => {
                    Self::check(&column, column_type, value).map(|v| (column, v))
                }
                None => Ok((column, value)),
            })
            .collect()
    }
}

// ============================================================================
// DAO
// ============================================================================

/// Data access object for one table
#[derive(Clone)]
pub struct Dao {
    metadata: Arc<TableMetadata>,
    validator: Arc<dyn Validator>,
}

impl std::fmt::Debug for Dao {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dao")
            .field("table", &self.metadata.table_name())
            .finish_non_exhaustive()
    }
}

impl Dao {
    /// Create a DAO validating with `ModelValidator`
    pub fn new(metadata: TableMetadata) -> Self {
        Self {
            metadata: Arc::new(metadata),
            validator: Arc::new(ModelValidator),
        }
    }

    /// Replace the validation hook
    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn metadata(&self) -> &TableMetadata {
        &self.metadata
    }

    fn table(&self) -> &str {
        self.metadata.table_name()
    }

    /// Log an error detected in this layer and hand it back
    fn reject(&self, operation: &str, err: DataError) -> DataError {
        error!(
            table = self.table(),
            operation,
            code = err.code(),
            status = err.status(),
            error = %err,
            "DAO operation rejected"
        );
        err
    }

    async fn validate(
        &self,
        action: ActionType,
        data: DataObject,
        conditions: &Conditions,
    ) -> Result<DataObject> {
        self.validator
            .validate(&self.metadata, action, data, conditions)
            .await
            .map_err(|e| self.reject(action.as_str(), e))
    }

    // ==================== Reads ====================

    /// Read matching rows, converted per the table model
    pub async fn read(
        &self,
        cn: &DbConnection,
        conditions: &Conditions,
        columns: Option<&[String]>,
        clauses: &Clauses,
    ) -> Result<Vec<DataObject>> {
        self.validate(ActionType::Read, DataObject::new(), conditions)
            .await?;

        let statement = get_sql_select(&self.metadata, conditions, columns, clauses)
            .map_err(|e| self.reject("read", e))?;
        let result = execute_sql(cn, &statement, self.table()).await?;

        Ok(result
            .into_rows()
            .into_iter()
            .map(|row| row_from_db(&self.metadata, row))
            .collect())
    }

    /// Read the first matching row, or `None`
    ///
    /// Fails with `QueryConditionsRequired` when `conditions` is empty.
    pub async fn read_one(
        &self,
        cn: &DbConnection,
        conditions: &Conditions,
        columns: Option<&[String]>,
    ) -> Result<Option<DataObject>> {
        let rows = self.read(cn, conditions, columns, &Clauses::rows(1)).await?;
        Ok(rows.into_iter().next())
    }

    /// Count matching rows
    pub async fn count(&self, cn: &DbConnection, conditions: &Conditions) -> Result<u64> {
        self.validate(ActionType::Read, DataObject::new(), conditions)
            .await?;

        let statement =
            get_sql_count(&self.metadata, conditions).map_err(|e| self.reject("count", e))?;
        let result = execute_sql(cn, &statement, self.table()).await?;

        Ok(result
            .rows()
            .first()
            .and_then(|row| row.get("count"))
            .and_then(Value::as_u64)
            .unwrap_or(0))
    }

    // ==================== Writes ====================

    /// Insert a row
    ///
    /// Returns the editable part of the validated data plus, when the table
    /// has an auto-increment column and a key was generated, that key.
    pub async fn add(&self, cn: &DbConnection, data: DataObject) -> Result<DataObject> {
        let data = self
            .validate(ActionType::Add, data, &Conditions::new())
            .await?;
        self.insert_validated(cn, data).await
    }

    /// Atomic insert-or-update on the table's unique keys
    pub async fn upsert(&self, cn: &DbConnection, data: DataObject) -> Result<DataObject> {
        let data = self
            .validate(ActionType::Merge, data, &Conditions::new())
            .await?;

        let statement =
            get_sql_upsert(&self.metadata, &data).map_err(|e| self.reject("upsert", e))?;
        let result = execute_sql(cn, &statement, self.table()).await?;

        Ok(self.with_generated_key(
            object_cleanup(&data, self.metadata.editable_columns()),
            result.auto_increment_value(),
        ))
    }

    /// Update matching rows
    ///
    /// Returns `None` when no row was affected.
    pub async fn modify(
        &self,
        cn: &DbConnection,
        data: DataObject,
        conditions: &Conditions,
        limit: Option<u64>,
    ) -> Result<Option<DataObject>> {
        let data = self.validate(ActionType::Modify, data, conditions).await?;
        self.update_validated(cn, data, conditions, limit).await
    }

    /// Update matching rows, inserting when none matched
    ///
    /// The update and the insert are separate statements: two concurrent
    /// merges on the same missing key can both miss the update and one insert
    /// then fails with `DuplicateEntry`. Use `upsert` when that matters.
    pub async fn merge(
        &self,
        cn: &DbConnection,
        data: DataObject,
        conditions: &Conditions,
        limit: Option<u64>,
    ) -> Result<DataObject> {
        let data = self.validate(ActionType::Merge, data, conditions).await?;

        match self
            .update_validated(cn, data.clone(), conditions, limit)
            .await?
        {
            Some(updated) => Ok(updated),
            None => self.insert_validated(cn, data).await,
        }
    }

    // ==================== Deletes ====================

    /// Delete matching rows
    ///
    /// Fails with `QueryConditionsRequired` when `conditions` is empty.
    pub async fn remove(
        &self,
        cn: &DbConnection,
        conditions: &Conditions,
        limit: Option<u64>,
    ) -> Result<RemoveResult> {
        self.validate(ActionType::Remove, DataObject::new(), conditions)
            .await?;

        let statement = get_sql_delete(&self.metadata, conditions, limit)
            .map_err(|e| self.reject("remove", e))?;
        let result = execute_sql(cn, &statement, self.table()).await?;

        Ok(RemoveResult {
            record_count: result.affected_rows_count(),
        })
    }

    /// Delete at most one matching row
    pub async fn remove_one(
        &self,
        cn: &DbConnection,
        conditions: &Conditions,
    ) -> Result<RemoveResult> {
        self.remove(cn, conditions, Some(1)).await
    }

    // ==================== Helpers ====================

    async fn insert_validated(&self, cn: &DbConnection, data: DataObject) -> Result<DataObject> {
        let statement =
            get_sql_insert(&self.metadata, &data).map_err(|e| self.reject("add", e))?;
        let result = execute_sql(cn, &statement, self.table()).await?;

        Ok(self.with_generated_key(
            object_cleanup(&data, self.metadata.editable_columns()),
            result.auto_increment_value(),
        ))
    }

    async fn update_validated(
        &self,
        cn: &DbConnection,
        data: DataObject,
        conditions: &Conditions,
        limit: Option<u64>,
    ) -> Result<Option<DataObject>> {
        let statement = get_sql_update(&self.metadata, &data, conditions, limit)
            .map_err(|e| self.reject("modify", e))?;
        let result = execute_sql(cn, &statement, self.table()).await?;

        if result.affected_rows_count() > 0 {
            Ok(Some(data))
        } else {
            Ok(None)
        }
    }

    fn with_generated_key(&self, mut data: DataObject, generated: u64) -> DataObject {
        if let Some(column) = self.metadata.auto_increment_column() {
            if generated > 0 {
                data.insert(column.to_string(), Value::from(generated));
            }
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{TableModel, create_metadata};
    use crate::types::ColumnDescriptor;
    use serde_json::json;

    fn contacts() -> TableMetadata {
        create_metadata(
            "contacts",
            TableModel::new()
                .column("id", ColumnDescriptor::new().auto_increment())
                .column("title", ColumnDescriptor::typed(ColumnType::Title))
                .column("email", ColumnDescriptor::typed(ColumnType::Email))
                .column("age", ColumnDescriptor::typed(ColumnType::Number))
                .column("born", ColumnDescriptor::typed(ColumnType::Date))
                .column("note", ColumnDescriptor::new()),
        )
        .unwrap()
    }

    fn obj(value: Value) -> DataObject {
        value.as_object().cloned().unwrap()
    }

    async fn validate(action: ActionType, data: Value) -> Result<DataObject> {
        ModelValidator
            .validate(&contacts(), action, obj(data), &Conditions::new())
            .await
    }

    #[tokio::test]
    async fn test_model_validator_accepts_and_normalizes() {
        let data = validate(
            ActionType::Add,
            json!({
                "title": "  Dr ",
                "email": "ana@example.org",
                "age": "42",
                "born": "1990-05-01",
                "note": {"free": "form"}
            }),
        )
        .await
        .unwrap();

        assert_eq!(data["title"], json!("Dr"));
        assert_eq!(data["age"], json!("42"));
        assert_eq!(data["note"], json!({"free": "form"}));
    }

    #[tokio::test]
    async fn test_model_validator_rejects_bad_values() {
        for bad in [
            json!({"email": "not-an-email"}),
            json!({"age": "forty"}),
            json!({"born": "yesterday"}),
            json!({"title": "   "}),
        ] {
            let result = validate(ActionType::Modify, bad).await;
            assert!(matches!(result, Err(DataError::InvalidData(_))));
        }
    }

    #[tokio::test]
    async fn test_model_validator_rejects_non_finite_numbers() {
        for bad in ["NaN", "inf", "-Infinity"] {
            let result = validate(ActionType::Add, json!({"age": bad})).await;
            assert!(matches!(result, Err(DataError::InvalidData(_))), "{}", bad);
        }
        let data = validate(ActionType::Add, json!({"age": " -1.5e3 "})).await.unwrap();
        assert_eq!(data["age"], json!(" -1.5e3 "));
    }

    #[tokio::test]
    async fn test_model_validator_nulls_pass() {
        let data = validate(ActionType::Add, json!({"email": null, "age": null}))
            .await
            .unwrap();
        assert_eq!(data.len(), 2);
    }

    #[tokio::test]
    async fn test_model_validator_skips_non_editing_actions() {
        let data = validate(ActionType::Remove, json!({"age": "x"})).await.unwrap();
        assert_eq!(data["age"], json!("x"));
    }
}
