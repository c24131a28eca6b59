//! Error types for DAO operations
//!
//! `DataError` is the closed set of kinds callers see. Driver failures arrive as
//! `DriverError` and are classified through a static MySQL error-number table;
//! anything the table does not know degrades to `GeneralData`.

use thiserror::Error;

/// Errors surfaced by the statement builder, DAO and CRUD layers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Database connection required")]
    ConnectionRequired,

    #[error("General data error: {0}")]
    GeneralData(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Query conditions required: {0}")]
    QueryConditionsRequired(String),

    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),
}

impl DataError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self::GeneralData(msg.into())
    }

    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    pub fn conditions_required(msg: impl Into<String>) -> Self {
        Self::QueryConditionsRequired(msg.into())
    }

    pub fn invalid_condition(msg: impl Into<String>) -> Self {
        Self::InvalidCondition(msg.into())
    }

    pub fn column_not_found(msg: impl Into<String>) -> Self {
        Self::ColumnNotFound(msg.into())
    }

    pub fn not_implemented(msg: impl Into<String>) -> Self {
        Self::NotImplemented(msg.into())
    }

    /// HTTP-shaped status for the boundary layer
    pub fn status(&self) -> u16 {
        match self {
            Self::Configuration(_) | Self::ConnectionRequired | Self::GeneralData(_) => 500,
            Self::TableNotFound(_) | Self::ColumnNotFound(_) => 500,
            Self::DuplicateEntry(_) => 409,
            Self::InvalidData(_) | Self::QueryConditionsRequired(_) | Self::InvalidCondition(_) => {
                400
            }
            Self::NotImplemented(_) => 501,
        }
    }

    /// Stable machine-readable kind name
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::ConnectionRequired => "CONNECTION_REQUIRED",
            Self::GeneralData(_) => "GENERAL_DATA_ERROR",
            Self::DuplicateEntry(_) => "DUPLICATE_ENTRY",
            Self::InvalidData(_) => "INVALID_DATA",
            Self::QueryConditionsRequired(_) => "QUERY_CONDITIONS_REQUIRED",
            Self::InvalidCondition(_) => "INVALID_CONDITION",
            Self::TableNotFound(_) => "TABLE_NOT_FOUND",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::NotImplemented(_) => "NOT_IMPLEMENTED",
        }
    }
}

pub type Result<T> = std::result::Result<T, DataError>;

/// Failure reported by a database session
///
/// `number` is the MySQL server error number when the failure came from the
/// server; connection-level failures carry `None`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("driver error {number:?}: {message}")]
pub struct DriverError {
    pub number: Option<u16>,
    pub message: String,
}

impl DriverError {
    pub fn new(number: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            number,
            message: message.into(),
        }
    }

    /// Server error with a MySQL error number
    pub fn server(number: u16, message: impl Into<String>) -> Self {
        Self::new(Some(number), message)
    }

    /// Connection or protocol failure without a server error number
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }
}

impl From<sqlx::Error> for DriverError {
    fn from(err: sqlx::Error) -> Self {
        let number = match &err {
            sqlx::Error::Database(db_err) => db_err
                .try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>()
                .map(|e| e.number()),
            _ => None,
        };
        Self::new(number, err.to_string())
    }
}

/// Kinds a driver error number can classify as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriverErrorKind {
    DuplicateEntry,
    InvalidData,
    TableNotFound,
    ColumnNotFound,
}

/// MySQL server error numbers with a dedicated kind
const DRIVER_ERROR_TABLE: &[(u16, DriverErrorKind)] = &[
    (1062, DriverErrorKind::DuplicateEntry), // ER_DUP_ENTRY
    (1586, DriverErrorKind::DuplicateEntry), // ER_DUP_ENTRY_WITH_KEY_NAME
    (1054, DriverErrorKind::ColumnNotFound), // ER_BAD_FIELD_ERROR
    (1146, DriverErrorKind::TableNotFound),  // ER_NO_SUCH_TABLE
    (1051, DriverErrorKind::TableNotFound),  // ER_BAD_TABLE_ERROR
    (1048, DriverErrorKind::InvalidData),    // ER_BAD_NULL_ERROR
    (1364, DriverErrorKind::InvalidData),    // ER_NO_DEFAULT_FOR_FIELD
    (1366, DriverErrorKind::InvalidData),    // ER_TRUNCATED_WRONG_VALUE_FOR_FIELD
    (1406, DriverErrorKind::InvalidData),    // ER_DATA_TOO_LONG
    (1292, DriverErrorKind::InvalidData),    // ER_TRUNCATED_WRONG_VALUE
    (3140, DriverErrorKind::InvalidData),    // ER_INVALID_JSON_TEXT
];

/// Classify a driver failure into the closed `DataError` set
///
/// `context` names the table or operation; the driver's own message is kept
/// out of the returned error.
pub fn classify_driver_error(err: &DriverError, context: &str) -> DataError {
    let kind = err.number.and_then(|number| {
        DRIVER_ERROR_TABLE
            .iter()
            .find(|(n, _)| *n == number)
            .map(|(_, kind)| *kind)
    });

    match kind {
        Some(DriverErrorKind::DuplicateEntry) => DataError::DuplicateEntry(context.to_string()),
        Some(DriverErrorKind::InvalidData) => DataError::InvalidData(context.to_string()),
        Some(DriverErrorKind::TableNotFound) => DataError::TableNotFound(context.to_string()),
        Some(DriverErrorKind::ColumnNotFound) => DataError::ColumnNotFound(context.to_string()),
        None => DataError::GeneralData(context.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_entry_mapping() {
        let err = DriverError::server(1062, "Duplicate entry 'a' for key 'PRIMARY'");
        let mapped = classify_driver_error(&err, "users");
        assert_eq!(mapped, DataError::DuplicateEntry("users".to_string()));
        assert_eq!(mapped.status(), 409);
    }

    #[test]
    fn test_unknown_column_and_table_mapping() {
        let column = classify_driver_error(&DriverError::server(1054, "Unknown column"), "users");
        assert!(matches!(column, DataError::ColumnNotFound(_)));

        let table = classify_driver_error(&DriverError::server(1146, "no such table"), "users");
        assert!(matches!(table, DataError::TableNotFound(_)));
    }

    #[test]
    fn test_unmapped_number_degrades_to_general() {
        let err = DriverError::server(1205, "Lock wait timeout exceeded");
        assert!(matches!(
            classify_driver_error(&err, "users"),
            DataError::GeneralData(_)
        ));
    }

    #[test]
    fn test_connection_failure_degrades_to_general() {
        let err = DriverError::connection("broken pipe");
        let mapped = classify_driver_error(&err, "users");
        assert!(matches!(mapped, DataError::GeneralData(_)));
        assert!(!mapped.to_string().contains("broken pipe"));
    }

    #[test]
    fn test_status_and_code() {
        assert_eq!(DataError::ConnectionRequired.status(), 500);
        assert_eq!(DataError::invalid_data("x").status(), 400);
        assert_eq!(DataError::conditions_required("x").status(), 400);
        assert_eq!(DataError::not_implemented("x").status(), 501);
        assert_eq!(DataError::not_implemented("x").code(), "NOT_IMPLEMENTED");
        assert_eq!(
            DataError::DuplicateEntry("t".into()).code(),
            "DUPLICATE_ENTRY"
        );
    }
}
