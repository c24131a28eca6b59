//! Database sessions and the shared connection handle
//!
//! A `Session` is one open connection with a transaction already begun. The
//! DAO layer never sees a session directly: it works through a `DbConnection`,
//! a cloneable handle that may be empty (no database configured, or setup
//! failed) and is released once per request.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::error::{DataError, DriverError, Result, classify_driver_error};
use crate::sql::Statement;

/// Outcome of one executed statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionResult {
    rows: Vec<Value>,
    affected_rows: u64,
    auto_increment_value: u64,
    sql: String,
}

impl ExecutionResult {
    /// Result of a row-returning statement
    pub fn with_rows(sql: impl Into<String>, rows: Vec<Value>) -> Self {
        Self {
            rows,
            sql: sql.into(),
            ..Self::default()
        }
    }

    /// Result of a data-modifying statement
    pub fn with_affected(
        sql: impl Into<String>,
        affected_rows: u64,
        auto_increment_value: u64,
    ) -> Self {
        Self {
            rows: Vec::new(),
            affected_rows,
            auto_increment_value,
            sql: sql.into(),
        }
    }

    pub fn rows(&self) -> &[Value] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Value> {
        self.rows
    }

    pub fn affected_rows_count(&self) -> u64 {
        self.affected_rows
    }

    /// Generated key of the last insert, 0 when none
    pub fn auto_increment_value(&self) -> u64 {
        self.auto_increment_value
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }
}

/// An open connection inside a transaction
#[async_trait]
pub trait Session: Send {
    async fn execute(
        &mut self,
        statement: &Statement,
    ) -> std::result::Result<ExecutionResult, DriverError>;

    async fn commit(self: Box<Self>) -> std::result::Result<(), DriverError>;

    async fn rollback(self: Box<Self>) -> std::result::Result<(), DriverError>;
}

/// Source of sessions, typically backed by a pool
#[async_trait]
pub trait DbServer: Send + Sync {
    /// Acquire a connection and begin a transaction on it
    async fn open(&self) -> std::result::Result<Box<dyn Session>, DriverError>;
}

/// Cloneable handle to the session of one request
///
/// Clones share the same session. Once committed, rolled back or released
/// the handle is empty and every further statement fails with
/// `ConnectionRequired`.
#[derive(Clone, Default)]
pub struct DbConnection {
    inner: Arc<Mutex<Option<Box<dyn Session>>>>,
}

impl fmt::Debug for DbConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConnection").finish_non_exhaustive()
    }
}

impl DbConnection {
    /// Handle without a session
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(session: Box<dyn Session>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(session))),
        }
    }

    /// Open a session from `server` and wrap it
    ///
    /// Failures are returned unlogged; the caller decides how loud they are.
    pub async fn open(server: &dyn DbServer) -> Result<Self> {
        let session = server
            .open()
            .await
            .map_err(|e| classify_driver_error(&e, "open connection"))?;
        Ok(Self::new(session))
    }

    pub async fn is_open(&self) -> bool {
        self.inner.lock().await.is_some()
    }

    /// Commit the transaction and empty the handle
    ///
    /// Committing an empty handle is a no-op.
    pub async fn commit(&self) -> Result<()> {
        let Some(session) = self.inner.lock().await.take() else {
            return Ok(());
        };
        session.commit().await.map_err(|e| {
            error!(error = %e, "Commit failed");
            classify_driver_error(&e, "commit")
        })
    }

    /// Roll the transaction back and empty the handle
    pub async fn rollback(&self) -> Result<()> {
        let Some(session) = self.inner.lock().await.take() else {
            return Ok(());
        };
        session.rollback().await.map_err(|e| {
            error!(error = %e, "Rollback failed");
            classify_driver_error(&e, "rollback")
        })
    }

    /// Drop the session without finishing the transaction
    ///
    /// Returns whether a session was still held.
    pub async fn release(&self) -> bool {
        self.inner.lock().await.take().is_some()
    }
}

/// Execute a statement on the connection
///
/// `context` names the table or operation in the classified error. Driver
/// failures are logged here and nowhere above.
pub async fn execute_sql(
    cn: &DbConnection,
    statement: &Statement,
    context: &str,
) -> Result<ExecutionResult> {
    let mut guard = cn.inner.lock().await;
    let Some(session) = guard.as_mut() else {
        error!(context, "No database connection for statement");
        return Err(DataError::ConnectionRequired);
    };

    debug!(sql = %statement.sql, params = statement.values.len(), "Executing statement");

    session.execute(statement).await.map_err(|e| {
        let err = classify_driver_error(&e, context);
        error!(
            context,
            code = err.code(),
            driver_number = ?e.number,
            driver_message = %e.message,
            sql = %statement.sql,
            "Statement failed"
        );
        err
    })
}
