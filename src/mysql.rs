//! sqlx-backed MySQL server and session

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::mysql::{MySqlArguments, MySqlPool, MySqlPoolOptions};
use sqlx::query::Query;
use sqlx::{MySql, Row, Transaction};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::connection::{DbServer, ExecutionResult, Session};
use crate::error::{DataError, DriverError, Result};
use crate::sql::Statement;

/// Pool of MySQL connections handing out transactional sessions
#[derive(Debug, Clone)]
pub struct MySqlServer {
    pool: MySqlPool,
}

impl MySqlServer {
    /// Connect a pool using the given configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(|e| DataError::configuration(format!("Failed to connect to database: {}", e)))?;

        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "MySQL pool connected"
        );

        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait]
impl DbServer for MySqlServer {
    async fn open(&self) -> std::result::Result<Box<dyn Session>, DriverError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(MySqlSession { tx }))
    }
}

/// One pooled connection inside an open transaction
///
/// Dropping the session without commit rolls the transaction back.
pub struct MySqlSession {
    tx: Transaction<'static, MySql>,
}

#[async_trait]
impl Session for MySqlSession {
    async fn execute(
        &mut self,
        statement: &Statement,
    ) -> std::result::Result<ExecutionResult, DriverError> {
        let mut query = sqlx::query(&statement.sql);
        for value in &statement.values {
            query = bind_value(query, value);
        }

        if statement.returns_rows() {
            let rows = query.fetch_all(&mut *self.tx).await?;
            let values = rows
                .iter()
                .map(|row| {
                    row.try_get::<sqlx::types::Json<Value>, _>(0)
                        .map(|json| json.0)
                })
                .collect::<std::result::Result<Vec<_>, sqlx::Error>>()?;
            Ok(ExecutionResult::with_rows(&statement.sql, values))
        } else {
            let done = query.execute(&mut *self.tx).await?;
            Ok(ExecutionResult::with_affected(
                &statement.sql,
                done.rows_affected(),
                done.last_insert_id(),
            ))
        }
    }

    async fn commit(self: Box<Self>) -> std::result::Result<(), DriverError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> std::result::Result<(), DriverError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

/// Bind a JSON value with the closest MySQL parameter type
fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &'q Value,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(u) = n.as_u64() {
                query.bind(u)
            } else {
                query.bind(n.as_f64())
            }
        }
        Value::String(s) => query.bind(s.as_str()),
        // arrays and objects travel as JSON text
        other => query.bind(other.to_string()),
    }
}
