//! Common test utilities: an in-memory database server
//!
//! `MockDb` hands out sessions that record every executed statement and answer
//! from a queue of scripted results. When the queue is empty a SELECT returns
//! no rows and anything else affects no rows.
//!
//! # Example
//!
//! ```ignore
//! mod common;
//! use common::MockDb;
//!
//! let db = MockDb::new();
//! db.respond_affected(1, 7);
//! let cn = db.connection();
//! // ... run DAO operations on `cn`
//! assert_eq!(db.statements().len(), 1);
//! ```

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use mysql_dao::connection::{DbConnection, DbServer, ExecutionResult, Session};
use mysql_dao::error::DriverError;
use mysql_dao::metadata::{TableMetadata, TableModel, create_metadata};
use mysql_dao::query::DataObject;
use mysql_dao::sql::Statement;
use mysql_dao::types::ColumnDescriptor;

#[derive(Default)]
struct MockState {
    statements: Vec<Statement>,
    responses: VecDeque<Result<ExecutionResult, DriverError>>,
    opened: usize,
    commits: usize,
    rollbacks: usize,
    fail_open: bool,
}

/// Scriptable in-memory database server
#[derive(Clone, Default)]
pub struct MockDb {
    state: Arc<Mutex<MockState>>,
}

impl MockDb {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Queue rows for the next statement
    pub fn respond_rows(&self, rows: Vec<Value>) {
        self.lock()
            .responses
            .push_back(Ok(ExecutionResult::with_rows("", rows)));
    }

    /// Queue an affected-row count and generated key for the next statement
    pub fn respond_affected(&self, affected_rows: u64, auto_increment_value: u64) {
        self.lock().responses.push_back(Ok(ExecutionResult::with_affected(
            "",
            affected_rows,
            auto_increment_value,
        )));
    }

    /// Queue a driver failure for the next statement
    pub fn fail(&self, err: DriverError) {
        self.lock().responses.push_back(Err(err));
    }

    /// Make every `open` fail
    pub fn fail_open(&self) {
        self.lock().fail_open = true;
    }

    /// A connection with a fresh session
    pub fn connection(&self) -> DbConnection {
        self.lock().opened += 1;
        DbConnection::new(Box::new(MockSession { db: self.clone() }))
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.lock().statements.clone()
    }

    pub fn sql(&self) -> Vec<String> {
        self.lock().statements.iter().map(|s| s.sql.clone()).collect()
    }

    pub fn opened(&self) -> usize {
        self.lock().opened
    }

    pub fn commits(&self) -> usize {
        self.lock().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.lock().rollbacks
    }
}

#[async_trait]
impl DbServer for MockDb {
    async fn open(&self) -> Result<Box<dyn Session>, DriverError> {
        let mut state = self.lock();
        if state.fail_open {
            return Err(DriverError::connection("connection refused"));
        }
        state.opened += 1;
        Ok(Box::new(MockSession { db: self.clone() }))
    }
}

struct MockSession {
    db: MockDb,
}

#[async_trait]
impl Session for MockSession {
    async fn execute(&mut self, statement: &Statement) -> Result<ExecutionResult, DriverError> {
        let mut state = self.db.lock();
        state.statements.push(statement.clone());
        match state.responses.pop_front() {
            Some(Ok(result)) if statement.returns_rows() => Ok(ExecutionResult::with_rows(
                &statement.sql,
                result.into_rows(),
            )),
            Some(Ok(result)) => Ok(ExecutionResult::with_affected(
                &statement.sql,
                result.affected_rows_count(),
                result.auto_increment_value(),
            )),
            Some(Err(err)) => Err(err),
            None if statement.returns_rows() => {
                Ok(ExecutionResult::with_rows(&statement.sql, Vec::new()))
            }
            None => Ok(ExecutionResult::with_affected(&statement.sql, 0, 0)),
        }
    }

    async fn commit(self: Box<Self>) -> Result<(), DriverError> {
        self.db.lock().commits += 1;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DriverError> {
        self.db.lock().rollbacks += 1;
        Ok(())
    }
}

/// `users(id autoIncrement, name, created generated)`
pub fn users_metadata() -> TableMetadata {
    create_metadata(
        "users",
        TableModel::new()
            .column("id", ColumnDescriptor::new().auto_increment())
            .column("name", ColumnDescriptor::new())
            .column("created", ColumnDescriptor::new().generated()),
    )
    .unwrap()
}

pub fn obj(value: Value) -> DataObject {
    value.as_object().cloned().unwrap()
}
