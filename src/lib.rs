//! # mysql-dao
//!
//! Metadata-driven data access for MySQL.
//!
//! A table is described once by a name and a column model. From that
//! description the crate compiles parameterized statements, runs them on the
//! current request's transaction and converts rows back to JSON objects.
//!
//! ## Features
//!
//! - **Statement Builder**: SELECT/INSERT/UPDATE/DELETE with `?` placeholders and ordered bind values
//! - **Conditions**: `=`, `<`, `>`, `>=`, `<=`, `!=`, `IN`, `LIKE`, null-safe equality, AND-joined
//! - **Pagination**: page/offset/size clauses plus sort and group validated against the model
//! - **Type Coercion**: `date` and `json` columns converted on the way in and out
//! - **DAO**: per-table `read`, `read_one`, `add`, `modify`, `merge`, `upsert`, `remove`, `count`
//! - **CRUD Composites**: validate → hook pipeline for multi-table business logic
//! - **Request Context**: task-local per-request state and a tower layer running each request in a transaction
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use mysql_dao::{
//!     ColumnDescriptor, Conditions, Dao, DatabaseConfig, MySqlServer, RequestContextLayer,
//!     TableModel, context, create_metadata,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::builder("mysql://localhost/app").build();
//!     let server = MySqlServer::connect(&config).await?;
//!     let _layer = RequestContextLayer::from_config(&config, Arc::new(server))?;
//!
//!     let users = Dao::new(create_metadata(
//!         "users",
//!         TableModel::new()
//!             .column("id", ColumnDescriptor::new().auto_increment())
//!             .column("name", ColumnDescriptor::new()),
//!     )?);
//!
//!     // inside a request handled by the layer
//!     let cn = context::connection();
//!     let ana = users.read_one(&cn, &Conditions::new().eq("name", "Ana"), None).await?;
//!     println!("{:?}", ana);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use mysql_dao::DatabaseConfig;
//!
//! let config = DatabaseConfig::builder("mysql://localhost/app")
//!     .max_connections(20)          // Pool ceiling (default 10)
//!     .acquire_timeout_secs(5)      // Wait for a pooled connection (default 10)
//!     .request_id_header("x-trace") // Request id header (default x-request-id)
//!     .build();
//! ```

pub mod config;
pub mod connection;
pub mod context;
pub mod crud;
pub mod dao;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod mysql;
pub mod objects;
pub mod query;
pub mod sql;
pub mod types;

// Re-export main types for convenience
pub use config::{DatabaseConfig, DatabaseConfigBuilder};
pub use connection::{DbConnection, DbServer, ExecutionResult, Session, execute_sql};
pub use context::{RequestContext, RequestContextLayer, RequestStats};
pub use crud::{Crud, CrudHandler};
pub use dao::{Dao, ModelValidator, RemoveResult, Validator};
pub use error::{DataError, DriverError, Result, classify_driver_error};
pub use logging::{LogConfig, LogFormat, LogLevel, init_logging};
pub use metadata::{TableMetadata, TableModel, create_metadata};
pub use mysql::{MySqlServer, MySqlSession};
pub use objects::{is_empty, object_cleanup};
pub use query::{Clauses, Condition, Conditions, DataObject, LimitClause, Operator};
pub use types::{ActionType, ColumnDescriptor, ColumnType};

// Re-export SQL utilities for advanced users
pub use sql::{Statement, StatementKind, quote_identifier, validate_identifier};
