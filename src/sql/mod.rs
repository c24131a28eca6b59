//! SQL compilation for MySQL
//!
//! Identifier quoting, clause building, value coercion and statement
//! compilation. Everything here is pure; execution lives in `connection`.

pub mod condition;
pub mod convert;
pub mod sanitize;
pub mod statement;

pub use condition::{
    build_group_by_clause, build_limit_clause, build_order_by_clause, build_where_clause,
};
pub use sanitize::{MYSQL_RESERVED_WORDS, quote_identifier, validate_identifier};
pub use statement::{
    Statement, StatementKind, get_sql_count, get_sql_delete, get_sql_insert, get_sql_select,
    get_sql_update, get_sql_upsert,
};
