//! SQL Identifier Sanitization Utilities
//!
//! Quotes and validates MySQL identifiers. Plain identifiers are emitted bare so
//! compiled statements stay readable; anything else is backtick-quoted.

use std::sync::LazyLock;

use regex::Regex;

/// Longest identifier MySQL accepts
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// MySQL reserved keywords that must be quoted when used as identifiers
pub const MYSQL_RESERVED_WORDS: &[&str] = &[
    "ADD",
    "ALL",
    "ALTER",
    "AND",
    "AS",
    "ASC",
    "BETWEEN",
    "BIGINT",
    "BINARY",
    "BLOB",
    "BOTH",
    "BY",
    "CALL",
    "CASCADE",
    "CASE",
    "CHANGE",
    "CHAR",
    "CHECK",
    "COLLATE",
    "COLUMN",
    "CONDITION",
    "CONSTRAINT",
    "CREATE",
    "CROSS",
    "CURRENT_DATE",
    "CURRENT_TIME",
    "CURRENT_TIMESTAMP",
    "CURRENT_USER",
    "DATABASE",
    "DEFAULT",
    "DELETE",
    "DESC",
    "DESCRIBE",
    "DISTINCT",
    "DIV",
    "DROP",
    "ELSE",
    "EXISTS",
    "EXPLAIN",
    "FALSE",
    "FOR",
    "FOREIGN",
    "FROM",
    "FULLTEXT",
    "GENERATED",
    "GRANT",
    "GROUP",
    "GROUPS",
    "HAVING",
    "IF",
    "IGNORE",
    "IN",
    "INDEX",
    "INNER",
    "INSERT",
    "INT",
    "INTERVAL",
    "INTO",
    "IS",
    "JOIN",
    "KEY",
    "KEYS",
    "KILL",
    "LEADING",
    "LEFT",
    "LIKE",
    "LIMIT",
    "LOCK",
    "MATCH",
    "MOD",
    "NOT",
    "NULL",
    "ON",
    "OPTION",
    "OR",
    "ORDER",
    "OUTER",
    "PARTITION",
    "PRIMARY",
    "RANGE",
    "RANK",
    "READ",
    "REFERENCES",
    "REGEXP",
    "RENAME",
    "REPLACE",
    "RIGHT",
    "ROW",
    "ROWS",
    "SCHEMA",
    "SELECT",
    "SET",
    "SHOW",
    "TABLE",
    "THEN",
    "TO",
    "TRAILING",
    "TRUE",
    "UNION",
    "UNIQUE",
    "UPDATE",
    "USAGE",
    "USE",
    "USING",
    "VALUES",
    "WHEN",
    "WHERE",
    "WITH",
    "WRITE",
];

static PLAIN_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

/// Whether the identifier is a MySQL reserved word (case-insensitive)
pub fn is_reserved_word(identifier: &str) -> bool {
    MYSQL_RESERVED_WORDS.contains(&identifier.to_uppercase().as_str())
}

/// Quote a SQL identifier to make it safe for use in queries
///
/// Plain, non-reserved identifiers are returned unchanged; everything else is
/// wrapped in backticks with internal backticks doubled.
///
/// # Example
/// ```
/// use mysql_dao::sql::quote_identifier;
///
/// assert_eq!(quote_identifier("users"), "users");
/// assert_eq!(quote_identifier("order"), "`order`");
/// assert_eq!(quote_identifier("my table"), "`my table`");
/// ```
pub fn quote_identifier(identifier: &str) -> String {
    if PLAIN_IDENTIFIER.is_match(identifier) && !is_reserved_word(identifier) {
        return identifier.to_string();
    }
    format!("`{}`", identifier.replace('`', "``"))
}

/// Validate a table or column name
///
/// Rules:
/// - Must not be empty or longer than 64 characters
/// - Must not contain NUL or backtick characters
/// - Must not end with a space
///
/// Reserved words are accepted because they are always quoted.
///
/// # Example
/// ```
/// use mysql_dao::sql::validate_identifier;
///
/// assert!(validate_identifier("products").is_ok());
/// assert!(validate_identifier("").is_err());
/// ```
pub fn validate_identifier(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Identifier cannot be empty".to_string());
    }

    if name.chars().count() > MAX_IDENTIFIER_LENGTH {
        return Err(format!(
            "Identifier '{}' is longer than {} characters",
            name, MAX_IDENTIFIER_LENGTH
        ));
    }

    if name.contains('\0') || name.contains('`') {
        return Err(format!(
            "Identifier '{}' contains a forbidden character",
            name.replace('\0', "\\0")
        ));
    }

    if name.ends_with(' ') {
        return Err(format!("Identifier '{}' cannot end with a space", name));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // quote_identifier Tests
    // =========================================================================

    #[test]
    fn test_quote_identifier_plain() {
        assert_eq!(quote_identifier("my_table"), "my_table");
        assert_eq!(quote_identifier("Users"), "Users");
        assert_eq!(quote_identifier("_tmp1"), "_tmp1");
    }

    #[test]
    fn test_quote_identifier_reserved_keyword() {
        assert_eq!(quote_identifier("select"), "`select`");
        assert_eq!(quote_identifier("Order"), "`Order`");
        assert_eq!(quote_identifier("key"), "`key`");
    }

    #[test]
    fn test_quote_identifier_with_backticks() {
        assert_eq!(quote_identifier("a`b"), "`a``b`");
    }

    #[test]
    fn test_quote_identifier_with_special_chars() {
        assert_eq!(quote_identifier("my-table"), "`my-table`");
        assert_eq!(quote_identifier("my table"), "`my table`");
        assert_eq!(quote_identifier("1abc"), "`1abc`");
        assert_eq!(quote_identifier("a=1 OR 1=1"), "`a=1 OR 1=1`");
    }

    #[test]
    fn test_quote_identifier_unicode() {
        assert_eq!(quote_identifier("tëst"), "`tëst`");
    }

    // =========================================================================
    // validate_identifier Tests
    // =========================================================================

    #[test]
    fn test_validate_identifier_valid() {
        assert!(validate_identifier("products").is_ok());
        assert!(validate_identifier("order").is_ok());
        assert!(validate_identifier("my-table").is_ok());
    }

    #[test]
    fn test_validate_identifier_empty() {
        let result = validate_identifier("");
        assert!(result.unwrap_err().contains("cannot be empty"));
    }

    #[test]
    fn test_validate_identifier_too_long() {
        let name = "a".repeat(65);
        assert!(validate_identifier(&name).is_err());
        assert!(validate_identifier(&"a".repeat(64)).is_ok());
    }

    #[test]
    fn test_validate_identifier_forbidden_chars() {
        assert!(validate_identifier("a`b").is_err());
        assert!(validate_identifier("a\0b").is_err());
        assert!(validate_identifier("trailing ").is_err());
    }

    #[test]
    fn test_reserved_words_contains_common_keywords() {
        assert!(is_reserved_word("select"));
        assert!(is_reserved_word("GROUP"));
        assert!(!is_reserved_word("users"));
    }
}
