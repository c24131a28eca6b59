//! Configuration for the MySQL server collaborator
//!
//! Provides a builder pattern and environment loading for the connection pool
//! that backs per-request sessions.

use crate::error::{DataError, Result};

/// Default maximum connections in the pool
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default minimum connections kept open in the pool
pub const DEFAULT_MIN_CONNECTIONS: u32 = 0;

/// Default seconds to wait for a pooled connection
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Default inbound header carrying a caller-supplied request id
pub const DEFAULT_REQUEST_ID_HEADER: &str = "x-request-id";

/// Configuration for the database server
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// MySQL database URL
    pub database_url: String,
    /// Maximum pooled connections
    pub max_connections: u32,
    /// Minimum pooled connections
    pub min_connections: u32,
    /// Seconds to wait when acquiring a connection
    pub acquire_timeout_secs: u64,
    /// Header the request-context middleware reads and echoes the request id on
    pub request_id_header: String,
}

impl DatabaseConfig {
    /// Create a new configuration builder
    pub fn builder(database_url: impl Into<String>) -> DatabaseConfigBuilder {
        DatabaseConfigBuilder::new(database_url)
    }

    /// Load configuration from the environment (and a `.env` file if present)
    ///
    /// Environment variables:
    /// - `DATABASE_URL` (required)
    /// - `DATABASE_MAX_CONNECTIONS`
    /// - `DATABASE_MIN_CONNECTIONS`
    /// - `DATABASE_ACQUIRE_TIMEOUT_SECS`
    /// - `REQUEST_ID_HEADER`
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let url = std::env::var("DATABASE_URL")
            .map_err(|_| DataError::configuration("DATABASE_URL is not set"))?;

        let mut builder = Self::builder(url);

        if let Some(max) = parse_env::<u32>("DATABASE_MAX_CONNECTIONS")? {
            builder = builder.max_connections(max);
        }
        if let Some(min) = parse_env::<u32>("DATABASE_MIN_CONNECTIONS")? {
            builder = builder.min_connections(min);
        }
        if let Some(secs) = parse_env::<u64>("DATABASE_ACQUIRE_TIMEOUT_SECS")? {
            builder = builder.acquire_timeout_secs(secs);
        }
        if let Ok(header) = std::env::var("REQUEST_ID_HEADER") {
            builder = builder.request_id_header(header);
        }

        Ok(builder.build())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| DataError::configuration(format!("{} has an invalid value: {}", name, raw))),
        Err(_) => Ok(None),
    }
}

/// Builder for DatabaseConfig
#[derive(Debug)]
pub struct DatabaseConfigBuilder {
    database_url: String,
    max_connections: u32,
    min_connections: u32,
    acquire_timeout_secs: u64,
    request_id_header: String,
}

impl DatabaseConfigBuilder {
    /// Create a new builder with the database URL
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
            request_id_header: DEFAULT_REQUEST_ID_HEADER.to_string(),
        }
    }

    /// Set the maximum pool size (default: 10)
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the minimum pool size (default: 0)
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Set the acquire timeout in seconds (default: 10)
    pub fn acquire_timeout_secs(mut self, secs: u64) -> Self {
        self.acquire_timeout_secs = secs;
        self
    }

    /// Set the request id header (default: "x-request-id")
    pub fn request_id_header(mut self, header: impl Into<String>) -> Self {
        self.request_id_header = header.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> DatabaseConfig {
        DatabaseConfig {
            database_url: self.database_url,
            max_connections: self.max_connections,
            // never above the ceiling
            min_connections: self.min_connections.min(self.max_connections),
            acquire_timeout_secs: self.acquire_timeout_secs,
            request_id_header: self.request_id_header,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DatabaseConfig::builder("mysql://localhost/test").build();

        assert_eq!(config.database_url, "mysql://localhost/test");
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.min_connections, DEFAULT_MIN_CONNECTIONS);
        assert_eq!(config.acquire_timeout_secs, DEFAULT_ACQUIRE_TIMEOUT_SECS);
        assert_eq!(config.request_id_header, "x-request-id");
    }

    #[test]
    fn test_builder_accepts_string() {
        let config = DatabaseConfig::builder(String::from("mysql://localhost/db")).build();
        assert_eq!(config.database_url, "mysql://localhost/db");
    }

    #[test]
    fn test_full_custom_config() {
        let config = DatabaseConfig::builder("mysql://localhost/test")
            .max_connections(25)
            .min_connections(5)
            .acquire_timeout_secs(3)
            .request_id_header("x-correlation-id")
            .build();

        assert_eq!(config.max_connections, 25);
        assert_eq!(config.min_connections, 5);
        assert_eq!(config.acquire_timeout_secs, 3);
        assert_eq!(config.request_id_header, "x-correlation-id");
    }

    #[test]
    fn test_min_connections_clamped_to_max() {
        let config = DatabaseConfig::builder("mysql://localhost/test")
            .max_connections(4)
            .min_connections(8)
            .build();

        assert_eq!(config.min_connections, 4);
    }

    #[test]
    fn test_builder_order_independence() {
        let config1 = DatabaseConfig::builder("mysql://localhost/test")
            .max_connections(3)
            .request_id_header("x-id")
            .build();

        let config2 = DatabaseConfig::builder("mysql://localhost/test")
            .request_id_header("x-id")
            .max_connections(3)
            .build();

        assert_eq!(config1.max_connections, config2.max_connections);
        assert_eq!(config1.request_id_header, config2.request_id_header);
    }

    #[test]
    fn test_config_debug() {
        let config = DatabaseConfig::builder("mysql://localhost/test").build();
        let debug_str = format!("{:?}", config);
        assert!(debug_str.contains("DatabaseConfig"));
        assert!(debug_str.contains("database_url"));
    }
}
