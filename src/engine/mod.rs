//! Database Engine Seam and Core Types
//!
//! This module defines the connection configuration, the query result shape and the
//! [`QueryExecutor`] trait that every probe and the schema introspector talk to.
//!
//! # Executors
//! - [`mysql::MySqlConnection`]: a live connection opened with `mysql_async`
//! - [`fixture::FixtureExecutor`]: canned results keyed by SQL text, for tests
//! - [`timeout::TimedExecutor`]: wraps either one with a per-statement deadline
//!
//! Result cells are JSON values. Drivers that speak the MySQL text protocol return
//! most status counters as strings, so the accessors below accept both numbers and
//! numeric strings.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{Result, SniffError};

#[cfg(feature = "mysql")]
pub mod mysql;

pub mod fixture;
pub mod timeout;

/// Engine name reported in JSON envelopes
pub const ENGINE_NAME: &str = "mysql";

/// Connection configuration for the target database
///
/// Immutable after creation. The password is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Hostname or IP address
    pub host: String,

    /// TCP port
    pub port: u16,

    /// Username
    pub user: String,

    /// Password
    /// WARNING: Sensitive data, do not log or include in error messages
    #[serde(default)]
    pub password: String,

    /// Database name
    pub database: String,
}

impl ConnectionConfig {
    /// Create a new connection config
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            database: database.into(),
        }
    }

    /// Reject configs that cannot possibly reach a server
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(SniffError::invalid_input("host cannot be empty"));
        }
        if self.port == 0 {
            return Err(SniffError::invalid_input("port must be between 1 and 65535"));
        }
        if self.user.trim().is_empty() {
            return Err(SniffError::invalid_input("user cannot be empty"));
        }
        Ok(())
    }

    /// `user@host:port/database`, safe for logs
    #[must_use]
    pub fn display_target(&self) -> String {
        format!("{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

/// Result set of a single statement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names in result set
    pub columns: Vec<String>,

    /// Result rows, positional
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    /// Build a result from column names and rows
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Fetch a cell, failing when the row is shorter than expected
    pub fn cell(&self, row: usize, col: usize) -> Result<&Value> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .ok_or_else(|| SniffError::query_failed(format!("missing value at row {row}, column {col}")))
    }

    /// Look up the value for `name` in a two-column `Variable_name | Value` result
    ///
    /// Matching is case-insensitive, as MySQL reports status names in mixed case.
    pub fn named_value(&self, name: &str) -> Option<&Value> {
        self.rows.iter().find_map(|row| match (row.first(), row.get(1)) {
            (Some(Value::String(key)), Some(value)) if key.eq_ignore_ascii_case(name) => Some(value),
            _ => None,
        })
    }

    /// Like [`Self::named_value`], decoded as an integer
    pub fn named_i64(&self, name: &str) -> Result<i64> {
        let value = self
            .named_value(name)
            .ok_or_else(|| SniffError::query_failed(format!("no row returned for {name}")))?;
        value_as_i64(value)
            .ok_or_else(|| SniffError::query_failed(format!("{name} is not an integer: {value}")))
    }
}

/// Decode a cell as text. `NULL` yields `None`.
#[must_use]
pub fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Decode a cell as a signed integer
#[must_use]
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Decode a cell as a float
#[must_use]
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Anything that can run a single read-only statement and return its rows
///
/// Implementations execute each statement exactly once; there are no retries.
pub trait QueryExecutor {
    /// Execute `sql` and return the full result set
    fn query(&mut self, sql: &str) -> impl std::future::Future<Output = Result<QueryResult>> + Send;

    /// Discard a statement abandoned mid-flight and get back to a usable session
    ///
    /// Called after a query was cancelled. Executors without session state have
    /// nothing to do.
    fn reset(&mut self) -> impl std::future::Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_config() -> ConnectionConfig {
        ConnectionConfig::new("localhost", 3306, "root", "hunter2", "shop")
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", sample_config());
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
        assert!(rendered.contains("localhost"));
    }

    #[test]
    fn test_display_target() {
        assert_eq!(sample_config().display_target(), "root@localhost:3306/shop");
    }

    #[test]
    fn test_validate() {
        assert!(sample_config().validate().is_ok());

        let mut config = sample_config();
        config.host = "  ".to_string();
        assert!(config.validate().unwrap_err().message().contains("host"));

        let mut config = sample_config();
        config.port = 0;
        assert!(config.validate().is_err());

        let mut config = sample_config();
        config.user = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_value_decoding() {
        assert_eq!(value_as_i64(&json!("1234")), Some(1234));
        assert_eq!(value_as_i64(&json!(42)), Some(42));
        assert_eq!(value_as_i64(&json!("abc")), None);
        assert_eq!(value_as_i64(&Value::Null), None);
        assert_eq!(value_as_f64(&json!("8191")), Some(8191.0));
        assert_eq!(value_as_string(&json!(7)), Some("7".to_string()));
        assert_eq!(value_as_string(&Value::Null), None);
    }

    #[test]
    fn test_named_value_case_insensitive() {
        let result = QueryResult::new(
            vec!["Variable_name".into(), "Value".into()],
            vec![vec![json!("Innodb_buffer_pool_pages_total"), json!("8192")]],
        );
        assert_eq!(result.named_i64("innodb_buffer_pool_pages_total").unwrap(), 8192);
        assert!(result.named_value("Uptime").is_none());
        assert!(result.named_i64("Uptime").is_err());
    }

    #[test]
    fn test_cell_out_of_range() {
        let result = QueryResult::new(vec!["a".into()], vec![vec![json!(1)]]);
        assert_eq!(result.cell(0, 0).unwrap(), &json!(1));
        assert!(result.cell(0, 1).is_err());
        assert!(result.cell(1, 0).is_err());
    }
}
