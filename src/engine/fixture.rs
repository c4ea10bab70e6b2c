//! In-memory executor answering known SQL with canned results
//!
//! Used for table-driven probe tests and benchmarks. Statements are matched on their
//! whitespace-normalized text, so multi-line SQL constants can be registered as-is.

use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use crate::engine::{QueryExecutor, QueryResult};
use crate::error::{Result, SniffError};

/// Canned answer for one statement
#[derive(Debug, Clone)]
enum FixtureResponse {
    Rows(QueryResult),
    Error(String),
}

/// Executor backed by a map of SQL text to results
#[derive(Debug, Clone, Default)]
pub struct FixtureExecutor {
    responses: HashMap<String, FixtureResponse>,
    delays: HashMap<String, Duration>,
    executed: Vec<String>,
    resets: usize,
    reset_error: Option<String>,
}

impl FixtureExecutor {
    /// Create an executor with no registered statements
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a result set for `sql`
    #[must_use]
    pub fn with_rows(mut self, sql: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        let result = QueryResult::new(columns.iter().map(|c| (*c).to_string()).collect(), rows);
        self.responses.insert(normalize(sql), FixtureResponse::Rows(result));
        self
    }

    /// Register a `SHOW STATUS`-style two-column answer for `sql`
    #[must_use]
    pub fn with_status(self, sql: &str, pairs: &[(&str, &str)]) -> Self {
        let rows = pairs
            .iter()
            .map(|(name, value)| vec![Value::from(*name), Value::from(*value)])
            .collect();
        self.with_rows(sql, &["Variable_name", "Value"], rows)
    }

    /// Make `sql` fail with a query error
    #[must_use]
    pub fn with_error(mut self, sql: &str, message: &str) -> Self {
        self.responses.insert(normalize(sql), FixtureResponse::Error(message.to_string()));
        self
    }

    /// Hold the answer to `sql` back for `delay`
    #[must_use]
    pub fn with_delay(mut self, sql: &str, delay: Duration) -> Self {
        self.delays.insert(normalize(sql), delay);
        self
    }

    /// Make every session reset fail with a connection error
    #[must_use]
    pub fn with_reset_error(mut self, message: &str) -> Self {
        self.reset_error = Some(message.to_string());
        self
    }

    /// Number of session resets requested so far
    #[must_use]
    pub const fn resets(&self) -> usize {
        self.resets
    }

    /// Statements executed so far, in order
    #[must_use]
    pub fn executed(&self) -> &[String] {
        &self.executed
    }
}

impl QueryExecutor for FixtureExecutor {
    async fn query(&mut self, sql: &str) -> Result<QueryResult> {
        let key = normalize(sql);
        self.executed.push(key.clone());
        if let Some(delay) = self.delays.get(&key).copied() {
            tokio::time::sleep(delay).await;
        }
        match self.responses.get(&key) {
            Some(FixtureResponse::Rows(result)) => Ok(result.clone()),
            Some(FixtureResponse::Error(message)) => Err(SniffError::query_failed(message.clone())),
            None => Err(SniffError::query_failed(format!("no fixture registered for: {key}"))),
        }
    }

    async fn reset(&mut self) -> Result<()> {
        self.resets += 1;
        match &self.reset_error {
            Some(message) => Err(SniffError::connection_failed(message.clone())),
            None => Ok(()),
        }
    }
}

fn normalize(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}
