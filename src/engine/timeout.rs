//! Per-statement deadline around any executor
//!
//! Cancelling a statement mid-flight leaves its response unread on the wire, so the
//! session is reset before anything else runs on it. If the reset fails too, the
//! session is marked lost and every later statement fails with `ConnectionFailed`.

use std::time::Duration;

use crate::engine::{QueryExecutor, QueryResult};
use crate::error::{Result, SniffError};

/// Lower bound on the time a session reset may take
const MIN_RESET_WINDOW: Duration = Duration::from_secs(10);

/// Executor that abandons any statement running longer than `limit`
#[derive(Debug)]
pub struct TimedExecutor<E> {
    inner: E,
    limit: Duration,
    lost: Option<SniffError>,
}

impl<E> TimedExecutor<E> {
    pub const fn new(inner: E, limit: Duration) -> Self {
        Self { inner, limit, lost: None }
    }

    pub const fn inner(&self) -> &E {
        &self.inner
    }

    /// Error that ended the session, if any
    pub const fn lost(&self) -> Option<&SniffError> {
        self.lost.as_ref()
    }

    pub fn into_inner(self) -> E {
        self.inner
    }
}

impl<E: QueryExecutor + Send> QueryExecutor for TimedExecutor<E> {
    async fn query(&mut self, sql: &str) -> Result<QueryResult> {
        if let Some(error) = &self.lost {
            return Err(error.clone());
        }

        let Ok(result) = tokio::time::timeout(self.limit, self.inner.query(sql)).await else {
            let limit_ms = self.limit.as_millis();
            tracing::warn!(timeout_ms = %limit_ms, sql = sql.trim(), "query timed out, resetting session");

            let window = self.limit.max(MIN_RESET_WINDOW);
            let reason = match tokio::time::timeout(window, self.inner.reset()).await {
                Ok(Ok(())) => {
                    return Err(SniffError::query_failed(format!("query exceeded timeout of {limit_ms}ms")));
                }
                Ok(Err(SniffError::ConnectionFailed(msg))) => msg,
                Ok(Err(other)) => other.message(),
                Err(_) => format!("reset took longer than {}ms", window.as_millis()),
            };

            let error = SniffError::connection_failed(format!(
                "session lost after a query exceeded timeout of {limit_ms}ms: {reason}"
            ));
            self.lost = Some(error.clone());
            return Err(error);
        };
        result
    }

    async fn reset(&mut self) -> Result<()> {
        self.inner.reset().await?;
        self.lost = None;
        Ok(())
    }
}
