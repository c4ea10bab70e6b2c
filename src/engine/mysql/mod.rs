//! MySQL Connection Provider
//!
//! Opens one connection with `mysql_async`, verifies it with a ping and then serves every
//! diagnostic statement of a report over that single connection.
//!
//! # Implementation Notes
//! - Every statement passes the read-only guard before it reaches the server
//! - Status counters arrive over the text protocol as strings; they are kept as JSON
//!   strings and decoded by the probes
//! - Non UTF-8 bytes are Base64-encoded
//! - A reset replaces the session with a fresh, pinged one; statement deadlines are
//!   layered on top with [`crate::engine::timeout::TimedExecutor`]

use mysql_async::{prelude::*, Conn, OptsBuilder, Row, Value};

use crate::capability::ensure_read_only;
use crate::engine::{ConnectionConfig, QueryExecutor, QueryResult};
use crate::error::{Result, SniffError};

/// A live, verified connection to a MySQL-compatible server
pub struct MySqlConnection {
    conn: Conn,
    config: ConnectionConfig,
}

impl MySqlConnection {
    /// Open a connection and verify it with a ping
    ///
    /// Fails with `ConnectionFailed` if either step fails. The caller decides whether
    /// to abort.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        config.validate()?;
        let conn = open(config).await?;
        Ok(Self { conn, config: config.clone() })
    }

    /// Server version string as reported by `SELECT VERSION()`
    pub async fn server_version(&mut self) -> Result<String> {
        let version: Option<String> = self
            .conn
            .query_first("SELECT VERSION()")
            .await
            .map_err(|e| SniffError::query_failed(format!("error retrieving server version: {e}")))?;
        version.ok_or_else(|| SniffError::query_failed("no version returned"))
    }

    /// Release the connection
    pub async fn close(self) -> Result<()> {
        self.conn
            .disconnect()
            .await
            .map_err(|e| SniffError::connection_failed(format!("error closing connection: {e}")))
    }

    async fn run(&mut self, sql: &str) -> Result<QueryResult> {
        let rows: Vec<Row> = self
            .conn
            .query(sql)
            .await
            .map_err(|e| SniffError::query_failed(e.to_string()))?;

        let columns: Vec<String> = rows
            .first()
            .map(|row| row.columns_ref().iter().map(|c| c.name_str().to_string()).collect())
            .unwrap_or_default();

        let rows = rows.iter().map(row_to_json).collect::<Result<Vec<_>>>()?;
        Ok(QueryResult { columns, rows })
    }
}

impl QueryExecutor for MySqlConnection {
    async fn query(&mut self, sql: &str) -> Result<QueryResult> {
        ensure_read_only(sql)?;
        tracing::trace!(sql = sql.trim(), "executing");
        self.run(sql).await
    }

    /// Replace the session with a fresh one
    ///
    /// A cancelled statement may still have its response queued on the old socket, so
    /// the old session is never read from again.
    async fn reset(&mut self) -> Result<()> {
        tracing::info!(target = %self.config.display_target(), "reopening session");
        let fresh = open(&self.config).await?;
        drop(std::mem::replace(&mut self.conn, fresh));
        Ok(())
    }
}

/// Open a connection and ping it
async fn open(config: &ConnectionConfig) -> Result<Conn> {
    let target = config.display_target();
    tracing::debug!(target = %target, "opening connection");

    let opts = build_mysql_opts(config);
    let mut conn = Conn::new(opts).await.map_err(|e| {
        SniffError::connection_failed(format!("error opening connection to {target}: {e}"))
    })?;

    if let Err(e) = conn.ping().await {
        // Best effort: the connection is unusable either way
        let _ = conn.disconnect().await;
        return Err(SniffError::connection_failed(format!(
            "error verifying connection to {target}: {e}"
        )));
    }

    tracing::info!(target = %target, "connection verified");
    Ok(conn)
}

/// Build MySQL connection options from a ConnectionConfig
fn build_mysql_opts(config: &ConnectionConfig) -> OptsBuilder {
    let database = (!config.database.is_empty()).then(|| config.database.clone());

    OptsBuilder::default()
        .ip_or_hostname(config.host.clone())
        .tcp_port(config.port)
        .user(Some(config.user.clone()))
        .pass(Some(config.password.clone()))
        .db_name(database)
}

/// Convert a MySQL row to positional JSON values
fn row_to_json(row: &Row) -> Result<Vec<serde_json::Value>> {
    (0..row.len()).map(|idx| mysql_value_to_json(row, idx)).collect()
}

/// Convert a MySQL value to a JSON value
fn mysql_value_to_json(row: &Row, idx: usize) -> Result<serde_json::Value> {
    let value = row
        .as_ref(idx)
        .ok_or_else(|| SniffError::query_failed(format!("failed to decode value at index {idx}")))?;

    let json_value = match value {
        Value::NULL => serde_json::Value::Null,

        Value::Bytes(bytes) => match std::str::from_utf8(bytes) {
            Ok(s) => serde_json::Value::String(s.to_string()),
            Err(_) => {
                use base64::Engine;
                serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(bytes))
            }
        },

        Value::Int(i) => serde_json::Value::Number((*i).into()),

        Value::UInt(u) => serde_json::json!(*u),

        Value::Float(f) => serde_json::Number::from_f64(f64::from(*f))
            .map_or(serde_json::Value::Null, serde_json::Value::Number),

        Value::Double(d) => serde_json::Number::from_f64(*d)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),

        Value::Date(year, month, day, hour, minute, second, micro) => serde_json::Value::String(
            format!("{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}.{micro:06}"),
        ),

        Value::Time(is_negative, days, hours, minutes, seconds, micros) => {
            let sign = if *is_negative { "-" } else { "" };
            let total_hours = days * 24 + u32::from(*hours);
            serde_json::Value::String(format!(
                "{sign}{total_hours}:{minutes:02}:{seconds:02}.{micros:06}"
            ))
        }
    };

    Ok(json_value)
}
