//! dbsniff - Read-Only MySQL Diagnostics
//!
//! dbsniff connects to a MySQL-compatible database, previews its schema and runs a fixed
//! battery of read-only diagnostic probes (health, security posture, basic performance).
//! Results are printed as text tables or as a single JSON envelope.
//!
//! # Core Principles
//! - Read-only: only `SELECT`, `SHOW` and `DESCRIBE` reach the server
//! - One connection per run, probes executed strictly in sequence
//! - A failing probe group never stops the groups after it
//! - Explicit configuration, no process-wide state
//!
//! # Module Organization
//! - [`error`] - Error types and handling
//! - [`engine`] - Connection config, query executor seam, MySQL connection
//! - [`capability`] - Read-only statement guard
//! - [`schema`] - Table listing and column introspection
//! - [`probe`] - Diagnostic probe tables and classifiers
//! - [`report`] - Orchestration of a full run
//! - [`render`] - Text tables
//! - [`output`] - JSON output envelopes
//! - [`config`] - Connection profiles and thresholds
//! - [`logging`] - Tracing setup

pub mod capability;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod output;
pub mod probe;
pub mod render;
pub mod report;
pub mod schema;

// Re-export commonly used types for convenience
pub use config::{ConnectionDraft, SniffConfig, StoredConnection};
pub use engine::timeout::TimedExecutor;
pub use engine::{ConnectionConfig, QueryExecutor, QueryResult};
pub use error::{Result, SniffError};
pub use output::{ErrorEnvelope, ErrorInfo, Metadata, SuccessEnvelope};
pub use probe::{CheckResult, CheckStatus, Severity, Thresholds, VersionComparison};
pub use report::{GroupReport, Report, ReportSink, SniffOptions, Summary};
pub use schema::{Column, KeyRole, SchemaOverview};

#[cfg(feature = "mysql")]
pub use engine::mysql::MySqlConnection;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_exports() {
        let thresholds = Thresholds::default();
        assert_eq!(thresholds.slow_query_limit, 100);
        assert_eq!(thresholds.minimum_version, "8.0");
        assert_eq!(CheckStatus::Warning.severity(), Severity::Warn);
    }
}
