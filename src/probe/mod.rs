//! Diagnostic Probe Set
//!
//! A probe is a fixed list of read-only statements plus a pure classification
//! function that maps their results to one or more [`CheckResult`] rows. Probes are
//! declared in static tables, one per [`ProbeGroup`]:
//!
//! - [`health::GROUP`]: uptime, connections, slow queries, buffer pool, open tables
//! - [`security::GROUP`]: empty passwords, SUPER accounts, server version
//! - [`performance::GROUP`]: large tables without indexes
//!
//! Running a group executes its probes in order. The first failing probe aborts the rest
//! of the group and the rows gathered so far are handed back with the error.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::engine::{QueryExecutor, QueryResult};
use crate::error::{Result, SniffError};

pub mod health;
pub mod performance;
pub mod security;

/// Status label attached to every check row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckStatus {
    #[serde(rename = "OK")]
    Ok,
    Normal,
    Good,
    #[serde(rename = "PASSED")]
    Passed,
    Warning,
    Bad,
    #[serde(rename = "FAILED")]
    Failed,
}

/// How serious a status is, independent of its label
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Pass,
    Warn,
    Fail,
}

impl CheckStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Normal => "Normal",
            Self::Good => "Good",
            Self::Passed => "PASSED",
            Self::Warning => "Warning",
            Self::Bad => "Bad",
            Self::Failed => "FAILED",
        }
    }

    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::Ok | Self::Normal | Self::Good | Self::Passed => Severity::Pass,
            Self::Warning => Severity::Warn,
            Self::Bad | Self::Failed => Severity::Fail,
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured outcome of one check, ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Check name (e.g. "Slow Queries")
    pub check: String,

    /// Observed value
    pub value: String,

    /// Extra context such as the offending account or table sizes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    pub status: CheckStatus,

    /// Remark or recommendation
    pub remark: String,
}

impl CheckResult {
    pub fn new(
        check: impl Into<String>,
        value: impl Into<String>,
        status: CheckStatus,
        remark: impl Into<String>,
    ) -> Self {
        Self { check: check.into(), value: value.into(), detail: None, status, remark: remark.into() }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// How the server version is compared against the minimum
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionComparison {
    /// Numeric comparison of dotted components ("10.0" > "8.0")
    #[default]
    Semantic,
    /// Raw string comparison, kept for compatibility with older reports ("10.0" < "8.0")
    Lexicographic,
}

/// Policy constants used by the classifiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Slow query count above which the health check warns
    pub slow_query_limit: i64,

    /// Fraction of `table_open_cache` above which open tables warn
    pub open_table_ratio: f64,

    /// Lowest acceptable server version
    pub minimum_version: String,

    /// Row count above which an unindexed table is reported
    pub large_table_rows: i64,

    pub version_comparison: VersionComparison,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            slow_query_limit: 100,
            open_table_ratio: 0.8,
            minimum_version: "8.0".to_string(),
            large_table_rows: 10_000,
            version_comparison: VersionComparison::Semantic,
        }
    }
}

/// Maps the results of a probe's statements (same order) to check rows
pub type Classifier = fn(&Thresholds, &[QueryResult]) -> Result<Vec<CheckResult>>;

/// A named check: statements to run and how to classify their results
pub struct Probe {
    pub name: &'static str,
    pub statements: &'static [&'static str],
    pub classify: Classifier,
}

/// Ordered collection of probes sharing a theme
pub struct ProbeGroup {
    /// Machine name ("health", "security", "performance")
    pub name: &'static str,
    /// Heading for text output
    pub title: &'static str,
    pub probes: &'static [Probe],
}

impl ProbeGroup {
    /// Look up a probe by check name
    #[must_use]
    pub fn probe(&self, name: &str) -> Option<&Probe> {
        self.probes.iter().find(|p| p.name == name)
    }
}

/// All groups, in report order
#[must_use]
pub fn all_groups() -> [&'static ProbeGroup; 3] {
    [&health::GROUP, &security::GROUP, &performance::GROUP]
}

/// A group stopped early because one of its probes failed
#[derive(Debug, Clone)]
pub struct GroupAborted {
    /// Rows produced by the probes that ran before the failure
    pub completed: Vec<CheckResult>,
    /// Name of the probe that failed
    pub probe: &'static str,
    pub error: SniffError,
}

/// Run one probe: execute its statements in order, then classify
pub async fn run_probe<E: QueryExecutor>(
    exec: &mut E,
    probe: &Probe,
    thresholds: &Thresholds,
) -> Result<Vec<CheckResult>> {
    let mut results = Vec::with_capacity(probe.statements.len());
    for sql in probe.statements {
        let result = exec.query(sql).await.map_err(|e| with_context(e, probe.name))?;
        results.push(result);
    }

    let rows = (probe.classify)(thresholds, &results).map_err(|e| with_context(e, probe.name))?;
    if rows.is_empty() {
        return Err(SniffError::query_failed(format!("{} produced no result", probe.name)));
    }
    Ok(rows)
}

/// Run every probe of a group in order, stopping at the first failure
pub async fn run_group<E: QueryExecutor>(
    exec: &mut E,
    group: &ProbeGroup,
    thresholds: &Thresholds,
) -> std::result::Result<Vec<CheckResult>, GroupAborted> {
    let mut completed = Vec::new();

    for probe in group.probes {
        match run_probe(exec, probe, thresholds).await {
            Ok(rows) => {
                tracing::debug!(group = group.name, probe = probe.name, rows = rows.len(), "probe finished");
                completed.extend(rows);
            }
            Err(error) => {
                tracing::warn!(group = group.name, probe = probe.name, %error, "probe failed, skipping rest of group");
                return Err(GroupAborted { completed, probe: probe.name, error });
            }
        }
    }

    Ok(completed)
}

/// Prefix query errors with the check that issued them
fn with_context(err: SniffError, probe: &str) -> SniffError {
    match err {
        SniffError::QueryFailed(msg) => {
            SniffError::QueryFailed(format!("error retrieving {}: {msg}", probe.to_lowercase()))
        }
        other => other,
    }
}

/// Decode a row cell as text, failing on NULL
pub(crate) fn text_cell(result: &QueryResult, row: usize, col: usize) -> Result<String> {
    let value = result.cell(row, col)?;
    crate::engine::value_as_string(value)
        .ok_or_else(|| SniffError::query_failed(format!("unexpected NULL at row {row}, column {col}")))
}

/// Decode a row cell as an integer; NULL counts as zero
pub(crate) fn int_cell(result: &QueryResult, row: usize, col: usize) -> Result<i64> {
    let value = result.cell(row, col)?;
    if value.is_null() {
        return Ok(0);
    }
    crate::engine::value_as_i64(value).ok_or_else(|| {
        SniffError::query_failed(format!("expected a number at row {row}, column {col}, got {value}"))
    })
}
