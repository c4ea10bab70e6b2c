//! Report Orchestration
//!
//! Runs the sections of a report in a fixed order against one connection:
//! schema preview, health, security, performance. Each finished section is handed to a
//! [`ReportSink`] straight away, so text output appears group by group while the
//! collected [`Report`] is still returned at the end for JSON output.
//!
//! A failing section is recorded and logged; the next section still runs. A lost
//! session (connection failure) stops the report: later groups are listed as not run.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::engine::QueryExecutor;
use crate::error::SniffError;
use crate::output::ErrorInfo;
use crate::probe::{self, CheckResult, ProbeGroup, Severity, Thresholds};
use crate::schema::{self, SchemaOverview};

/// Outcome of one probe group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupReport {
    pub name: String,
    pub title: String,

    /// Rows in probe order; for an aborted group, only those gathered before the failure
    pub checks: Vec<CheckResult>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl GroupReport {
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        self.error.is_some()
    }

    /// Most severe status among the rows, `None` for an empty group
    #[must_use]
    pub fn worst_severity(&self) -> Option<Severity> {
        self.checks.iter().map(|c| c.status.severity()).max()
    }
}

/// Everything one run produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub schema: SchemaOverview,
    pub groups: Vec<GroupReport>,
}

/// Counts of check rows by severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub passed: usize,
    pub warnings: usize,
    pub failures: usize,
    pub aborted_groups: usize,
}

impl Report {
    #[must_use]
    pub fn total_checks(&self) -> usize {
        self.groups.iter().map(|g| g.checks.len()).sum()
    }

    #[must_use]
    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for group in &self.groups {
            if group.is_aborted() {
                summary.aborted_groups += 1;
            }
            for check in &group.checks {
                match check.status.severity() {
                    Severity::Pass => summary.passed += 1,
                    Severity::Warn => summary.warnings += 1,
                    Severity::Fail => summary.failures += 1,
                }
            }
        }
        summary
    }

    /// Look up a group by machine name
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&GroupReport> {
        self.groups.iter().find(|g| g.name == name)
    }
}

/// Receives report sections as soon as they are complete
pub trait ReportSink {
    fn schema(&mut self, _overview: &SchemaOverview) {}
    fn group(&mut self, _group: &GroupReport) {}
}

/// Sink that discards every section
#[derive(Debug, Default)]
pub struct NullSink;

impl ReportSink for NullSink {}

/// Options for a full run
#[derive(Debug, Clone, Default)]
pub struct SniffOptions {
    pub thresholds: Thresholds,

    /// Per-statement timeout; `None` waits as long as the server takes
    pub query_timeout: Option<Duration>,
}

/// Build the schema section; an introspection error is recorded, not returned
///
/// Also hands back the error when it ended the session.
pub async fn run_schema_section<E: QueryExecutor>(exec: &mut E) -> (SchemaOverview, Option<SniffError>) {
    match schema::preview_schema(exec).await {
        Ok(overview) => (overview, None),
        Err(aborted) => {
            tracing::warn!(error = %aborted.error, "schema introspection failed");
            let fatal = aborted.error.is_fatal().then_some(aborted.error);
            (aborted.partial, fatal)
        }
    }
}

/// Run one probe group and fold its outcome into a [`GroupReport`]
///
/// Also hands back the error when it ended the session.
pub async fn run_group_section<E: QueryExecutor>(
    exec: &mut E,
    group: &ProbeGroup,
    thresholds: &Thresholds,
) -> (GroupReport, Option<SniffError>) {
    let (checks, error) = match probe::run_group(exec, group, thresholds).await {
        Ok(checks) => (checks, None),
        Err(aborted) => (aborted.completed, Some(aborted.error)),
    };

    let section = GroupReport {
        name: group.name.to_string(),
        title: group.title.to_string(),
        checks,
        error: error.as_ref().map(ErrorInfo::from),
    };
    (section, error.filter(SniffError::is_fatal))
}

/// Section for a group that never ran because the session was already lost
fn skipped_group(group: &ProbeGroup, cause: &SniffError) -> GroupReport {
    GroupReport {
        name: group.name.to_string(),
        title: group.title.to_string(),
        checks: Vec::new(),
        error: Some(ErrorInfo::new(cause.error_code(), format!("not run: {}", cause.message()))),
    }
}

/// Run every section in order against an open executor
///
/// Once a section fails with a fatal error the remaining groups are not sent to the
/// server; they are reported as not run.
pub async fn run_report<E, S>(exec: &mut E, thresholds: &Thresholds, sink: &mut S) -> Report
where
    E: QueryExecutor,
    S: ReportSink + ?Sized,
{
    let (schema, mut lost) = run_schema_section(exec).await;
    sink.schema(&schema);

    let mut groups = Vec::new();
    for group in probe::all_groups() {
        let section = match &lost {
            Some(cause) => skipped_group(group, cause),
            None => {
                tracing::info!(group = group.name, "running probe group");
                let (section, fatal) = run_group_section(exec, group, thresholds).await;
                lost = fatal;
                section
            }
        };
        sink.group(&section);
        groups.push(section);
    }

    Report { schema, groups }
}

/// Connect, run the full report and close the connection
///
/// A connection failure is returned before any probe runs. The connection is closed
/// whatever the probes did.
#[cfg(feature = "mysql")]
pub async fn sniff<S>(
    config: &crate::engine::ConnectionConfig,
    options: &SniffOptions,
    sink: &mut S,
) -> crate::error::Result<Report>
where
    S: ReportSink + ?Sized,
{
    let mut conn = crate::engine::mysql::MySqlConnection::connect(config).await?;

    let report = match options.query_timeout {
        Some(limit) => {
            let mut timed = crate::engine::timeout::TimedExecutor::new(conn, limit);
            let report = run_report(&mut timed, &options.thresholds, sink).await;
            conn = timed.into_inner();
            report
        }
        None => run_report(&mut conn, &options.thresholds, sink).await,
    };

    if let Err(error) = conn.close().await {
        tracing::warn!(%error, "failed to close connection cleanly");
    }

    Ok(report)
}

/// Connect, build the schema preview and close the connection
///
/// A preview cut short after `SHOW TABLES` succeeded is returned with its `error` set;
/// otherwise the error is returned.
#[cfg(feature = "mysql")]
pub async fn schema_only(
    config: &crate::engine::ConnectionConfig,
    options: &SniffOptions,
) -> crate::error::Result<SchemaOverview> {
    let mut conn = crate::engine::mysql::MySqlConnection::connect(config).await?;

    let preview = match options.query_timeout {
        Some(limit) => {
            let mut timed = crate::engine::timeout::TimedExecutor::new(conn, limit);
            let preview = schema::preview_schema(&mut timed).await;
            conn = timed.into_inner();
            preview
        }
        None => schema::preview_schema(&mut conn).await,
    };

    if let Err(error) = conn.close().await {
        tracing::warn!(%error, "failed to close connection cleanly");
    }

    match preview {
        Ok(overview) => Ok(overview),
        Err(aborted) if aborted.tables_listed() && !aborted.error.is_fatal() => Ok(aborted.partial),
        Err(aborted) => Err(aborted.error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixture::FixtureExecutor;
    use crate::engine::timeout::TimedExecutor;
    use crate::probe::{health, CheckStatus};

    #[derive(Default)]
    struct RecordingSink {
        events: Vec<String>,
    }

    impl ReportSink for RecordingSink {
        fn schema(&mut self, _overview: &SchemaOverview) {
            self.events.push("schema".to_string());
        }

        fn group(&mut self, group: &GroupReport) {
            self.events.push(group.name.clone());
        }
    }

    #[tokio::test]
    async fn test_sections_run_in_order_even_when_all_fail() {
        // No fixtures registered: every statement fails
        let mut exec = FixtureExecutor::new();
        let mut sink = RecordingSink::default();

        let report = run_report(&mut exec, &Thresholds::default(), &mut sink).await;

        assert_eq!(sink.events, vec!["schema", "health", "security", "performance"]);
        assert!(report.schema.error.is_some());
        assert!(report.groups.iter().all(GroupReport::is_aborted));
        assert_eq!(report.summary().aborted_groups, 3);
        assert_eq!(report.total_checks(), 0);
    }

    #[tokio::test]
    async fn test_lost_session_skips_remaining_groups() {
        let server = FixtureExecutor::new()
            .with_rows("SHOW TABLES", &["Tables_in_shop"], vec![])
            .with_status(health::UPTIME_SQL, &[("Uptime", "10")])
            .with_status(health::ACTIVE_CONNECTIONS_SQL, &[("Threads_connected", "1")])
            .with_status(health::SLOW_QUERIES_SQL, &[("Slow_queries", "0")])
            .with_delay(health::SLOW_QUERIES_SQL, Duration::from_millis(500))
            .with_reset_error("server has gone away");
        let mut timed = TimedExecutor::new(server, Duration::from_millis(20));
        let mut sink = RecordingSink::default();

        let report = run_report(&mut timed, &Thresholds::default(), &mut sink).await;

        let health = report.group("health").unwrap();
        assert_eq!(health.checks.len(), 2);
        assert_eq!(health.error.as_ref().unwrap().code, "CONNECTION_FAILED");
        for name in ["security", "performance"] {
            let skipped = report.group(name).unwrap();
            assert!(skipped.checks.is_empty());
            assert!(skipped.error.as_ref().unwrap().message.starts_with("not run: Connection failed: session lost"));
        }
        assert_eq!(sink.events, vec!["schema", "health", "security", "performance"]);

        // Nothing was sent after the slow statement
        let exec = timed.into_inner();
        assert_eq!(exec.executed().last().map(String::as_str), Some(health::SLOW_QUERIES_SQL));
    }

    #[tokio::test]
    async fn test_query_errors_do_not_skip_groups() {
        let mut exec = FixtureExecutor::new().with_rows("SHOW TABLES", &["Tables_in_shop"], vec![]);
        let report = run_report(&mut exec, &Thresholds::default(), &mut NullSink).await;

        assert!(report.groups.iter().all(|g| !g.error.as_ref().unwrap().message.starts_with("not run")));
        // One statement per section: every group got its turn
        assert_eq!(exec.executed().len(), 4);
    }

    #[test]
    fn test_summary_counts() {
        let report = Report {
            schema: SchemaOverview::default(),
            groups: vec![GroupReport {
                name: "health".into(),
                title: "Health checks".into(),
                checks: vec![
                    CheckResult::new("Uptime", "1s", CheckStatus::Ok, ""),
                    CheckResult::new("Slow Queries", "500", CheckStatus::Warning, ""),
                    CheckResult::new("Open Tables", "1 of 2", CheckStatus::Normal, ""),
                ],
                error: None,
            }],
        };

        let summary = report.summary();
        assert_eq!(summary, Summary { passed: 2, warnings: 1, failures: 0, aborted_groups: 0 });
        assert_eq!(report.group("health").unwrap().worst_severity(), Some(Severity::Warn));
        assert!(report.group("security").is_none());
    }
}
