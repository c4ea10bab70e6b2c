//! Report Orchestration Tests
//!
//! Full runs against fixture servers: section order, failure isolation, JSON shape and
//! streamed text output.

mod common;

use dbsniff::engine::fixture::FixtureExecutor;
use dbsniff::engine::timeout::TimedExecutor;
use dbsniff::probe::{health, security, CheckStatus, Thresholds};
use dbsniff::render::TextSink;
use dbsniff::report::{self, NullSink};
use dbsniff::{Metadata, Severity, SuccessEnvelope, Summary};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn test_full_report_on_healthy_server() {
    let mut exec = common::healthy_server();
    let report = report::run_report(&mut exec, &Thresholds::default(), &mut NullSink).await;

    assert_eq!(report.schema.total_tables, 2);
    assert_eq!(report.schema.tables[1].columns[1].default.as_deref(), Some("new"));
    assert_eq!(
        report.groups.iter().map(|g| g.name.as_str()).collect::<Vec<_>>(),
        vec!["health", "security", "performance"]
    );
    assert_eq!(report.summary(), Summary { passed: 9, warnings: 0, failures: 0, aborted_groups: 0 });
    assert!(report.groups.iter().all(|g| g.worst_severity() == Some(Severity::Pass)));
}

#[tokio::test]
async fn test_statements_run_in_fixed_order() {
    let mut exec = common::healthy_server();
    report::run_report(&mut exec, &Thresholds::default(), &mut NullSink).await;

    let executed = exec.executed();
    assert_eq!(executed[0], "SHOW TABLES");
    assert_eq!(executed[1], "DESCRIBE `customers`");
    assert_eq!(executed[3], health::UPTIME_SQL);
    assert_eq!(executed.len(), 3 + 6 + 3 + 1);
    assert!(executed.iter().all(|sql| sql.starts_with("SELECT") || sql.starts_with("SHOW") || sql.starts_with("DESCRIBE")));
}

#[tokio::test]
async fn test_failed_group_does_not_stop_later_groups() {
    let mut exec = common::healthy_server()
        .with_error(security::SUPER_PRIV_SQL, "SELECT command denied to user 'probe'@'%' for table 'user'");
    let report = report::run_report(&mut exec, &Thresholds::default(), &mut NullSink).await;

    let security = report.group("security").unwrap();
    assert!(security.is_aborted());
    assert_eq!(security.checks.len(), 1);
    assert_eq!(security.checks[0].check, "Empty Passwords");

    let performance = report.group("performance").unwrap();
    assert!(!performance.is_aborted());
    assert_eq!(performance.checks[0].status, CheckStatus::Passed);
    assert_eq!(report.summary().aborted_groups, 1);
}

#[tokio::test]
async fn test_schema_failure_is_recorded() {
    let mut exec = common::healthy_server().with_error("DESCRIBE `orders`", "Table 'shop.orders' doesn't exist");
    let report = report::run_report(&mut exec, &Thresholds::default(), &mut NullSink).await;

    assert_eq!(
        report.schema.error.as_deref(),
        Some("Query failed: error retrieving schema for table orders: Table 'shop.orders' doesn't exist")
    );
    // What was gathered before the failure stays in the report
    assert_eq!(report.schema.total_tables, 2);
    assert_eq!(report.schema.tables.len(), 1);
    assert_eq!(report.schema.tables[0].name, "customers");
    assert_eq!(report.schema.tables[0].columns.len(), 2);
    assert_eq!(report.groups.len(), 3);
    assert_eq!(report.summary().aborted_groups, 0);
}

#[tokio::test]
async fn test_json_envelope_shape() {
    let mut exec = common::healthy_server();
    let report = report::run_report(&mut exec, &Thresholds::default(), &mut NullSink).await;
    let envelope = SuccessEnvelope::new("sniff", &report, Metadata::with_checks(12, report.total_checks()));

    let value = serde_json::to_value(&envelope).unwrap();
    assert_eq!(value["ok"], json!(true));
    assert_eq!(value["engine"], json!("mysql"));
    assert_eq!(value["command"], json!("sniff"));
    assert_eq!(value["meta"]["checks"], json!(9));
    assert_eq!(value["data"]["groups"][0]["checks"][0]["status"], json!("OK"));
    assert!(value["data"]["groups"][0].get("error").is_none());
}

#[tokio::test]
async fn test_text_sink_streams_every_section() {
    let mut exec = common::healthy_server().with_rows(
        security::EMPTY_PASSWORD_SQL,
        &["user", "host", "empty_password"],
        vec![vec![json!("guest"), json!("%"), json!(1)]],
    );
    let mut sink = TextSink::new(Vec::new(), false);

    let report = report::run_report(&mut exec, &Thresholds::default(), &mut sink).await;
    sink.write_summary(&report.summary());
    let out = String::from_utf8(sink.into_inner()).unwrap();

    let schema_at = out.find("Tables in the database:").unwrap();
    let health_at = out.find("Health checks").unwrap();
    let security_at = out.find("Security checks").unwrap();
    let performance_at = out.find("Performance checks").unwrap();
    assert!(schema_at < health_at && health_at < security_at && security_at < performance_at);

    assert!(out.contains("| Empty Passwords  | Found      | guest@%"));
    assert!(out.contains("Checks completed: 8 passed, 0 warnings, 1 failures."));
}

#[tokio::test]
async fn test_unreachable_everything_still_reports() {
    let mut exec = FixtureExecutor::new();
    let report = report::run_report(&mut exec, &Thresholds::default(), &mut NullSink).await;

    assert!(report.schema.error.as_deref().unwrap().contains("no fixture registered for: SHOW TABLES"));
    assert_eq!(report.summary().aborted_groups, 3);
}

#[tokio::test]
async fn test_timed_out_statement_does_not_leak_into_later_groups() {
    let server = common::healthy_server().with_delay(health::SLOW_QUERIES_SQL, Duration::from_millis(500));
    let mut exec = TimedExecutor::new(server, Duration::from_millis(50));

    let report = report::run_report(&mut exec, &Thresholds::default(), &mut NullSink).await;

    let health = report.group("health").unwrap();
    assert_eq!(health.checks.len(), 2);
    assert_eq!(health.error.as_ref().unwrap().message, "Query failed: error retrieving slow queries: query exceeded timeout of 50ms");

    // The session was reset and every later statement got its own answer
    assert_eq!(exec.inner().resets(), 1);
    let security = report.group("security").unwrap();
    assert!(!security.is_aborted());
    assert_eq!(security.checks[2].detail.as_deref(), Some("Version: 8.0.36"));
    let performance = report.group("performance").unwrap();
    assert_eq!(performance.checks[0].status, CheckStatus::Passed);
}

#[tokio::test]
async fn test_unrecoverable_timeout_stops_the_report() {
    let server = common::healthy_server()
        .with_delay(security::VERSION_SQL, Duration::from_millis(500))
        .with_reset_error("Lost connection to MySQL server during query");
    let mut exec = TimedExecutor::new(server, Duration::from_millis(50));

    let report = report::run_report(&mut exec, &Thresholds::default(), &mut NullSink).await;

    assert!(!report.group("health").unwrap().is_aborted());
    let security = report.group("security").unwrap();
    assert_eq!(security.checks.len(), 2);
    assert_eq!(security.error.as_ref().unwrap().code, "CONNECTION_FAILED");

    let performance = report.group("performance").unwrap();
    assert!(performance.checks.is_empty());
    assert!(performance.error.as_ref().unwrap().message.starts_with("not run: "));
    assert_eq!(exec.inner().executed().last().map(String::as_str), Some(security::VERSION_SQL));
}
