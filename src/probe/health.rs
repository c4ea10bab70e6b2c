//! Health probes: server counters read from `SHOW GLOBAL STATUS` and `SHOW VARIABLES`

use crate::engine::{value_as_f64, QueryResult};
use crate::error::{Result, SniffError};
use crate::probe::{CheckResult, CheckStatus, Probe, ProbeGroup, Thresholds};

pub const UPTIME_SQL: &str = "SHOW GLOBAL STATUS LIKE 'Uptime'";
pub const ACTIVE_CONNECTIONS_SQL: &str = "SHOW GLOBAL STATUS LIKE 'Threads_connected'";
pub const SLOW_QUERIES_SQL: &str = "SHOW GLOBAL STATUS LIKE 'Slow_queries'";
pub const BUFFER_POOL_SQL: &str = "SHOW GLOBAL STATUS WHERE Variable_name IN \
    ('Innodb_buffer_pool_pages_total', 'Innodb_buffer_pool_pages_data')";
pub const OPEN_TABLES_SQL: &str = "SHOW GLOBAL STATUS LIKE 'Open_tables'";
pub const TABLE_OPEN_CACHE_SQL: &str = "SHOW VARIABLES LIKE 'table_open_cache'";

pub static GROUP: ProbeGroup = ProbeGroup {
    name: "health",
    title: "Health checks",
    probes: &[
        Probe { name: "Uptime", statements: &[UPTIME_SQL], classify: classify_uptime },
        Probe {
            name: "Active Connections",
            statements: &[ACTIVE_CONNECTIONS_SQL],
            classify: classify_active_connections,
        },
        Probe { name: "Slow Queries", statements: &[SLOW_QUERIES_SQL], classify: classify_slow_queries },
        Probe {
            name: "Buffer Pool Usage",
            statements: &[BUFFER_POOL_SQL],
            classify: classify_buffer_pool,
        },
        Probe {
            name: "Open Tables",
            statements: &[OPEN_TABLES_SQL, TABLE_OPEN_CACHE_SQL],
            classify: classify_open_tables,
        },
    ],
};

fn classify_uptime(_: &Thresholds, results: &[QueryResult]) -> Result<Vec<CheckResult>> {
    let seconds = first(results)?.named_i64("Uptime")?;
    Ok(vec![CheckResult::new("Uptime", format_uptime(seconds), CheckStatus::Ok, "Database running time")])
}

fn classify_active_connections(_: &Thresholds, results: &[QueryResult]) -> Result<Vec<CheckResult>> {
    let connected = first(results)?.named_i64("Threads_connected")?;
    Ok(vec![CheckResult::new(
        "Active Connections",
        connected.to_string(),
        CheckStatus::Ok,
        "Number of current connections",
    )])
}

fn classify_slow_queries(thresholds: &Thresholds, results: &[QueryResult]) -> Result<Vec<CheckResult>> {
    let slow = first(results)?.named_i64("Slow_queries")?;
    let (status, remark) = if slow > thresholds.slow_query_limit {
        (CheckStatus::Warning, "High number of slow queries")
    } else {
        (CheckStatus::Ok, "Acceptable number of slow queries")
    };
    Ok(vec![CheckResult::new("Slow Queries", slow.to_string(), status, remark)])
}

fn classify_buffer_pool(_: &Thresholds, results: &[QueryResult]) -> Result<Vec<CheckResult>> {
    let result = first(results)?;
    let total = pages(result, "Innodb_buffer_pool_pages_total")?;
    let used = pages(result, "Innodb_buffer_pool_pages_data")?;

    let (value, status) = match buffer_pool_usage(used, total) {
        Some(pct) => (format!("{pct:.2}%"), CheckStatus::Ok),
        None => ("N/A".to_string(), CheckStatus::Warning),
    };
    Ok(vec![CheckResult::new("Buffer Pool Usage", value, status, "Percentage of buffer pool used")])
}

fn classify_open_tables(thresholds: &Thresholds, results: &[QueryResult]) -> Result<Vec<CheckResult>> {
    let open = first(results)?.named_i64("Open_tables")?;
    let cache = results
        .get(1)
        .ok_or_else(|| SniffError::query_failed("missing table_open_cache result"))?
        .named_i64("table_open_cache")?;

    let value = format!("{open} of {cache}");
    let row = if open_tables_high(open, cache, thresholds.open_table_ratio) {
        CheckResult::new(
            "Open Tables",
            value,
            CheckStatus::Warning,
            format!(
                "High open tables count: {open} of {cache}. \
                 Review table_open_cache if tables are opened and closed frequently."
            ),
        )
    } else {
        CheckResult::new(
            "Open Tables",
            value,
            CheckStatus::Normal,
            format!("{open} open tables of {cache} cache limit"),
        )
    };
    Ok(vec![row])
}

/// Percentage of buffer pool pages holding data; `None` when the total is zero
#[must_use]
pub fn buffer_pool_usage(used: f64, total: f64) -> Option<f64> {
    (total != 0.0).then(|| used / total * 100.0)
}

/// Warn once `open` exceeds the truncated `ratio` share of the cache
#[must_use]
pub fn open_tables_high(open: i64, cache: i64, ratio: f64) -> bool {
    open > (cache as f64 * ratio) as i64
}

/// `26h3m5s`, `3m5s` or `45s`
#[must_use]
pub fn format_uptime(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let (h, m, s) = (seconds / 3600, seconds % 3600 / 60, seconds % 60);
    if h > 0 {
        format!("{h}h{m}m{s}s")
    } else if m > 0 {
        format!("{m}m{s}s")
    } else {
        format!("{s}s")
    }
}

fn first(results: &[QueryResult]) -> Result<&QueryResult> {
    results.first().ok_or_else(|| SniffError::query_failed("no result returned"))
}

/// Missing counters read as zero pages
fn pages(result: &QueryResult, name: &str) -> Result<f64> {
    match result.named_value(name) {
        None => Ok(0.0),
        Some(value) => value_as_f64(value)
            .ok_or_else(|| SniffError::query_failed(format!("error scanning buffer pool data: {name} = {value}"))),
    }
}
