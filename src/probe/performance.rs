//! Performance probes: large user tables that carry no index at all

use crate::engine::QueryResult;
use crate::error::{Result, SniffError};
use crate::probe::{int_cell, text_cell, CheckResult, CheckStatus, Probe, ProbeGroup, Thresholds};

/// Row counts and aggregated sizes for every table outside the system schemas
pub const TABLE_SIZES_SQL: &str = "
    SELECT
        t.table_schema,
        t.table_name,
        t.table_rows,
        ps.index_size,
        ps.data_size,
        ps.total_size
    FROM
        information_schema.tables t
    JOIN (
        SELECT
            table_schema,
            table_name,
            SUM(data_length) AS data_size,
            SUM(index_length) AS index_size,
            SUM(data_length + index_length) AS total_size
        FROM
            information_schema.tables
        GROUP BY
            table_schema,
            table_name
    ) ps ON t.table_schema = ps.table_schema AND t.table_name = ps.table_name
    WHERE
        t.table_schema NOT IN ('information_schema', 'mysql', 'performance_schema', 'sys')
    ORDER BY
        t.table_schema,
        t.table_name";

pub static GROUP: ProbeGroup = ProbeGroup {
    name: "performance",
    title: "Performance checks",
    probes: &[Probe {
        name: "Table Index Check",
        statements: &[TABLE_SIZES_SQL],
        classify: classify_unindexed_tables,
    }],
};

/// Size statistics of one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSize {
    pub schema: String,
    pub table: String,
    pub rows: i64,
    pub index_size: i64,
    pub data_size: i64,
    pub total_size: i64,
}

impl TableSize {
    /// More rows than `row_limit` and not a single index byte
    #[must_use]
    pub const fn is_unindexed_large(&self, row_limit: i64) -> bool {
        self.rows > row_limit && self.index_size == 0
    }
}

fn classify_unindexed_tables(thresholds: &Thresholds, results: &[QueryResult]) -> Result<Vec<CheckResult>> {
    let result = results.first().ok_or_else(|| SniffError::query_failed("no result returned"))?;

    let mut rows = Vec::new();
    for table in decode_table_sizes(result)? {
        if table.is_unindexed_large(thresholds.large_table_rows) {
            rows.push(
                CheckResult::new(
                    "Table Index Check",
                    format!("{}.{}", table.schema, table.table),
                    CheckStatus::Failed,
                    "Add a primary key or a secondary index.",
                )
                .with_detail(format!(
                    "{} rows, Data Size: {}, Index Size: {}, Total Size: {}",
                    table.rows, table.data_size, table.index_size, table.total_size
                )),
            );
        }
    }

    if rows.is_empty() {
        rows.push(CheckResult::new(
            "Table Index Check",
            "None Found",
            CheckStatus::Passed,
            "All tables with significant data are indexed.",
        ));
    }
    Ok(rows)
}

/// Decode the size query; NULL counters (views) read as zero
fn decode_table_sizes(result: &QueryResult) -> Result<Vec<TableSize>> {
    (0..result.rows.len())
        .map(|row| {
            Ok(TableSize {
                schema: text_cell(result, row, 0)?,
                table: text_cell(result, row, 1)?,
                rows: int_cell(result, row, 2)?,
                index_size: int_cell(result, row, 3)?,
                data_size: int_cell(result, row, 4)?,
                total_size: int_cell(result, row, 5)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn sizes(rows: Vec<Vec<Value>>) -> QueryResult {
        QueryResult::new(
            ["table_schema", "table_name", "table_rows", "index_size", "data_size", "total_size"]
                .iter()
                .map(|c| (*c).to_string())
                .collect(),
            rows,
        )
    }

    #[test]
    fn test_row_limit_is_exclusive() {
        let table = TableSize {
            schema: "shop".into(),
            table: "events".into(),
            rows: 10_000,
            index_size: 0,
            data_size: 1,
            total_size: 1,
        };
        assert!(!table.is_unindexed_large(10_000));
        assert!(table.is_unindexed_large(9_999));
    }

    #[test]
    fn test_view_rows_are_ignored() {
        let result = sizes(vec![vec![json!("shop"), json!("v_orders"), Value::Null, Value::Null, Value::Null, Value::Null]]);
        let rows = classify_unindexed_tables(&Thresholds::default(), &[result]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, CheckStatus::Passed);
    }

    #[test]
    fn test_custom_row_limit() {
        let result = sizes(vec![vec![json!("shop"), json!("log"), json!(500), json!(0), json!(16384), json!(16384)]]);
        let t = Thresholds { large_table_rows: 100, ..Thresholds::default() };
        let rows = classify_unindexed_tables(&t, &[result]).unwrap();
        assert_eq!(rows[0].status, CheckStatus::Failed);
        assert_eq!(rows[0].value, "shop.log");
        assert_eq!(rows[0].detail.as_deref(), Some("500 rows, Data Size: 16384, Index Size: 0, Total Size: 16384"));
    }
}
