//! Shared fixture server for integration tests

#![allow(dead_code)]

use dbsniff::engine::fixture::FixtureExecutor;
use dbsniff::probe::{health, performance, security};
use serde_json::{json, Value};

pub const DESCRIBE_COLUMNS: [&str; 6] = ["Field", "Type", "Null", "Key", "Default", "Extra"];
pub const SIZE_COLUMNS: [&str; 6] = ["table_schema", "table_name", "table_rows", "index_size", "data_size", "total_size"];

/// A small, healthy server: two tables, no risky accounts, MySQL 8.0.36
pub fn healthy_server() -> FixtureExecutor {
    FixtureExecutor::new()
        .with_rows("SHOW TABLES", &["Tables_in_shop"], vec![vec![json!("customers")], vec![json!("orders")]])
        .with_rows(
            "DESCRIBE `customers`",
            &DESCRIBE_COLUMNS,
            vec![
                vec![json!("id"), json!("int"), json!("NO"), json!("PRI"), Value::Null, json!("auto_increment")],
                vec![json!("email"), json!("varchar(255)"), json!("YES"), json!("UNI"), Value::Null, json!("")],
            ],
        )
        .with_rows(
            "DESCRIBE `orders`",
            &DESCRIBE_COLUMNS,
            vec![
                vec![json!("id"), json!("bigint"), json!("NO"), json!("PRI"), Value::Null, json!("auto_increment")],
                vec![json!("status"), json!("varchar(16)"), json!("NO"), json!(""), json!("new"), json!("")],
            ],
        )
        .with_status(health::UPTIME_SQL, &[("Uptime", "93785")])
        .with_status(health::ACTIVE_CONNECTIONS_SQL, &[("Threads_connected", "7")])
        .with_status(health::SLOW_QUERIES_SQL, &[("Slow_queries", "3")])
        .with_status(
            health::BUFFER_POOL_SQL,
            &[("Innodb_buffer_pool_pages_data", "6000"), ("Innodb_buffer_pool_pages_total", "8192")],
        )
        .with_status(health::OPEN_TABLES_SQL, &[("Open_tables", "79")])
        .with_status(health::TABLE_OPEN_CACHE_SQL, &[("table_open_cache", "100")])
        .with_rows(
            security::EMPTY_PASSWORD_SQL,
            &["user", "host", "empty_password"],
            vec![vec![json!("app"), json!("%"), json!(0)]],
        )
        .with_rows(
            security::SUPER_PRIV_SQL,
            &["user", "host", "has_super"],
            vec![vec![json!("app"), json!("%"), json!(0)]],
        )
        .with_rows(security::VERSION_SQL, &["@@version"], vec![vec![json!("8.0.36")]])
        .with_rows(
            performance::TABLE_SIZES_SQL,
            &SIZE_COLUMNS,
            vec![
                vec![json!("shop"), json!("customers"), json!(120_000), json!(4_194_304), json!(9_437_184), json!(13_631_488)],
                vec![json!("shop"), json!("orders"), json!(500), json!(0), json!(16_384), json!(16_384)],
            ],
        )
}
