//! Read-Only Statement Guard
//!
//! dbsniff only ever reads server state. Every statement sent over a live connection
//! passes through [`ensure_read_only`] first, so a malformed probe definition can never
//! modify the target database.
//!
//! # Validation Strategy
//! - Comments are stripped and the statement is upper-cased for matching
//! - Multi-statement input is rejected
//! - Only `SELECT`, `SHOW`, `DESCRIBE`/`DESC`, `WITH` and `EXPLAIN` of those are permitted

use crate::error::{Result, SniffError};

/// Statement category as seen by the guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// `SELECT ...` or `WITH ... SELECT`
    Select,
    /// `SHOW ...`
    Show,
    /// `DESCRIBE ...` / `DESC ...`
    Describe,
    /// Anything else
    Other,
}

/// Fail unless `sql` is a single read-only statement
pub fn ensure_read_only(sql: &str) -> Result<StatementKind> {
    let processed = preprocess_sql(sql)?;
    match classify(&processed) {
        StatementKind::Other => Err(SniffError::read_only_violation(format!(
            "refusing to execute non read-only statement: {}",
            first_line(sql)
        ))),
        kind => Ok(kind),
    }
}

/// Trim, strip comments, reject multiple statements and upper-case
fn preprocess_sql(sql: &str) -> Result<String> {
    let trimmed = sql.trim();
    if trimmed.is_empty() {
        return Err(SniffError::invalid_input("Query cannot be empty"));
    }

    let stripped = strip_comments(trimmed);

    // A single trailing semicolon is fine
    let body = stripped.trim().trim_end_matches(';').trim();
    if body.contains(';') {
        return Err(SniffError::read_only_violation("multi-statement queries are not allowed"));
    }

    Ok(body.to_uppercase())
}

/// Remove `--` line comments and `/* */` block comments
fn strip_comments(sql: &str) -> String {
    let mut result = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '-' if chars.peek() == Some(&'-') => {
                chars.next();
                for ch in chars.by_ref() {
                    if ch == '\n' {
                        result.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                for ch in chars.by_ref() {
                    if prev == '*' && ch == '/' {
                        break;
                    }
                    prev = ch;
                }
                result.push(' ');
            }
            _ => result.push(ch),
        }
    }

    result
}

fn classify(sql: &str) -> StatementKind {
    let sql = sql.strip_prefix("EXPLAIN").map_or(sql, str::trim_start);
    let keyword = sql.split_whitespace().next().unwrap_or("");

    match keyword {
        "SELECT" => StatementKind::Select,
        "WITH" if sql.contains("SELECT") => StatementKind::Select,
        "SHOW" => StatementKind::Show,
        "DESCRIBE" | "DESC" => StatementKind::Describe,
        _ => StatementKind::Other,
    }
}

fn first_line(sql: &str) -> &str {
    sql.trim().lines().next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_statements_allowed() {
        assert_eq!(ensure_read_only("SHOW GLOBAL STATUS LIKE 'Uptime'").unwrap(), StatementKind::Show);
        assert_eq!(ensure_read_only("SHOW TABLES").unwrap(), StatementKind::Show);
        assert_eq!(ensure_read_only("DESCRIBE `orders`").unwrap(), StatementKind::Describe);
        assert_eq!(ensure_read_only("select @@version;").unwrap(), StatementKind::Select);
        assert_eq!(
            ensure_read_only("\n  SELECT t.table_schema\n  FROM information_schema.tables t").unwrap(),
            StatementKind::Select
        );
    }

    #[test]
    fn test_writes_rejected() {
        for sql in [
            "UPDATE mysql.user SET Super_priv = 'N'",
            "DROP TABLE orders",
            "SET GLOBAL slow_query_log = 1",
            "FLUSH PRIVILEGES",
        ] {
            let err = ensure_read_only(sql).unwrap_err();
            assert_eq!(err.error_code(), "READ_ONLY_VIOLATION", "{sql}");
        }
    }

    #[test]
    fn test_multi_statement_rejected() {
        let err = ensure_read_only("SHOW TABLES; DROP TABLE orders").unwrap_err();
        assert!(err.message().contains("multi-statement"));
    }

    #[test]
    fn test_empty_rejected() {
        let err = ensure_read_only("   ").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_comments_stripped() {
        assert!(ensure_read_only("-- uptime\nSHOW GLOBAL STATUS").is_ok());
        assert!(ensure_read_only("/* hint */ SELECT 1").is_ok());
        assert!(ensure_read_only("/* SELECT */ DELETE FROM t").is_err());
    }

    #[test]
    fn test_explain_and_cte() {
        assert!(ensure_read_only("EXPLAIN SELECT * FROM orders").is_ok());
        assert!(ensure_read_only("WITH x AS (SELECT 1) SELECT * FROM x").is_ok());
        assert!(ensure_read_only("EXPLAIN DELETE FROM orders").is_err());
    }
}
