//! Security probes: account hygiene from `mysql.user` and the server version
//!
//! Account probes return one row per offending `user@host`, or a single clean row.

use std::cmp::Ordering;

use crate::engine::QueryResult;
use crate::error::{Result, SniffError};
use crate::probe::{int_cell, text_cell, CheckResult, CheckStatus, Probe, ProbeGroup, Thresholds, VersionComparison};

/// Every account with a flag telling whether its credential is empty or NULL
pub const EMPTY_PASSWORD_SQL: &str = "SELECT user, host, \
    COALESCE(authentication_string, '') = '' AS empty_password FROM mysql.user";
/// Every account with a flag telling whether it holds SUPER
pub const SUPER_PRIV_SQL: &str = "SELECT user, host, Super_priv = 'Y' AS has_super FROM mysql.user";
pub const VERSION_SQL: &str = "SELECT @@version";

pub static GROUP: ProbeGroup = ProbeGroup {
    name: "security",
    title: "Security checks",
    probes: &[
        Probe { name: "Empty Passwords", statements: &[EMPTY_PASSWORD_SQL], classify: classify_empty_passwords },
        Probe { name: "Admin Privileges", statements: &[SUPER_PRIV_SQL], classify: classify_admin_privileges },
        Probe { name: "MySQL Version", statements: &[VERSION_SQL], classify: classify_version },
    ],
};

fn classify_empty_passwords(_: &Thresholds, results: &[QueryResult]) -> Result<Vec<CheckResult>> {
    let offenders = flagged_accounts(first(results)?)?;
    if offenders.is_empty() {
        return Ok(vec![CheckResult::new("Empty Passwords", "None Found", CheckStatus::Good, "No action needed.")
            .with_detail("No users with empty passwords.")]);
    }

    Ok(offenders
        .into_iter()
        .map(|account| {
            CheckResult::new("Empty Passwords", "Found", CheckStatus::Bad, "Set strong passwords for all accounts.")
                .with_detail(account)
        })
        .collect())
}

fn classify_admin_privileges(_: &Thresholds, results: &[QueryResult]) -> Result<Vec<CheckResult>> {
    let admins = flagged_accounts(first(results)?)?;
    if admins.is_empty() {
        return Ok(vec![CheckResult::new("Admin Privileges", "None Found", CheckStatus::Good, "No action needed.")
            .with_detail("No administrator accounts found.")]);
    }

    Ok(admins
        .into_iter()
        .map(|account| {
            CheckResult::new("Admin Privileges", "Found", CheckStatus::Bad, "Minimize the number of admin accounts.")
                .with_detail(account)
        })
        .collect())
}

fn classify_version(thresholds: &Thresholds, results: &[QueryResult]) -> Result<Vec<CheckResult>> {
    let version = text_cell(first(results)?, 0, 0)?;
    let detail = format!("Version: {version}");

    let row = if is_outdated(&version, &thresholds.minimum_version, thresholds.version_comparison) {
        CheckResult::new(
            "MySQL Version",
            "Outdated",
            CheckStatus::Bad,
            format!("Upgrade to MySQL {} or higher.", thresholds.minimum_version),
        )
    } else {
        CheckResult::new("MySQL Version", "Up-to-date", CheckStatus::Good, "No action needed.")
    };
    Ok(vec![row.with_detail(detail)])
}

/// `user@host` for every row whose third column is truthy
fn flagged_accounts(result: &QueryResult) -> Result<Vec<String>> {
    let mut accounts = Vec::new();
    for row in 0..result.rows.len() {
        if int_cell(result, row, 2)? != 0 {
            let user = text_cell(result, row, 0)?;
            let host = text_cell(result, row, 1)?;
            accounts.push(format!("{user}@{host}"));
        }
    }
    Ok(accounts)
}

/// Whether `version` is below `minimum` under the chosen comparison
///
/// Lexicographic mode compares raw strings, so "10.0" sorts before "8.0". It is kept
/// only to reproduce older reports.
#[must_use]
pub fn is_outdated(version: &str, minimum: &str, mode: VersionComparison) -> bool {
    match mode {
        VersionComparison::Lexicographic => version < minimum,
        VersionComparison::Semantic => compare_versions(version, minimum) == Ordering::Less,
    }
}

/// Compare the leading dotted numeric parts; suffixes like `-MariaDB` or `-log` are ignored
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let (a, b) = (numeric_parts(a), numeric_parts(b));
    let len = a.len().max(b.len());
    for i in 0..len {
        let ord = a.get(i).copied().unwrap_or(0).cmp(&b.get(i).copied().unwrap_or(0));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn numeric_parts(version: &str) -> Vec<u64> {
    let prefix: &str = version
        .trim()
        .split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .next()
        .unwrap_or("");
    prefix.split('.').filter(|part| !part.is_empty()).filter_map(|part| part.parse().ok()).collect()
}

fn first(results: &[QueryResult]) -> Result<&QueryResult> {
    results.first().ok_or_else(|| SniffError::query_failed("no result returned"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn accounts(rows: &[(&str, &str, &str)]) -> QueryResult {
        QueryResult::new(
            vec!["user".into(), "host".into(), "flag".into()],
            rows.iter().map(|(u, h, f)| vec![json!(u), json!(h), json!(f)]).collect(),
        )
    }

    fn version(v: &str) -> QueryResult {
        QueryResult::new(vec!["@@version".into()], vec![vec![json!(v)]])
    }

    #[test]
    fn test_admin_privileges_offenders() {
        let rows = classify_admin_privileges(
            &Thresholds::default(),
            &[accounts(&[("root", "localhost", "1"), ("app", "%", "0"), ("dba", "10.0.0.%", "1")])],
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].detail.as_deref(), Some("root@localhost"));
        assert_eq!(rows[1].detail.as_deref(), Some("dba@10.0.0.%"));
        assert!(rows.iter().all(|r| r.status == CheckStatus::Bad));
    }

    #[test]
    fn test_admin_privileges_clean() {
        let rows = classify_admin_privileges(&Thresholds::default(), &[accounts(&[("app", "%", "0")])]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, "None Found");
        assert_eq!(rows[0].status, CheckStatus::Good);
    }

    #[test]
    fn test_null_user_is_decode_error() {
        let result = QueryResult::new(
            vec!["user".into(), "host".into(), "flag".into()],
            vec![vec![serde_json::Value::Null, json!("%"), json!(1)]],
        );
        let err = classify_empty_passwords(&Thresholds::default(), &[result]).unwrap_err();
        assert_eq!(err.error_code(), "QUERY_FAILED");
    }

    #[test]
    fn test_version_semantic() {
        let t = Thresholds::default();
        let bad = classify_version(&t, &[version("5.7.44-log")]).unwrap();
        assert_eq!(bad[0].status, CheckStatus::Bad);
        assert_eq!(bad[0].remark, "Upgrade to MySQL 8.0 or higher.");
        assert_eq!(bad[0].detail.as_deref(), Some("Version: 5.7.44-log"));

        let good = classify_version(&t, &[version("8.0")]).unwrap();
        assert_eq!(good[0].status, CheckStatus::Good);

        let mariadb = classify_version(&t, &[version("10.11.2-MariaDB")]).unwrap();
        assert_eq!(mariadb[0].status, CheckStatus::Good);
    }

    #[test]
    fn test_version_lexicographic_flaw() {
        let t = Thresholds { version_comparison: VersionComparison::Lexicographic, ..Thresholds::default() };
        assert_eq!(classify_version(&t, &[version("5.7")]).unwrap()[0].status, CheckStatus::Bad);
        assert_eq!(classify_version(&t, &[version("8.0")]).unwrap()[0].status, CheckStatus::Good);
        // "1" < "8" as strings, so a newer major version is reported as outdated
        assert_eq!(classify_version(&t, &[version("10.0")]).unwrap()[0].status, CheckStatus::Bad);
    }

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("8.0.35", "8.0"), Ordering::Greater);
        assert_eq!(compare_versions("8.0", "8.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("5.7.44", "8.0"), Ordering::Less);
        assert_eq!(compare_versions("10.0", "8.0"), Ordering::Greater);
        assert_eq!(compare_versions("8.4.0-commercial", "8.0"), Ordering::Greater);
    }

    #[test]
    fn test_is_outdated_modes_disagree_on_two_digit_major() {
        assert!(is_outdated("10.0", "8.0", VersionComparison::Lexicographic));
        assert!(!is_outdated("10.0", "8.0", VersionComparison::Semantic));
    }
}
