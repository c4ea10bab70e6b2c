//! Schema Introspection
//!
//! Lists the tables of the connected database with `SHOW TABLES` and describes one table
//! at a time with `DESCRIBE`. Both return complete sequences; the display limits live in
//! [`SchemaOverview`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::engine::{value_as_string, QueryExecutor};
use crate::error::{Result, SniffError};

/// Tables shown in the schema preview
pub const MAX_PREVIEW_TABLES: usize = 5;

/// Columns shown per previewed table
pub const MAX_PREVIEW_COLUMNS: usize = 10;

/// Role of a column in the table's keys, as reported by `DESCRIBE`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyRole {
    None,
    Primary,
    Unique,
    Multiple,
    /// Anything the server reports that is not listed above
    Other(String),
}

impl KeyRole {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "" => Self::None,
            "PRI" => Self::Primary,
            "UNI" => Self::Unique,
            "MUL" => Self::Multiple,
            other => Self::Other(other.to_string()),
        }
    }

    /// The label `DESCRIBE` uses
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::None => "",
            Self::Primary => "PRI",
            Self::Unique => "UNI",
            Self::Multiple => "MUL",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,

    /// Declared type, e.g. `varchar(255)`
    pub column_type: String,

    pub nullable: bool,

    pub key: KeyRole,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// Extra attributes, e.g. `auto_increment`
    pub extra: String,
}

/// List all tables in the connected database
pub async fn list_tables<E: QueryExecutor>(exec: &mut E) -> Result<Vec<String>> {
    let result = exec.query("SHOW TABLES").await?;
    result
        .rows
        .iter()
        .map(|row| {
            row.first()
                .and_then(value_as_string)
                .ok_or_else(|| SniffError::query_failed("failed to decode table name"))
        })
        .collect()
}

/// Describe the columns of one table
pub async fn describe_table<E: QueryExecutor>(exec: &mut E, table: &str) -> Result<Vec<Column>> {
    let sql = format!("DESCRIBE {}", quote_identifier(table));
    let result = exec.query(&sql).await?;

    result
        .rows
        .iter()
        .map(|row| {
            let text = |idx: usize| row.get(idx).and_then(value_as_string);
            let required = |idx: usize, what: &str| {
                text(idx).ok_or_else(|| {
                    SniffError::query_failed(format!("failed to decode {what} for table {table}"))
                })
            };

            Ok(Column {
                name: required(0, "column name")?,
                column_type: required(1, "column type")?,
                nullable: required(2, "nullability")?.eq_ignore_ascii_case("YES"),
                key: KeyRole::parse(&text(3).unwrap_or_default()),
                default: text(4),
                extra: text(5).unwrap_or_default(),
            })
        })
        .collect()
}

/// Backtick-quote an identifier, doubling embedded backticks
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// One table in the schema preview
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablePreview {
    pub name: String,

    /// Number of columns the table actually has
    pub total_columns: usize,

    /// At most [`MAX_PREVIEW_COLUMNS`] columns
    pub columns: Vec<Column>,
}

/// Bounded view of the schema for display
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaOverview {
    /// Number of tables in the database
    pub total_tables: usize,

    /// At most [`MAX_PREVIEW_TABLES`] tables
    pub tables: Vec<TablePreview>,

    /// Introspection error, if the preview could not be completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SchemaOverview {
    /// Tables that exist but were not previewed
    #[must_use]
    pub fn hidden_tables(&self) -> usize {
        self.total_tables.saturating_sub(self.tables.len())
    }
}

/// Schema preview stopped by an introspection error
#[derive(Debug, Clone)]
pub struct SchemaAborted {
    /// Table count and previews built before the failure, with `error` filled in
    pub partial: SchemaOverview,
    pub error: SniffError,
}

impl SchemaAborted {
    fn new(mut partial: SchemaOverview, error: SniffError) -> Self {
        partial.error = Some(error.message());
        Self { partial, error }
    }

    /// Whether `SHOW TABLES` itself succeeded
    #[must_use]
    pub const fn tables_listed(&self) -> bool {
        self.partial.total_tables > 0
    }
}

/// Build the schema preview: the first five tables, ten columns each
///
/// Stops at the first introspection error, keeping what was built so far; nothing is
/// retried.
pub async fn preview_schema<E: QueryExecutor>(exec: &mut E) -> std::result::Result<SchemaOverview, SchemaAborted> {
    let tables = list_tables(exec)
        .await
        .map_err(|error| SchemaAborted::new(SchemaOverview::default(), error))?;
    tracing::debug!(tables = tables.len(), "tables listed");

    let mut overview = SchemaOverview { total_tables: tables.len(), ..SchemaOverview::default() };
    for name in tables.iter().take(MAX_PREVIEW_TABLES) {
        let mut columns = match describe_table(exec, name).await {
            Ok(columns) => columns,
            Err(SniffError::QueryFailed(msg)) => {
                let error = SniffError::query_failed(format!("error retrieving schema for table {name}: {msg}"));
                return Err(SchemaAborted::new(overview, error));
            }
            Err(other) => return Err(SchemaAborted::new(overview, other)),
        };
        let total_columns = columns.len();
        columns.truncate(MAX_PREVIEW_COLUMNS);
        overview.tables.push(TablePreview { name: name.clone(), total_columns, columns });
    }

    Ok(overview)
}
