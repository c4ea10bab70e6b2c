//! Text Rendering
//!
//! Boxed ASCII tables for the schema preview and each probe group. Status cells are
//! colored by severity when color is enabled; padding is computed on the plain text so
//! escape codes never skew the columns.

use colored::Colorize;
use std::io::{self, Write};

use crate::probe::Severity;
use crate::report::{GroupReport, ReportSink, Summary};
use crate::schema::SchemaOverview;

const SEPARATOR_WIDTH: usize = 80;

/// A table of plain-text cells
#[derive(Debug, Clone, Default)]
pub struct TextTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    /// Column whose cells are colored by severity
    status_column: Option<usize>,
}

impl TextTable {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { headers: headers.into_iter().map(Into::into).collect(), ..Self::default() }
    }

    #[must_use]
    pub fn with_status_column(mut self, idx: usize) -> Self {
        self.status_column = Some(idx);
        self
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Render with `+---+` borders; upper-cased headers
    #[must_use]
    pub fn render(&self, color: bool) -> String {
        let widths: Vec<usize> = (0..self.headers.len())
            .map(|col| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(col))
                    .chain(std::iter::once(&self.headers[col]))
                    .map(|cell| cell.chars().count())
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let border = {
            let mut line = String::from("+");
            for width in &widths {
                line.push_str(&"-".repeat(width + 2));
                line.push('+');
            }
            line
        };

        let mut out = String::new();
        out.push_str(&border);
        out.push('\n');
        let headers: Vec<String> = self.headers.iter().map(|h| h.to_uppercase()).collect();
        out.push_str(&render_line(&headers, &widths, |_, cell| cell.to_string()));
        out.push('\n');
        out.push_str(&border);
        out.push('\n');

        for row in &self.rows {
            let line = render_line(row, &widths, |col, padded| {
                if color && Some(col) == self.status_column {
                    colorize_status(padded)
                } else {
                    padded.to_string()
                }
            });
            out.push_str(&line);
            out.push('\n');
        }

        out.push_str(&border);
        out.push('\n');
        out
    }
}

fn render_line(cells: &[String], widths: &[usize], style: impl Fn(usize, &str) -> String) -> String {
    let mut line = String::from("|");
    for (col, width) in widths.iter().enumerate() {
        let cell = cells.get(col).map_or("", String::as_str);
        let padded = format!("{cell:<width$}");
        line.push(' ');
        line.push_str(&style(col, &padded));
        line.push_str(" |");
    }
    line
}

fn colorize_status(padded: &str) -> String {
    let label = padded.trim_end();
    let severity = match label {
        "Warning" => Severity::Warn,
        "Bad" | "FAILED" => Severity::Fail,
        _ => Severity::Pass,
    };
    let styled = match severity {
        Severity::Pass => label.green(),
        Severity::Warn => label.yellow().bold(),
        Severity::Fail => label.red().bold(),
    };
    format!("{styled}{}", &padded[label.len()..])
}

/// Schema preview as text; a partial preview is followed by its error
#[must_use]
pub fn render_schema(overview: &SchemaOverview, color: bool) -> String {
    let mut out = String::new();

    if overview.total_tables == 0 {
        match &overview.error {
            Some(error) => out.push_str(&styled(&format!("Error retrieving tables: {error}"), color, Tone::Error)),
            None => out.push_str("\nTables in the database:\n\n(no tables)"),
        }
        out.push('\n');
        return out;
    }

    out.push_str("\nTables in the database:\n");
    for table in &overview.tables {
        out.push_str(&format!("\n{}\n", table.name));
        let mut rendered = TextTable::new(["Column", "Type", "Null", "Key", "Default", "Extra"]);
        for column in &table.columns {
            rendered.push_row(vec![
                column.name.clone(),
                column.column_type.clone(),
                if column.nullable { "YES" } else { "NO" }.to_string(),
                column.key.to_string(),
                column.default.clone().unwrap_or_else(|| "NULL".to_string()),
                column.extra.clone(),
            ]);
        }
        out.push_str(&rendered.render(color));
        if table.total_columns > table.columns.len() {
            out.push_str(&format!("... {} more columns\n", table.total_columns - table.columns.len()));
        }
    }

    if let Some(error) = &overview.error {
        out.push('\n');
        out.push_str(&styled(error, color, Tone::Error));
        out.push('\n');
    }

    if overview.hidden_tables() > 0 {
        out.push_str(&format!(
            "\nDisplayed {} of {} tables. For more details, check the database directly.\n",
            overview.tables.len(),
            overview.total_tables
        ));
    }
    out
}

/// One probe group as text; the detail column is shown only when some row has one
#[must_use]
pub fn render_group(group: &GroupReport, color: bool) -> String {
    let mut out = String::new();
    out.push_str(&styled(&format!("\n{}", group.title), color, Tone::Heading));
    out.push('\n');

    if !group.checks.is_empty() {
        let with_detail = group.checks.iter().any(|c| c.detail.is_some());
        let mut table = if with_detail {
            TextTable::new(["Check", "Value", "Details", "Status", "Remarks"]).with_status_column(3)
        } else {
            TextTable::new(["Check", "Value", "Status", "Remarks"]).with_status_column(2)
        };

        for check in &group.checks {
            let mut row = vec![check.check.clone(), check.value.clone()];
            if with_detail {
                row.push(check.detail.clone().unwrap_or_default());
            }
            row.push(check.status.to_string());
            row.push(check.remark.clone());
            table.push_row(row);
        }
        out.push_str(&table.render(color));
    }

    if let Some(error) = &group.error {
        out.push_str(&styled(&format!("{} failed: {}", group.title, error.message), color, Tone::Error));
        out.push('\n');
    }
    out
}

/// Closing line of a text report
#[must_use]
pub fn render_summary(summary: &Summary, color: bool) -> String {
    let mut line = format!(
        "\nChecks completed: {} passed, {} warnings, {} failures.",
        summary.passed, summary.warnings, summary.failures
    );
    if summary.aborted_groups > 0 {
        line.push_str(&format!(" {} group(s) could not finish.", summary.aborted_groups));
    }
    line.push_str(" Review the tables above for details.");
    let mut out = styled(&line, color, Tone::Notice);
    out.push('\n');
    out
}

#[must_use]
pub fn separator(color: bool) -> String {
    styled(&"=".repeat(SEPARATOR_WIDTH), color, Tone::Rule)
}

#[derive(Clone, Copy)]
enum Tone {
    Heading,
    Rule,
    Notice,
    Error,
}

fn styled(text: &str, color: bool, tone: Tone) -> String {
    if !color {
        return text.to_string();
    }
    match tone {
        Tone::Heading => text.cyan().to_string(),
        Tone::Rule => text.blue().to_string(),
        Tone::Notice => text.bright_yellow().bold().to_string(),
        Tone::Error => text.red().to_string(),
    }
}

/// Sink printing each section as text as soon as it arrives
pub struct TextSink<W: Write> {
    out: W,
    color: bool,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn write_summary(&mut self, summary: &Summary) {
        let text = render_summary(summary, self.color);
        self.emit(&text);
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        if let Err(error) = write_all(&mut self.out, text) {
            tracing::debug!(%error, "failed to write report output");
        }
    }
}

fn write_all<W: Write>(out: &mut W, text: &str) -> io::Result<()> {
    out.write_all(text.as_bytes())?;
    out.flush()
}

impl<W: Write> ReportSink for TextSink<W> {
    fn schema(&mut self, overview: &SchemaOverview) {
        let text = format!("{}\n{}", separator(self.color), render_schema(overview, self.color));
        self.emit(&text);
    }

    fn group(&mut self, group: &GroupReport) {
        let text = format!("{}\n{}", separator(self.color), render_group(group, self.color));
        self.emit(&text);
    }
}
