//! dbsniff CLI Entry Point
//!
//! Subcommands:
//! - `sniff` - Full report: schema preview, health, security and performance checks
//! - `schema` - Schema preview only
//! - `connect` - Verify a connection and save it as a named profile
//! - `profiles` - List saved profiles
//!
//! Reports go to stdout (text tables or one JSON envelope). Prompts and logs go to stderr.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Password};
use serde::Serialize;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use dbsniff::config::{self, ConnectionDraft, SniffConfig, StoredConnection};
use dbsniff::render::{self, TextSink};
use dbsniff::report::{self, SniffOptions};
use dbsniff::{
    ConnectionConfig, ErrorEnvelope, Metadata, MySqlConnection, SniffError, SuccessEnvelope,
};

/// dbsniff - Read-only health, security and performance diagnostics for MySQL
#[derive(Parser)]
#[command(name = "dbsniff")]
#[command(about = "Read-only health, security and performance diagnostics for MySQL databases")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/dbsniff/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging on stderr (DBSNIFF_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full diagnostic report
    Sniff {
        #[command(flatten)]
        conn: ConnectionArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Fail any single diagnostic query that runs longer than this
        #[arg(long)]
        query_timeout_ms: Option<u64>,
    },

    /// Preview tables and columns only
    Schema {
        #[command(flatten)]
        conn: ConnectionArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Verify a connection and save it as a named profile
    Connect {
        /// Profile name to save under
        #[arg(long)]
        name: String,

        /// Make this the default profile
        #[arg(long)]
        default: bool,

        #[command(flatten)]
        conn: ConnectionArgs,
    },

    /// List saved connection profiles
    Profiles,
}

#[derive(Args)]
struct ConnectionArgs {
    /// Saved profile to start from (default: the configured default profile)
    #[arg(long)]
    profile: Option<String>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    user: Option<String>,

    #[arg(long)]
    database: Option<String>,

    /// Environment variable holding the password
    #[arg(long)]
    password_env: Option<String>,

    /// Never prompt; fail if a connection parameter is missing
    #[arg(long)]
    no_prompt: bool,
}

#[derive(Args)]
struct OutputArgs {
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputArgs {
    fn color(&self) -> bool {
        !self.no_color && self.format == OutputFormat::Text && io::stdout().is_terminal()
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    dbsniff::logging::init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{} {error:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config_path = match cli.config {
        Some(path) => path,
        None => config::default_config_path()?,
    };
    let sniff_config = config::load_config(&config_path)?;

    match cli.command {
        Commands::Sniff { conn, output, yes, query_timeout_ms } => {
            let options = SniffOptions {
                thresholds: sniff_config.thresholds.clone(),
                query_timeout: query_timeout_ms.filter(|ms| *ms > 0).map(Duration::from_millis),
            };
            let config = match resolve_connection(&sniff_config, &conn) {
                Ok(config) => config,
                Err(error) => return Ok(report_error("sniff", &output, &error)),
            };
            cmd_sniff(&config, &options, &output, yes).await
        }
        Commands::Schema { conn, output } => {
            let options = SniffOptions { thresholds: sniff_config.thresholds.clone(), query_timeout: None };
            let config = match resolve_connection(&sniff_config, &conn) {
                Ok(config) => config,
                Err(error) => return Ok(report_error("schema", &output, &error)),
            };
            cmd_schema(&config, &options, &output).await
        }
        Commands::Connect { name, default, conn } => {
            let password_env = conn.password_env.clone();
            let config = resolve_connection(&sniff_config, &conn)?;
            cmd_connect(sniff_config, &config_path, &name, default, &config, password_env).await
        }
        Commands::Profiles => cmd_profiles(&sniff_config),
    }
}

async fn cmd_sniff(
    config: &ConnectionConfig,
    options: &SniffOptions,
    output: &OutputArgs,
    yes: bool,
) -> Result<ExitCode> {
    if !yes && io::stdin().is_terminal() {
        eprintln!(
            "{}",
            "WARNING: The sniffing process may take some time, depending on the database size and performance."
                .bright_yellow()
                .bold()
        );
        let proceed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Do you want to perform a database sniff?")
            .default(false)
            .interact()
            .context("confirmation prompt failed")?;
        if !proceed {
            eprintln!("Sniff cancelled.");
            return Ok(ExitCode::SUCCESS);
        }
    }

    let started = Instant::now();
    match output.format {
        OutputFormat::Text => {
            let color = output.color();
            let mut sink = TextSink::new(io::stdout().lock(), color);
            match report::sniff(config, options, &mut sink).await {
                Ok(report) => {
                    sink.write_summary(&report.summary());
                    Ok(ExitCode::SUCCESS)
                }
                Err(error) => Ok(report_error("sniff", output, &error)),
            }
        }
        OutputFormat::Json => match report::sniff(config, options, &mut report::NullSink).await {
            Ok(report) => {
                let meta = Metadata::with_checks(elapsed_ms(started), report.total_checks());
                print_json(&SuccessEnvelope::new("sniff", &report, meta))?;
                Ok(ExitCode::SUCCESS)
            }
            Err(error) => Ok(report_error("sniff", output, &error)),
        },
    }
}

async fn cmd_schema(config: &ConnectionConfig, options: &SniffOptions, output: &OutputArgs) -> Result<ExitCode> {
    let started = Instant::now();
    let overview = match report::schema_only(config, options).await {
        Ok(overview) => overview,
        Err(error) => return Ok(report_error("schema", output, &error)),
    };

    match output.format {
        OutputFormat::Text => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(render::render_schema(&overview, output.color()).as_bytes())?;
        }
        OutputFormat::Json => {
            print_json(&SuccessEnvelope::new("schema", &overview, Metadata::new(elapsed_ms(started))))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn cmd_connect(
    mut sniff_config: SniffConfig,
    config_path: &Path,
    name: &str,
    make_default: bool,
    config: &ConnectionConfig,
    password_env: Option<String>,
) -> Result<ExitCode> {
    let mut conn = MySqlConnection::connect(config).await?;
    let version = conn.server_version().await?;
    conn.close().await?;

    if password_env.is_none() && !config.password.is_empty() {
        eprintln!(
            "{}",
            "Note: the password is stored in clear text. Use --password-env to reference an environment variable instead."
                .yellow()
        );
    }

    sniff_config.upsert_profile(name, StoredConnection::from_config(config, password_env));
    if make_default {
        sniff_config.default = Some(name.to_string());
    }
    config::save_config(config_path, &sniff_config)?;

    println!(
        "Connection to {} verified (server {version}). Saved profile '{name}' to {}.",
        config.display_target(),
        config_path.display()
    );
    Ok(ExitCode::SUCCESS)
}

fn cmd_profiles(sniff_config: &SniffConfig) -> Result<ExitCode> {
    if sniff_config.connections.is_empty() {
        println!("No saved profiles. Run 'dbsniff connect --name <NAME>' to create one.");
        return Ok(ExitCode::SUCCESS);
    }

    for (name, stored) in &sniff_config.connections {
        let marker = if sniff_config.default.as_deref() == Some(name.as_str()) { "*" } else { " " };
        println!(
            "{marker} {name}\t{}@{}:{}/{}",
            stored.user.as_deref().unwrap_or("?"),
            stored.host.as_deref().unwrap_or("?"),
            stored.port.map_or_else(|| "?".to_string(), |p| p.to_string()),
            stored.database.as_deref().unwrap_or("?"),
        );
    }
    Ok(ExitCode::SUCCESS)
}

/// Profile, then flags, then prompts for whatever is still missing
fn resolve_connection(sniff_config: &SniffConfig, args: &ConnectionArgs) -> dbsniff::Result<ConnectionConfig> {
    let password = match &args.password_env {
        Some(var) => Some(std::env::var(var).map_err(|_| {
            SniffError::invalid_input(format!("Environment variable {var} not found for password"))
        })?),
        None => None,
    };

    let flags = ConnectionDraft {
        host: args.host.clone(),
        port: args.port,
        user: args.user.clone(),
        password,
        database: args.database.clone(),
    };
    let draft = sniff_config.profile_draft(args.profile.as_deref())?.overlay(flags);

    let draft = if !args.no_prompt && !draft.missing_fields().is_empty() && io::stdin().is_terminal() {
        prompt_missing(draft)
            .map_err(|e| SniffError::invalid_input(format!("prompt failed: {e}")))?
    } else {
        draft
    };

    draft.complete()
}

fn prompt_missing(mut draft: ConnectionDraft) -> Result<ConnectionDraft, dialoguer::Error> {
    let theme = ColorfulTheme::default();
    eprintln!("Please enter the database connection details:");

    if draft.host.is_none() {
        draft.host = Some(
            Input::with_theme(&theme)
                .with_prompt("What is your database host?")
                .default("localhost".to_string())
                .interact_text()?,
        );
    }
    if draft.port.is_none() {
        draft.port = Some(
            Input::with_theme(&theme)
                .with_prompt("What is your database port?")
                .default(3306u16)
                .interact_text()?,
        );
    }
    if draft.user.is_none() {
        draft.user = Some(
            Input::with_theme(&theme)
                .with_prompt("What is your database user?")
                .default("root".to_string())
                .interact_text()?,
        );
    }
    if draft.password.is_none() {
        draft.password = Some(
            Password::with_theme(&theme)
                .with_prompt("What is your database password?")
                .allow_empty_password(true)
                .interact()?,
        );
    }
    if draft.database.is_none() {
        draft.database = Some(
            Input::with_theme(&theme)
                .with_prompt("What is your database name?")
                .default("mydatabase".to_string())
                .interact_text()?,
        );
    }
    Ok(draft)
}

/// Print an error in the selected format and pick the exit code
fn report_error(command: &str, output: &OutputArgs, error: &SniffError) -> ExitCode {
    tracing::error!(command, %error, "command failed");
    match output.format {
        OutputFormat::Json => {
            if let Err(e) = print_json(&ErrorEnvelope::from_error(command, error)) {
                eprintln!("failed to write error envelope: {e}");
            }
        }
        OutputFormat::Text => {
            let prefix = match error {
                SniffError::ConnectionFailed(_) => "Error connecting to the database:",
                _ => "Error:",
            };
            eprintln!("{} {}", prefix.red().bold(), error.message());
        }
    }
    ExitCode::FAILURE
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{json}");
    Ok(())
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
