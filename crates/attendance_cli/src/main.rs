//! Absence ledger command-line entry point.
//!
//! # Responsibility
//! - Load configuration and wire sheets, directory and services together.
//! - Run one collection for a time slot from a roster JSON file.
//! - Print the run report as JSON on stdout.

use attendance_core::db::open_db;
use attendance_core::{
    default_log_level, init_logging, AppConfig, NotificationComposer, RosterEntry, RunRequest,
    RunService, SqliteSheet, StudentDirectory, TimeSlot, LEDGER_HEADER,
};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use log::error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "attendance", version, about = "Absence roster to ledger reconciliation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Normalize a roster and reconcile it into the ledger.
    Run(RunArgs),
    /// Write the ledger header row into an empty ledger sheet.
    Init(ConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    /// TOML configuration file.
    #[arg(long, env = "ATTENDANCE_CONFIG")]
    config: PathBuf,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[command(flatten)]
    config: ConfigArgs,
    /// JSON array of `{course_descriptor, student_list_text}` rows.
    #[arg(long)]
    roster: PathBuf,
    #[arg(long, env = "TIME_SLOT", default_value = "morning", value_parser = parse_slot)]
    time_slot: TimeSlot,
    /// Ledger date (YYYY-MM-DD); defaults to today in the configured time zone.
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Plan only; write nothing.
    #[arg(long)]
    dry_run: bool,
}

fn parse_slot(value: &str) -> Result<TimeSlot, String> {
    value.parse::<TimeSlot>().map_err(|err| err.to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::Run(args) => run(args),
        Command::Init(args) => init(args),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_exit module=cli status=error error={message}");
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: &Path) -> Result<AppConfig, String> {
    let config = AppConfig::load(path).map_err(|err| err.to_string())?;
    if let Some(dir) = config.logging.dir.as_deref() {
        init_logging(log_level(&config), dir)?;
    }
    Ok(config)
}

fn log_level(config: &AppConfig) -> &str {
    config
        .logging
        .level
        .as_deref()
        .unwrap_or(default_log_level())
}

fn init(args: ConfigArgs) -> Result<(), String> {
    let config = load_config(&args.config)?;
    let conn = open_db(&config.storage.db_path).map_err(|err| err.to_string())?;
    let ledger =
        SqliteSheet::try_new(&conn, config.sheets.ledger.as_str()).map_err(|err| err.to_string())?;

    let written = ledger
        .ensure_header(&LEDGER_HEADER)
        .map_err(|err| err.to_string())?;
    println!(
        "{}",
        serde_json::json!({ "sheet": ledger.name(), "header_written": written })
    );
    Ok(())
}

fn run(args: RunArgs) -> Result<(), String> {
    let config = load_config(&args.config.config)?;
    let entries = read_roster(&args.roster)?;
    let date = match args.date {
        Some(date) => date,
        None => config.today().map_err(|err| err.to_string())?,
    };

    let directory = StudentDirectory::load(
        config.directory.grade1.as_deref(),
        config.directory.grade2.as_deref(),
    )
    .map_err(|err| err.to_string())?;

    let conn = open_db(&config.storage.db_path).map_err(|err| err.to_string())?;
    let sheet = |name: &str| SqliteSheet::try_new(&conn, name).map_err(|err| err.to_string());
    let notifier = NotificationComposer::new(
        sheet(&config.sheets.notifications)?,
        config.notification.morning,
        config.notification.afternoon,
        config.reference_link.as_str(),
    );
    let service = RunService::new(
        sheet(&config.sheets.ledger)?,
        sheet(&config.sheets.cancellations)?,
        notifier,
        directory,
    )
    .with_allowed_dates(config.allowed_dates());

    let request = RunRequest {
        date,
        slot: args.time_slot,
        dry_run: args.dry_run,
    };
    match service.run(&entries, request) {
        Ok(report) => {
            let rendered = serde_json::to_string_pretty(&report).map_err(|err| err.to_string())?;
            println!("{rendered}");
            Ok(())
        }
        Err(err) => {
            let partial = serde_json::to_string(err.partial()).map_err(|err| err.to_string())?;
            Err(format!("{err}; committed before failure: {partial}"))
        }
    }
}

fn read_roster(path: &Path) -> Result<Vec<RosterEntry>, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| format!("failed to read roster `{}`: {err}", path.display()))?;
    serde_json::from_str(&raw)
        .map_err(|err| format!("invalid roster `{}`: {err}", path.display()))
}
