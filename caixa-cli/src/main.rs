//! Caixa CLI - bank statement ledger for an accounting office

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::Colorize;
use rust_decimal::Decimal;

mod commands;
mod output;

use caixa_core::domain::Direction;
use caixa_core::services::LogEvent;
use commands::{admin, audit, close, doctor, import, jobs, logs, manual, report, snapshot, sources, status, tx};

/// Caixa - bank statements in, audited monthly results out
#[derive(Parser)]
#[command(name = "caixa", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show ledger status and summary
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Import a bank statement CSV (reads stdin when no file is given)
    Import {
        /// Path to CSV file
        file: Option<PathBuf>,
        /// Source of the statement (defaults to defaultSource from settings)
        #[arg(long, short)]
        source: Option<String>,
        /// Parse and show without importing
        #[arg(long)]
        preview: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record a transaction by hand
    Manual {
        /// Date as YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        description: String,
        /// Positive amount with a dot decimal separator (1234.56)
        #[arg(long)]
        amount: Decimal,
        /// INCOMING or OUTGOING (ENTRADA / SAIDA also accepted)
        #[arg(long = "type")]
        direction: Direction,
        /// Category (suggested by the categorizer when omitted)
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        observations: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List and edit transactions
    Tx {
        #[command(subcommand)]
        command: tx::TxCommands,
    },

    /// Close, reopen and reset periods
    Close {
        #[command(subcommand)]
        command: close::CloseCommands,
    },

    /// Manage period snapshots
    Snapshot {
        #[command(subcommand)]
        command: snapshot::SnapshotCommands,
    },

    /// Period results, yearly evolution and CSV export
    Report {
        #[command(subcommand)]
        command: report::ReportCommands,
    },

    /// Import history
    Jobs {
        #[command(subcommand)]
        command: jobs::JobsCommands,
    },

    /// Manage statement sources
    Sources {
        #[command(subcommand)]
        command: sources::SourcesCommands,
    },

    /// Show the audit trail
    Audit {
        /// Only entries for this transaction key
        #[arg(long)]
        transaction: Option<String>,
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run ledger consistency checks
    Doctor {
        /// Show verbose output
        #[arg(long, short)]
        verbose: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },

    /// Manage users
    Admin {
        #[command(subcommand)]
        command: admin::AdminCommands,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Status { .. } => "status",
            Commands::Import { .. } => "import",
            Commands::Manual { .. } => "manual",
            Commands::Tx { .. } => "tx",
            Commands::Close { .. } => "close",
            Commands::Snapshot { .. } => "snapshot",
            Commands::Report { .. } => "report",
            Commands::Jobs { .. } => "jobs",
            Commands::Sources { .. } => "sources",
            Commands::Audit { .. } => "audit",
            Commands::Doctor { .. } => "doctor",
            Commands::Logs { .. } => "logs",
            Commands::Admin { .. } => "admin",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = cli.command.name();

    // Commands open their own logger, so this one is dropped before running
    commands::log_event(
        &commands::get_logger(),
        LogEvent::new("command_executed").with_command(command),
    );

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            commands::log_event(
                &commands::get_logger(),
                LogEvent::new("command_failed")
                    .with_command(command)
                    .with_error(e.to_string())
                    .with_error_details(format!("{:#}", e)),
            );
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Status { json } => status::run(json),
        Commands::Import { file, source, preview, json } => import::run(file, source, preview, json),
        Commands::Manual {
            date,
            description,
            amount,
            direction,
            category,
            observations,
            json,
        } => manual::run(date, description, amount, direction, category, observations, json),
        Commands::Tx { command } => tx::run(command),
        Commands::Close { command } => close::run(command),
        Commands::Snapshot { command } => snapshot::run(command),
        Commands::Report { command } => report::run(command),
        Commands::Jobs { command } => jobs::run(command),
        Commands::Sources { command } => sources::run(command),
        Commands::Audit { transaction, limit, json } => audit::run(transaction, limit, json),
        Commands::Doctor { verbose, json } => doctor::run(verbose, json),
        Commands::Logs { command } => logs::run(command),
        Commands::Admin { command } => admin::run(command),
    }
}
