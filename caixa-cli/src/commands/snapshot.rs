//! Snapshot commands - point-in-time copies of a period

use anyhow::{anyhow, Result};
use clap::Subcommand;
use comfy_table::Cell;
use serde_json::json;

use caixa_core::domain::Period;
use caixa_core::services::LogEvent;

use super::{confirm, current_actor, get_context, get_logger, log_event, print_json};
use crate::output::{amount_cell, create_table, info, success, truncate};

#[derive(Subcommand)]
pub enum SnapshotCommands {
    /// Copy the current transactions of a period
    Create {
        period: Period,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// List snapshots, optionally of one period
    List {
        period: Option<Period>,
        #[arg(long)]
        json: bool,
    },
    /// Show a snapshot and its transactions
    Show {
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Make the period match a snapshot again
    Restore {
        id: String,
        /// Why the restore is needed (required)
        #[arg(long)]
        reason: Option<String>,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        #[arg(long)]
        json: bool,
    },
    /// Delete a snapshot
    Delete {
        id: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        #[arg(long)]
        json: bool,
    },
    /// Show the restore history
    Logs {
        period: Option<Period>,
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: SnapshotCommands) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    match command {
        SnapshotCommands::Create { period, label, json } => {
            let actor = current_actor(&ctx)?;
            let snapshot = ctx.snapshot_service.create(period, label.as_deref(), &actor)?;
            log_event(&logger, LogEvent::new("snapshot_created").with_command("snapshot create"));

            if json {
                return print_json(&snapshot);
            }
            success(&format!(
                "Snapshot '{}' of {} saved with {} transactions",
                snapshot.label, snapshot.period, snapshot.tx_count
            ));
            println!("  ID: {}", snapshot.id);
        }
        SnapshotCommands::List { period, json } => {
            let snapshots = ctx.snapshot_service.list(period)?;
            if json {
                return print_json(&snapshots);
            }
            if snapshots.is_empty() {
                println!("No snapshots found.");
                return Ok(());
            }

            let mut table = create_table();
            table.set_header(vec!["ID", "Period", "Label", "Transactions", "Created", "By"]);
            for s in &snapshots {
                table.add_row(vec![
                    Cell::new(s.id),
                    Cell::new(s.period),
                    Cell::new(&s.label),
                    Cell::new(s.tx_count),
                    Cell::new(s.created_at.format("%Y-%m-%d %H:%M")),
                    Cell::new(s.created_by.as_deref().unwrap_or("-")),
                ]);
            }
            println!("{}", table);
        }
        SnapshotCommands::Show { id, json } => {
            let details = ctx.snapshot_service.details(&id)?;
            if json {
                return print_json(&details);
            }

            let s = &details.snapshot;
            info(&format!("'{}' of {} ({} transactions)", s.label, s.period, s.tx_count));
            println!();

            let mut table = create_table();
            table.set_header(vec!["Date", "Description", "Amount", "Category", "Source"]);
            for item in &details.items {
                let tx = &item.transaction;
                table.add_row(vec![
                    Cell::new(tx.date),
                    Cell::new(truncate(&tx.description, 40)),
                    amount_cell(tx.amount, tx.direction),
                    Cell::new(&tx.category),
                    Cell::new(&tx.source),
                ]);
            }
            println!("{}", table);
        }
        SnapshotCommands::Restore { id, reason, force, json } => {
            let reason = reason.ok_or_else(|| anyhow!("--reason is required to restore a snapshot"))?;
            let actor = current_actor(&ctx)?;
            let snapshot = ctx.snapshot_service.get(&id)?;

            if !confirm(
                &format!(
                    "Replace the transactions of {} with snapshot '{}'?",
                    snapshot.period, snapshot.label
                ),
                force,
                json,
            )? {
                println!("Cancelled.");
                return Ok(());
            }

            let log = ctx.snapshot_service.restore(&id, &reason, &actor)?;
            log_event(&logger, LogEvent::new("snapshot_restored").with_command("snapshot restore"));

            if json {
                return print_json(&log);
            }
            success(&format!("Period {} restored from '{}'", log.period, snapshot.label));
            println!(
                "  {} deleted, {} inserted, {} updated",
                log.counts.deleted_count, log.counts.inserted_count, log.counts.updated_count
            );
        }
        SnapshotCommands::Delete { id, force, json } => {
            let actor = current_actor(&ctx)?;
            let snapshot = ctx.snapshot_service.get(&id)?;
            if !confirm(&format!("Delete snapshot '{}'?", snapshot.label), force, json)? {
                println!("Cancelled.");
                return Ok(());
            }

            ctx.snapshot_service.delete(&id, &actor)?;
            if json {
                return print_json(&json!({ "deleted": snapshot.id }));
            }
            success(&format!("Snapshot '{}' deleted", snapshot.label));
        }
        SnapshotCommands::Logs { period, json } => {
            let logs = ctx.snapshot_service.restore_logs(period)?;
            if json {
                return print_json(&logs);
            }
            if logs.is_empty() {
                println!("No restores recorded.");
                return Ok(());
            }

            let mut table = create_table();
            table.set_header(vec!["Restored", "Period", "By", "Deleted", "Inserted", "Updated", "Reason"]);
            for log in &logs {
                table.add_row(vec![
                    Cell::new(log.restored_at.format("%Y-%m-%d %H:%M")),
                    Cell::new(log.period),
                    Cell::new(log.restored_by.as_deref().unwrap_or("-")),
                    Cell::new(log.counts.deleted_count),
                    Cell::new(log.counts.inserted_count),
                    Cell::new(log.counts.updated_count),
                    Cell::new(truncate(&log.reason, 40)),
                ]);
            }
            println!("{}", table);
        }
    }

    Ok(())
}
