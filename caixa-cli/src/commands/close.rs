//! Close commands - period closing lifecycle

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use comfy_table::Cell;
use serde_json::json;

use caixa_core::domain::{ClosingSummary, Period};
use caixa_core::services::LogEvent;

use super::{confirm, current_actor, get_context, get_logger, log_event, print_json};
use crate::output::{create_table, format_brl, result_cell, success, warning};

#[derive(Subcommand)]
pub enum CloseCommands {
    /// Show whether a period is closed and its totals (all periods if omitted)
    Status {
        period: Option<Period>,
        #[arg(long)]
        json: bool,
    },
    /// Close a period, freezing its totals
    Finalize {
        period: Period,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        #[arg(long)]
        json: bool,
    },
    /// Reopen a closed period (admin only)
    Reopen {
        period: Period,
        #[arg(long)]
        reason: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Delete every transaction and snapshot of an open period
    Reset {
        period: Period,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: CloseCommands) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    match command {
        CloseCommands::Status { period: Some(period), json } => {
            let status = ctx.closing_service.status(period)?;
            if json {
                return print_json(&status);
            }

            let state = if status.closing.is_closed {
                "CLOSED".red().bold()
            } else {
                "OPEN".green().bold()
            };
            println!("Period {}: {}", period, state);
            if let (Some(at), Some(by)) = (&status.closing.closed_at, &status.closing.closed_by) {
                println!("Closed on {} by {}", at.format("%Y-%m-%d %H:%M"), by);
            }
            println!();

            let mut table = create_table();
            if status.closing.is_closed {
                table.set_header(vec!["", "Frozen", "Live"]);
                add_summary_rows(&mut table, &status.closing.summary, Some(&status.live));
            } else {
                table.set_header(vec!["", "Live"]);
                add_summary_rows(&mut table, &status.live, None);
            }
            println!("{}", table);
        }
        CloseCommands::Status { period: None, json } => {
            let closings = ctx.closing_service.list()?;
            if json {
                return print_json(&closings);
            }
            if closings.is_empty() {
                println!("No closed periods.");
                return Ok(());
            }

            let mut table = create_table();
            table.set_header(vec!["Period", "Closed at", "By", "In", "Out", "Result"]);
            for closing in &closings {
                table.add_row(vec![
                    Cell::new(closing.period),
                    Cell::new(
                        closing
                            .closed_at
                            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                            .unwrap_or_default(),
                    ),
                    Cell::new(closing.closed_by.as_deref().unwrap_or("-")),
                    Cell::new(format_brl(closing.summary.total_in)),
                    Cell::new(format_brl(closing.summary.total_out)),
                    result_cell(closing.summary.result),
                ]);
            }
            println!("{}", table);
        }
        CloseCommands::Finalize { period, force, json } => {
            let actor = current_actor(&ctx)?;
            if !confirm(
                &format!("Close {}? Its transactions will be locked and marked audited.", period),
                force,
                json,
            )? {
                println!("Cancelled.");
                return Ok(());
            }

            let closing = ctx.closing_service.finalize(period, &actor)?;
            log_event(&logger, LogEvent::new("period_finalized").with_command("close finalize"));

            if json {
                return print_json(&closing);
            }
            success(&format!("Period {} closed", period));
            println!(
                "  Result {} from {} transactions ({} were pending audit)",
                format_brl(closing.summary.result),
                closing.summary.transaction_count,
                closing.summary.pending_audit_count
            );
        }
        CloseCommands::Reopen { period, reason, json } => {
            let actor = current_actor(&ctx)?;
            ctx.closing_service.reopen(period, reason.as_deref(), &actor)?;
            log_event(&logger, LogEvent::new("period_reopened").with_command("close reopen"));

            if json {
                return print_json(&json!({ "period": period.key(), "reopened": true }));
            }
            warning(&format!("Period {} reopened", period));
        }
        CloseCommands::Reset { period, force, json } => {
            let actor = current_actor(&ctx)?;
            if !confirm(
                &format!("Delete ALL transactions and snapshots of {}?", period),
                force,
                json,
            )? {
                println!("Cancelled.");
                return Ok(());
            }

            let outcome = ctx.closing_service.reset(period, &actor)?;
            log_event(&logger, LogEvent::new("period_reset").with_command("close reset"));

            if json {
                return print_json(&outcome);
            }
            success(&format!(
                "Deleted {} transactions and {} snapshots from {}",
                outcome.transactions_deleted, outcome.snapshots_deleted, period
            ));
        }
    }

    Ok(())
}

fn add_summary_rows(table: &mut comfy_table::Table, primary: &ClosingSummary, live: Option<&ClosingSummary>) {
    let rows: [(&str, fn(&ClosingSummary) -> String); 5] = [
        ("Total in", |s| format_brl(s.total_in)),
        ("Total out", |s| format_brl(s.total_out)),
        ("Result", |s| format_brl(s.result)),
        ("Transactions", |s| s.transaction_count.to_string()),
        ("Pending audit", |s| s.pending_audit_count.to_string()),
    ];

    for (label, value) in rows {
        let mut row = vec![label.to_string(), value(primary)];
        if let Some(live) = live {
            row.push(value(live));
        }
        table.add_row(row);
    }
}
