//! Transaction commands - list and edit ledger rows

use anyhow::Result;
use clap::Subcommand;
use comfy_table::Cell;

use caixa_core::domain::{AuditStatus, Direction, Period, Transaction};
use caixa_core::services::TransactionFilter;

use super::{current_actor, get_context, print_json};
use crate::output::{amount_cell, audit_cell, create_table, success, truncate};

#[derive(Subcommand)]
pub enum TxCommands {
    /// List the transactions of a period
    List {
        /// Period as YYYY-MM
        period: Period,
        /// Only this source
        #[arg(long)]
        source: Option<String>,
        /// INCOMING or OUTGOING
        #[arg(long = "type")]
        direction: Option<Direction>,
        #[arg(long)]
        category: Option<String>,
        /// PENDING or AUDITED
        #[arg(long)]
        audit_status: Option<AuditStatus>,
        /// Case-insensitive text in the description
        #[arg(long)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change the category of a transaction
    Categorize {
        /// Transaction key
        key: String,
        category: String,
        /// Why the category changed (kept in the audit trail)
        #[arg(long)]
        reason: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Set or clear the observations of a transaction
    Observe {
        key: String,
        /// New text; omit to clear
        text: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Mark a transaction as audited
    Audit {
        key: String,
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: TxCommands) -> Result<()> {
    let ctx = get_context()?;

    match command {
        TxCommands::List {
            period,
            source,
            direction,
            category,
            audit_status,
            search,
            json,
        } => {
            let filter = TransactionFilter {
                source,
                direction,
                category,
                audit_status,
                search,
                ..Default::default()
            };
            let transactions = ctx.ledger_service.list(period, &filter)?;

            if json {
                return print_json(&transactions);
            }
            if transactions.is_empty() {
                println!("No transactions in {}.", period);
                return Ok(());
            }

            let mut table = create_table();
            table.set_header(vec!["Date", "Description", "Amount", "Category", "Source", "Audit", "Key"]);
            for tx in &transactions {
                table.add_row(vec![
                    Cell::new(tx.date),
                    Cell::new(truncate(&tx.description, 40)),
                    amount_cell(tx.amount, tx.direction),
                    Cell::new(&tx.category),
                    Cell::new(&tx.source),
                    audit_cell(tx.audit_status),
                    Cell::new(truncate(&tx.transaction_key, 16)),
                ]);
            }
            println!("{}", table);
            println!("{} transaction(s)", transactions.len());
        }
        TxCommands::Categorize {
            key,
            category,
            reason,
            json,
        } => {
            let actor = current_actor(&ctx)?;
            let tx = ctx
                .ledger_service
                .update_category(&key, &category, reason.as_deref(), &actor)?;
            print_updated(&tx, json, &format!("Category set to {}", tx.category))?;
        }
        TxCommands::Observe { key, text, json } => {
            let actor = current_actor(&ctx)?;
            let tx = ctx
                .ledger_service
                .update_observations(&key, text.as_deref(), &actor)?;
            let message = match &tx.observations {
                Some(o) => format!("Observations set to \"{}\"", o),
                None => "Observations cleared".to_string(),
            };
            print_updated(&tx, json, &message)?;
        }
        TxCommands::Audit { key, json } => {
            let actor = current_actor(&ctx)?;
            let tx = ctx.ledger_service.mark_audited(&key, &actor)?;
            print_updated(&tx, json, "Marked as audited")?;
        }
    }

    Ok(())
}

fn print_updated(tx: &Transaction, json: bool, message: &str) -> Result<()> {
    if json {
        return print_json(tx);
    }
    success(message);
    println!("  {} {} {}", tx.date, tx.description, tx.transaction_key);
    Ok(())
}
