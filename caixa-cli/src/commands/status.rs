//! Status command - ledger overview

use anyhow::Result;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use super::{get_context, print_json};
use crate::output::format_size;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let status = ctx.status_service.get_status()?;

    if json {
        return print_json(&status);
    }

    println!("{}", "Caixa Status".bold());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec!["Transactions", &status.total_transactions.to_string()]);
    table.add_row(vec!["Sources", &status.sources.join(", ")]);
    table.add_row(vec!["Periods", &status.periods.len().to_string()]);
    table.add_row(vec!["Database size", &format_size(status.db_size_bytes)]);

    println!("{}", table);
    println!();

    if let (Some(earliest), Some(latest)) = (&status.date_range.earliest, &status.date_range.latest) {
        println!("Date range: {} to {}", earliest, latest);
        println!();
    }

    if !status.periods.is_empty() {
        println!("{}", "Periods".bold());
        for period in &status.periods {
            let state = if period.is_closed {
                "closed".red().to_string()
            } else {
                "open".green().to_string()
            };
            println!("  • {} ({})", period.period, state);
        }
        println!();
    }

    if let Some(job) = &status.last_import {
        println!(
            "Last import: {} from {} on {} ({})",
            job.file_name,
            job.source,
            job.created_at.format("%Y-%m-%d %H:%M"),
            job.status.as_str()
        );
    }

    Ok(())
}
