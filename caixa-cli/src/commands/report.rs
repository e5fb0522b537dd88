//! Report commands - period results and yearly evolution

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use comfy_table::{Cell, Color};

use caixa_core::domain::Period;
use caixa_core::services::CategoryTotal;

use super::{get_context, print_json};
use crate::output::{create_table, format_brl, result_cell, success};

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Totals by category and the result of a period
    Summary {
        period: Period,
        #[arg(long)]
        json: bool,
    },
    /// Month-by-month totals of a year
    Evolution {
        year: i32,
        #[arg(long)]
        json: bool,
    },
    /// Export a period's transactions as CSV
    Export {
        period: Period,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: ReportCommands) -> Result<()> {
    let ctx = get_context()?;

    match command {
        ReportCommands::Summary { period, json } => {
            let summary = ctx.report_service.period_summary(period)?;
            if json {
                return print_json(&summary);
            }

            let state = if summary.is_closed { " (closed)" } else { "" };
            println!("{}", format!("Result for {}{}", period, state).bold());
            println!();

            print_categories("Incoming", &summary.incoming);
            print_categories("Outgoing", &summary.outgoing);

            let mut table = create_table();
            table.add_row(vec![Cell::new("Total in"), Cell::new(format_brl(summary.total_in)).fg(Color::Green)]);
            table.add_row(vec![Cell::new("Total out"), Cell::new(format_brl(summary.total_out)).fg(Color::Red)]);
            if !summary.total_out_non_impacting.is_zero() {
                table.add_row(vec![
                    Cell::new("  not affecting result"),
                    Cell::new(format_brl(summary.total_out_non_impacting)),
                ]);
            }
            table.add_row(vec![Cell::new("Result"), result_cell(summary.result)]);
            table.add_row(vec![
                Cell::new("Pending audit"),
                Cell::new(format!("{} of {}", summary.pending_audit_count, summary.transaction_count)),
            ]);
            println!("{}", table);
        }
        ReportCommands::Evolution { year, json } => {
            let evolution = ctx.report_service.evolution(year)?;
            if json {
                return print_json(&evolution);
            }

            let mut table = create_table();
            table.set_header(vec!["Month", "In", "Out", "Result", "Transactions"]);
            for point in &evolution.months {
                table.add_row(vec![
                    Cell::new(format!("{}-{:02}", year, point.month)),
                    Cell::new(format_brl(point.total_in)),
                    Cell::new(format_brl(point.total_out)),
                    result_cell(point.result),
                    Cell::new(point.transaction_count),
                ]);
            }
            table.add_row(vec![
                Cell::new("Total"),
                Cell::new(format_brl(evolution.total_in)),
                Cell::new(format_brl(evolution.total_out)),
                result_cell(evolution.result),
                Cell::new(""),
            ]);
            println!("{}", table);
        }
        ReportCommands::Export { period, output, json } => match output {
            Some(path) => {
                let file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
                let rows = ctx.report_service.export_csv(period, BufWriter::new(file))?;
                if json {
                    return print_json(&serde_json::json!({ "rows": rows, "path": path }));
                }
                success(&format!("Exported {} transactions to {}", rows, path.display()));
            }
            None => {
                ctx.report_service.export_csv(period, std::io::stdout().lock())?;
            }
        },
    }

    Ok(())
}

fn print_categories(title: &str, totals: &[CategoryTotal]) {
    if totals.is_empty() {
        return;
    }

    let mut table = create_table();
    table.set_header(vec![title, "Amount", "Count"]);
    for total in totals {
        let name = if total.impacts_result {
            Cell::new(&total.category)
        } else {
            Cell::new(format!("{} *", total.category)).fg(Color::DarkGrey)
        };
        table.add_row(vec![name, Cell::new(format_brl(total.amount)), Cell::new(total.count)]);
    }
    println!("{}", table);
    if totals.iter().any(|t| !t.impacts_result) {
        println!("{}", "* does not affect the result".dimmed());
    }
    println!();
}
