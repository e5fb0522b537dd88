//! Import command - load a bank statement CSV into the ledger

use std::io::Read;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use comfy_table::Cell;

use caixa_core::ingest::IngestionResult;
use caixa_core::services::{ImportReport, LogEvent};

use super::{current_actor, get_context, get_logger, log_event, print_json};
use crate::output::{amount_cell, create_table, info, success, truncate, warning};

const PREVIEW_ROWS: usize = 15;

pub fn run(file: Option<PathBuf>, source: Option<String>, preview: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();
    let source = source.unwrap_or_else(|| ctx.config.default_source.clone());

    let input = read_input(file)?;

    if preview {
        let result = match &input {
            Input::File(path) => ctx.import_service.preview_file(path, &source)?,
            Input::Stdin(content) => ctx.import_service.preview(content, &source)?,
        };
        if json {
            return print_json(&result);
        }
        print_preview(&result);
        return Ok(());
    }

    let actor = current_actor(&ctx)?;
    log_event(&logger, LogEvent::new("import_started").with_command("import").with_source(source.to_uppercase()));

    let outcome = match &input {
        Input::File(path) => ctx.import_service.import_file(path, &source, &actor),
        Input::Stdin(content) => ctx.import_service.import_content(content, "stdin", &source, &actor),
    };
    match outcome {
        Ok(report) => {
            log_event(&logger, LogEvent::new("import_completed").with_command("import").with_source(report.source.clone()));
            if json {
                return print_json(&report);
            }
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("import_failed")
                    .with_command("import")
                    .with_source(source.to_uppercase())
                    .with_error(e.to_string()),
            );
            Err(e)
        }
    }
}

/// Where the statement comes from
enum Input {
    File(PathBuf),
    /// Statement piped on stdin
    Stdin(String),
}

fn read_input(file: Option<PathBuf>) -> Result<Input> {
    match file {
        Some(path) => Ok(Input::File(path)),
        None if atty::isnt(atty::Stream::Stdin) => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read statement from stdin")?;
            Ok(Input::Stdin(content))
        }
        None => Err(anyhow!("File path required (or pipe the statement on stdin)")),
    }
}

fn print_preview(result: &IngestionResult) {
    println!("{}", "PREVIEW MODE - No changes applied".yellow());
    println!();
    info(&format!(
        "Header on line {}, separator {:?}, source {}",
        result.header_line, result.separator, result.source
    ));
    println!();

    let mut table = create_table();
    table.set_header(vec!["Line", "Date", "Type", "Amount", "Category", "Description"]);
    for tx in result.transactions.iter().take(PREVIEW_ROWS) {
        table.add_row(vec![
            Cell::new(tx.line_number),
            Cell::new(tx.date),
            Cell::new(tx.direction.as_str()),
            amount_cell(tx.amount, tx.direction),
            Cell::new(&tx.category),
            Cell::new(truncate(&tx.description, 50)),
        ]);
    }
    println!("{}", table);

    if result.transactions.len() > PREVIEW_ROWS {
        println!("... and {} more", result.transactions.len() - PREVIEW_ROWS);
    }
    println!();
    println!(
        "Lines scanned: {}  Transactions: {}  Skipped: {}",
        result.total_lines_scanned, result.transactions_produced, result.lines_skipped
    );
    for skipped in &result.skipped {
        println!("  line {}: {}", skipped.line_number, skipped.reason.as_str().dimmed());
    }
}

fn print_report(report: &ImportReport) {
    if report.locked > 0 || report.ignored > 0 {
        warning("Import completed with alerts");
    } else {
        success("Import complete");
    }
    println!();
    println!("  Job:       {}", report.job_id);
    println!("  Source:    {}", report.source);
    if let (Some(start), Some(end)) = (report.period_start, report.period_end) {
        println!("  Dates:     {} to {}", start, end);
    }
    println!("  Produced:  {}", report.produced);
    println!("  Inserted:  {}", report.inserted.to_string().green());
    println!("  Ignored:   {} (already in the ledger)", report.ignored);
    if report.locked > 0 {
        println!("  Locked:    {} (closed period)", report.locked.to_string().red());
    }
    println!("  Skipped:   {}", report.skipped);
}
