//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use rust_decimal::Decimal;

use caixa_core::domain::{AuditStatus, Direction};
use caixa_core::ingest::normalize::round_cents;

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Brazilian currency notation: `R$ 1.234,56`
pub fn format_brl(amount: Decimal) -> String {
    let rounded = round_cents(amount);
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{}R$ {},{}", sign, grouped, frac_part)
}

/// Amount cell colored by direction
pub fn amount_cell(amount: Decimal, direction: Direction) -> Cell {
    match direction {
        Direction::Incoming => Cell::new(format_brl(amount)).fg(Color::Green),
        Direction::Outgoing => Cell::new(format!("-{}", format_brl(amount))).fg(Color::Red),
    }
}

/// Signed result cell
pub fn result_cell(amount: Decimal) -> Cell {
    if amount.is_sign_negative() && !amount.is_zero() {
        Cell::new(format_brl(amount)).fg(Color::Red)
    } else {
        Cell::new(format_brl(amount)).fg(Color::Green)
    }
}

pub fn audit_cell(status: AuditStatus) -> Cell {
    match status {
        AuditStatus::Audited => Cell::new("AUDITED").fg(Color::Green),
        AuditStatus::Pending => Cell::new("PENDING").fg(Color::Yellow),
    }
}

/// Shorten long text for table cells
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let head: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", head)
}
