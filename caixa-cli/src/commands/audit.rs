//! Audit command - browse the audit trail

use anyhow::Result;
use comfy_table::Cell;

use super::{get_context, print_json};
use crate::output::{create_table, truncate};

pub fn run(transaction: Option<String>, limit: usize, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let entries = match &transaction {
        Some(key) => ctx.audit_service.for_transaction(key, limit)?,
        None => ctx.audit_service.recent(limit)?,
    };

    if json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("No audit entries found.");
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["Time", "User", "Action", "Details", "Change", "Reason"]);
    for entry in &entries {
        let change = match (&entry.old_value, &entry.new_value) {
            (None, None) => String::new(),
            (old, new) => format!(
                "{} → {}",
                old.as_deref().unwrap_or("∅"),
                new.as_deref().unwrap_or("∅")
            ),
        };
        table.add_row(vec![
            Cell::new(entry.timestamp.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(entry.user_id.as_deref().unwrap_or(&entry.user_name)),
            Cell::new(entry.action),
            Cell::new(truncate(&entry.details, 50)),
            Cell::new(truncate(&change, 40)),
            Cell::new(entry.reason.as_deref().unwrap_or("")),
        ]);
    }
    println!("{}", table);

    Ok(())
}
