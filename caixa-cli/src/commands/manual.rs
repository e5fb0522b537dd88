//! Manual command - record a transaction typed in by an operator

use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use caixa_core::domain::Direction;
use caixa_core::services::{LogEvent, ManualEntry};

use super::{current_actor, get_context, get_logger, log_event, print_json};
use crate::output::{format_brl, success, warning};

#[allow(clippy::too_many_arguments)]
pub fn run(
    date: NaiveDate,
    description: String,
    amount: Decimal,
    direction: Direction,
    category: Option<String>,
    observations: Option<String>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();
    let actor = current_actor(&ctx)?;

    let entry = ManualEntry {
        date,
        description,
        amount,
        direction,
        category,
        observations,
    };
    let outcome = ctx.manual_service.add(&entry, &actor)?;
    log_event(&logger, LogEvent::new("manual_entry").with_command("manual"));

    if json {
        return print_json(&outcome);
    }

    let tx = &outcome.transaction;
    if outcome.inserted {
        success(&format!(
            "Recorded {} {} on {} ({})",
            tx.direction,
            format_brl(tx.amount),
            tx.date,
            tx.category
        ));
    } else {
        warning("An identical entry already exists; nothing recorded");
    }
    println!("  Key: {}", tx.transaction_key);

    Ok(())
}
