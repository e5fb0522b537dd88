//! Manual entry service - rows typed in by an operator

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::Error;
use crate::domain::{Actor, AuditAction, AuditEntry, Direction, Period, Transaction, MANUAL_SOURCE};
use crate::ingest::manual_key;
use crate::ingest::normalize::round_cents;
use crate::ports::{Categorizer, TransactionStore};

use super::closing::ensure_period_open;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualEntry {
    pub date: NaiveDate,
    pub description: String,
    /// Positive amount; the direction carries the sign
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub direction: Direction,
    /// When absent, the categorizer suggests one
    pub category: Option<String>,
    pub observations: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualEntryOutcome {
    pub transaction: Transaction,
    /// False when the same entry had already been recorded
    pub inserted: bool,
}

pub struct ManualEntryService {
    repository: Arc<DuckDbRepository>,
    categorizer: Arc<dyn Categorizer>,
}

impl ManualEntryService {
    pub fn new(repository: Arc<DuckDbRepository>, categorizer: Arc<dyn Categorizer>) -> Self {
        Self {
            repository,
            categorizer,
        }
    }

    /// Record an entry; submitting the same entry again is a no-op
    pub fn add(&self, entry: &ManualEntry, actor: &Actor) -> Result<ManualEntryOutcome> {
        let description = entry.description.trim();
        if description.is_empty() {
            return Err(Error::validation("description cannot be empty").into());
        }
        let amount = round_cents(entry.amount);
        if amount <= Decimal::ZERO {
            return Err(Error::validation("amount must be greater than zero").into());
        }

        let period = Period::from_date(entry.date);
        ensure_period_open(&self.repository, period)?;

        let key = manual_key(entry.date, amount, entry.direction, description);
        if let Some(existing) = self.repository.get_transaction_by_key(&key)? {
            return Ok(ManualEntryOutcome {
                transaction: existing,
                inserted: false,
            });
        }

        let (category, suggested_by) = match entry.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(c) => (c.to_string(), None),
            None => {
                let suggestion = self.categorizer.suggest(description, entry.direction);
                let note = format!("category suggested by {} ({}%)", self.categorizer.name(), suggestion.confidence);
                (suggestion.category, Some(note))
            }
        };

        let mut tx = Transaction::manual(
            key,
            entry.date,
            description,
            amount,
            entry.direction,
            &category,
            MANUAL_SOURCE,
            Some(actor.label()),
        );
        tx.observations = entry
            .observations
            .as_deref()
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(|o| o.to_string());

        let outcome = self
            .repository
            .save(std::slice::from_ref(&tx))
            .context("Failed to save manual entry")?;
        if outcome.locked > 0 {
            // Closed between the check above and the save
            return Err(Error::period_closed(period.key()).into());
        }

        if outcome.inserted > 0 {
            let mut details = format!("{} {:.2} {}", tx.direction, tx.amount, tx.description);
            if let Some(note) = &suggested_by {
                details.push_str(&format!("; {}", note));
            }
            self.repository.append_audit_entry(
                &AuditEntry::new(actor, AuditAction::ManualEntry, details)
                    .with_transaction(&tx.transaction_key)
                    .with_change(None, Some(tx.category.clone())),
            )?;
        }

        Ok(ManualEntryOutcome {
            transaction: tx,
            inserted: outcome.inserted > 0,
        })
    }
}
