//! Ledger service - listing and editing stored transactions
//!
//! Edits never touch `transaction_key` or the captured `original_*` values,
//! and each one leaves an audit entry with the old and new value.

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::Error;
use crate::domain::{Actor, AuditAction, AuditEntry, AuditStatus, Direction, Period, Transaction, TransactionStatus};

use super::closing::ensure_period_open;

/// Optional criteria for `LedgerService::list`; unset fields match everything
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilter {
    pub source: Option<String>,
    pub direction: Option<Direction>,
    pub category: Option<String>,
    pub status: Option<TransactionStatus>,
    pub audit_status: Option<AuditStatus>,
    /// Case-insensitive substring of the description
    pub search: Option<String>,
}

impl TransactionFilter {
    pub fn matches(&self, tx: &Transaction) -> bool {
        if let Some(source) = &self.source {
            if !tx.source.eq_ignore_ascii_case(source) {
                return false;
            }
        }
        if self.direction.is_some_and(|d| d != tx.direction) {
            return false;
        }
        if let Some(category) = &self.category {
            if !tx.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if self.status.is_some_and(|s| s != tx.status) {
            return false;
        }
        if self.audit_status.is_some_and(|s| s != tx.audit_status) {
            return false;
        }
        if let Some(search) = &self.search {
            if !tx.description.to_lowercase().contains(&search.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

pub struct LedgerService {
    repository: Arc<DuckDbRepository>,
}

impl LedgerService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    pub fn list(&self, period: Period, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        let transactions = self.repository.get_transactions_by_period(period)?;
        Ok(transactions.into_iter().filter(|tx| filter.matches(tx)).collect())
    }

    pub fn get(&self, key: &str) -> Result<Transaction> {
        self.repository
            .get_transaction_by_key(key)?
            .ok_or_else(|| Error::not_found(format!("transaction {}", key)).into())
    }

    /// Load a row that may be edited (exists, period open)
    fn editable(&self, key: &str) -> Result<Transaction> {
        let tx = self.get(key)?;
        ensure_period_open(&self.repository, tx.period())?;
        Ok(tx)
    }

    pub fn update_category(
        &self,
        key: &str,
        category: &str,
        reason: Option<&str>,
        actor: &Actor,
    ) -> Result<Transaction> {
        let category = category.trim();
        if category.is_empty() {
            return Err(Error::validation("category cannot be empty").into());
        }

        let tx = self.editable(key)?;
        if tx.category == category {
            return Ok(tx);
        }

        self.repository
            .update_transaction_category(key, category, actor.label())?;
        self.repository.append_audit_entry(
            &AuditEntry::new(actor, AuditAction::UpdateCategory, format!("category of {}", tx.description))
                .with_transaction(key)
                .with_change(Some(tx.category.clone()), Some(category.to_string()))
                .with_reason(reason),
        )?;

        self.get(key)
    }

    /// Set or clear (None / blank) the free-text observations
    pub fn update_observations(
        &self,
        key: &str,
        observations: Option<&str>,
        actor: &Actor,
    ) -> Result<Transaction> {
        let observations = observations.map(str::trim).filter(|o| !o.is_empty());
        let tx = self.editable(key)?;
        if tx.observations.as_deref() == observations {
            return Ok(tx);
        }

        self.repository
            .update_transaction_observations(key, observations, actor.label())?;
        self.repository.append_audit_entry(
            &AuditEntry::new(actor, AuditAction::UpdateObservations, format!("observations of {}", tx.description))
                .with_transaction(key)
                .with_change(tx.observations.clone(), observations.map(|o| o.to_string())),
        )?;

        self.get(key)
    }

    pub fn mark_audited(&self, key: &str, actor: &Actor) -> Result<Transaction> {
        let tx = self.editable(key)?;
        if tx.audit_status == AuditStatus::Audited {
            return Ok(tx);
        }

        self.repository.mark_transaction_audited(key, actor.label())?;
        self.repository.append_audit_entry(
            &AuditEntry::new(actor, AuditAction::MarkAudited, format!("audited {}", tx.description))
                .with_transaction(key)
                .with_change(
                    Some(AuditStatus::Pending.as_str().to_string()),
                    Some(AuditStatus::Audited.as_str().to_string()),
                ),
        )?;

        self.get(key)
    }
}
