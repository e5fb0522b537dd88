//! Closing service - finalize, reopen and reset accounting periods
//!
//! A closed period is read-only: imports drop its rows as locked, and edits,
//! manual entries, resets and restores are refused until an admin reopens it.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::Error;
use crate::domain::{Actor, AuditAction, AuditEntry, ClosingSummary, Period, PeriodClosing};

use super::report::summarize;

/// Closing record plus live totals
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodStatus {
    pub closing: PeriodClosing,
    /// Totals computed from the ledger right now
    pub live: ClosingSummary,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetOutcome {
    pub transactions_deleted: usize,
    pub snapshots_deleted: usize,
}

/// Fail with `Error::PeriodClosed` when the period is closed
pub(crate) fn ensure_period_open(repository: &DuckDbRepository, period: Period) -> Result<()> {
    if repository.is_period_closed(period)? {
        return Err(Error::period_closed(period.key()).into());
    }
    Ok(())
}

pub struct ClosingService {
    repository: Arc<DuckDbRepository>,
    non_impacting: Vec<String>,
}

impl ClosingService {
    pub fn new(repository: Arc<DuckDbRepository>, non_impacting: Vec<String>) -> Self {
        Self {
            repository,
            non_impacting,
        }
    }

    pub fn status(&self, period: Period) -> Result<PeriodStatus> {
        let closing = self
            .repository
            .get_period_closing(period)?
            .unwrap_or_else(|| PeriodClosing::open(period));
        let transactions = self.repository.get_transactions_by_period(period)?;

        Ok(PeriodStatus {
            closing,
            live: summarize(&transactions, &self.non_impacting),
        })
    }

    pub fn list(&self) -> Result<Vec<PeriodClosing>> {
        self.repository.list_period_closings()
    }

    /// Close the period, freezing its totals and marking every row audited
    ///
    /// `pending_audit_count` records how many rows were still pending at the
    /// moment of closing. Totals, the audit marks, the closing record and the
    /// audit entry are written in one DB transaction.
    pub fn finalize(&self, period: Period, actor: &Actor) -> Result<PeriodClosing> {
        self.repository
            .finalize_period(period, |transactions| {
                let closing = PeriodClosing {
                    period,
                    is_closed: true,
                    closed_at: Some(Utc::now()),
                    closed_by: Some(actor.label().to_string()),
                    summary: summarize(transactions, &self.non_impacting),
                };
                let entry = AuditEntry::new(
                    actor,
                    AuditAction::FinalizePeriod,
                    format!(
                        "{}: {} transactions, result {:.2}, {} were pending audit",
                        period,
                        closing.summary.transaction_count,
                        closing.summary.result,
                        closing.summary.pending_audit_count
                    ),
                );
                (closing, entry)
            })
            .with_context(|| format!("Failed to finalize {}", period))
    }

    /// Reopen a closed period (admin only)
    pub fn reopen(&self, period: Period, reason: Option<&str>, actor: &Actor) -> Result<()> {
        if !actor.is_admin() {
            return Err(Error::forbidden("only an admin can reopen a closed period").into());
        }
        if !self.repository.is_period_closed(period)? {
            return Err(Error::validation(format!("period {} is not closed", period)).into());
        }

        self.repository.delete_period_closing(period)?;
        self.repository.append_audit_entry(
            &AuditEntry::new(actor, AuditAction::ReopenPeriod, format!("{} reopened", period)).with_reason(reason),
        )?;
        Ok(())
    }

    /// Delete every transaction and snapshot of an open period
    pub fn reset(&self, period: Period, actor: &Actor) -> Result<ResetOutcome> {
        let (transactions_deleted, snapshots_deleted) = self
            .repository
            .reset_period(period, |transactions, snapshots| {
                AuditEntry::new(
                    actor,
                    AuditAction::ResetPeriod,
                    format!(
                        "{}: {} transactions and {} snapshots deleted",
                        period, transactions, snapshots
                    ),
                )
            })
            .with_context(|| format!("Failed to reset {}", period))?;

        Ok(ResetOutcome {
            transactions_deleted,
            snapshots_deleted,
        })
    }
}
