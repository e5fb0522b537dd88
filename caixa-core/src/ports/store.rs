//! Transaction store port

use anyhow::Result;
use serde::Serialize;

use crate::domain::Transaction;

/// What happened to a batch handed to the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOutcome {
    pub inserted: usize,
    /// Rows whose `transaction_key` was already stored
    pub ignored: usize,
    /// Rows dropped because their period is closed
    pub locked: usize,
}

/// Durable sink for ledger rows, keyed by `transaction_key`
///
/// Saving is upsert-ignore: a row whose key already exists is left untouched
/// and counted as ignored, so feeding the same statement twice is harmless.
/// Rows dated in a closed period are never written. The closed check and the
/// writes happen atomically, so a concurrent finalize cannot let rows slip in.
pub trait TransactionStore: Send + Sync {
    fn save(&self, transactions: &[Transaction]) -> Result<SaveOutcome>;
}
