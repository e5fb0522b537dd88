//! Period snapshots and restores

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::period::Period;
use super::transaction::Transaction;

/// Point-in-time copy of one period's transactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSnapshot {
    pub id: Uuid,
    pub label: String,
    pub period: Period,
    pub tx_count: i64,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<String>,
}

/// One transaction as it was when the snapshot was taken
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotItem {
    pub snapshot_id: Uuid,
    pub transaction: Transaction,
}

/// Snapshot header plus its items
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDetails {
    pub snapshot: PeriodSnapshot,
    pub items: Vec<SnapshotItem>,
}

/// What a restore changed in the live ledger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreCounts {
    /// Live rows not present in the snapshot
    pub deleted_count: i64,
    /// Snapshot rows missing from the live ledger
    pub inserted_count: i64,
    /// Snapshot rows overwriting a live row with the same key
    pub updated_count: i64,
}

/// Audit record of a restore
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreLog {
    pub id: Uuid,
    pub snapshot_id: Uuid,
    pub period: Period,
    pub restored_at: DateTime<Utc>,
    pub restored_by: Option<String>,
    pub reason: String,
    pub counts: RestoreCounts,
}
