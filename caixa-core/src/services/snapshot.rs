//! Snapshot service - point-in-time copies of a period and their restore

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use uuid::Uuid;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::Error;
use crate::domain::{
    Actor, AuditAction, AuditEntry, Period, PeriodSnapshot, RestoreCounts, RestoreLog, SnapshotDetails,
};

use super::closing::ensure_period_open;

pub struct SnapshotService {
    repository: Arc<DuckDbRepository>,
}

impl SnapshotService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    pub fn create(&self, period: Period, label: Option<&str>, actor: &Actor) -> Result<PeriodSnapshot> {
        let label = label
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| l.to_string())
            .unwrap_or_else(|| format!("{} {}", period, Utc::now().format("%Y-%m-%d %H:%M")));

        let snapshot = self
            .repository
            .create_snapshot(period, &label, Some(actor.label()))
            .context("Failed to create snapshot")?;

        self.repository.append_audit_entry(&AuditEntry::new(
            actor,
            AuditAction::CreateSnapshot,
            format!("{} '{}': {} transactions", period, snapshot.label, snapshot.tx_count),
        ))?;

        Ok(snapshot)
    }

    pub fn list(&self, period: Option<Period>) -> Result<Vec<PeriodSnapshot>> {
        self.repository.list_snapshots(period)
    }

    pub fn get(&self, id: &str) -> Result<PeriodSnapshot> {
        let id = parse_id(id)?;
        self.repository
            .get_snapshot(&id)?
            .ok_or_else(|| Error::not_found(format!("snapshot {}", id)).into())
    }

    pub fn details(&self, id: &str) -> Result<SnapshotDetails> {
        let snapshot = self.get(id)?;
        let items = self.repository.get_snapshot_items(&snapshot.id.to_string())?;
        Ok(SnapshotDetails { snapshot, items })
    }

    /// Make the live period match the snapshot again
    ///
    /// Refused when the period is closed. A restore log is written with the
    /// counts of deleted, inserted and updated rows.
    pub fn restore(&self, id: &str, reason: &str, actor: &Actor) -> Result<RestoreLog> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(Error::validation("a reason is required to restore a snapshot").into());
        }

        let snapshot = self.get(id)?;
        ensure_period_open(&self.repository, snapshot.period)?;

        let counts: RestoreCounts = self
            .repository
            .restore_snapshot(&snapshot)
            .context("Failed to restore snapshot")?;

        let log = RestoreLog {
            id: Uuid::new_v4(),
            snapshot_id: snapshot.id,
            period: snapshot.period,
            restored_at: Utc::now(),
            restored_by: Some(actor.label().to_string()),
            reason: reason.to_string(),
            counts,
        };
        self.repository.insert_restore_log(&log)?;

        self.repository.append_audit_entry(
            &AuditEntry::new(
                actor,
                AuditAction::RestoreSnapshot,
                format!(
                    "{} from '{}': {} deleted, {} inserted, {} updated",
                    snapshot.period, snapshot.label, counts.deleted_count, counts.inserted_count, counts.updated_count
                ),
            )
            .with_reason(Some(reason)),
        )?;

        Ok(log)
    }

    pub fn delete(&self, id: &str, actor: &Actor) -> Result<()> {
        let snapshot = self.get(id)?;
        self.repository.delete_snapshot(&snapshot.id.to_string())?;
        self.repository.append_audit_entry(&AuditEntry::new(
            actor,
            AuditAction::DeleteSnapshot,
            format!("{} '{}'", snapshot.period, snapshot.label),
        ))?;
        Ok(())
    }

    pub fn restore_logs(&self, period: Option<Period>) -> Result<Vec<RestoreLog>> {
        self.repository.list_restore_logs(period)
    }
}

fn parse_id(id: &str) -> Result<String> {
    let id = Uuid::parse_str(id.trim()).map_err(|_| Error::validation(format!("invalid snapshot id: {}", id)))?;
    Ok(id.to_string())
}
