//! Import service - statement files into the ledger
//!
//! Parsing is delegated to [`crate::ingest`]. This service adds the parts
//! that need storage: the import job record, closed-period locking,
//! upsert-ignore persistence and the audit trail.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::Error;
use crate::domain::{Actor, AuditAction, AuditEntry, ImportJob, ImportJobStatus, Transaction};
use crate::ingest::{ingest_statement, IngestOptions, IngestionResult, SkippedLine};
use crate::ports::TransactionStore;

/// Outcome of a committed import
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub job_id: Uuid,
    pub status: ImportJobStatus,
    pub source: String,
    pub total_lines: usize,
    pub produced: usize,
    pub skipped: usize,
    pub inserted: usize,
    /// Already in the ledger (same transaction key)
    pub ignored: usize,
    /// Dropped because their period is closed
    pub locked: usize,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub skipped_lines: Vec<SkippedLine>,
}

pub struct ImportService {
    repository: Arc<DuckDbRepository>,
    options: IngestOptions,
}

impl ImportService {
    pub fn new(repository: Arc<DuckDbRepository>, options: IngestOptions) -> Self {
        Self { repository, options }
    }

    /// Parse without writing anything
    pub fn preview(&self, content: &str, source: &str) -> Result<IngestionResult> {
        Ok(ingest_statement(content, source, &self.options)?)
    }

    pub fn preview_file(&self, path: &Path, source: &str) -> Result<IngestionResult> {
        let content = read_statement(path)?;
        self.preview(&content, source)
    }

    pub fn import_file(&self, path: &Path, source: &str, actor: &Actor) -> Result<ImportReport> {
        let content = read_statement(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        self.import_content(&content, &file_name, source, actor)
    }

    /// Parse and commit a statement
    ///
    /// A job record is written before anything else, so failed imports stay
    /// visible in `list_jobs` with status FAILED.
    pub fn import_content(&self, content: &str, file_name: &str, source: &str, actor: &Actor) -> Result<ImportReport> {
        let source = source.trim().to_uppercase();
        let mut job = ImportJob::start(&source, file_name, Some(actor.label()));
        self.repository
            .upsert_import_job(&job)
            .context("Failed to record import job")?;

        match self.commit(content, &source, &mut job, actor) {
            Ok(report) => Ok(report),
            Err(e) => {
                job.fail(format!("{:#}", e));
                let recorded = self.repository.upsert_import_job(&job);
                Err(with_record_failure(e, job.id, recorded))
            }
        }
    }

    fn commit(&self, content: &str, source: &str, job: &mut ImportJob, actor: &Actor) -> Result<ImportReport> {
        let result = ingest_statement(content, source, &self.options)?;
        job.total_lines = result.total_lines_scanned as i64;
        job.produced = result.transactions_produced as i64;
        job.skipped = result.lines_skipped as i64;
        if let Some((start, end)) = result.period() {
            job.period_start = Some(start);
            job.period_end = Some(end);
        }

        let to_save: Vec<Transaction> = result
            .transactions
            .iter()
            .map(|normalized| Transaction::from_statement(normalized, job.id, Some(actor.label())))
            .collect();

        // Rows of closed periods come back as locked
        let outcome = self
            .repository
            .save(&to_save)
            .context("Failed to save imported transactions")?;

        job.inserted = outcome.inserted as i64;
        job.ignored = outcome.ignored as i64;
        job.locked = outcome.locked as i64;
        job.finish();
        self.repository.upsert_import_job(job)?;

        self.repository.append_audit_entry(&AuditEntry::new(
            actor,
            AuditAction::Import,
            format!(
                "{} ({}): {} inserted, {} ignored, {} locked, {} skipped",
                job.file_name, source, outcome.inserted, outcome.ignored, outcome.locked, result.lines_skipped
            ),
        ))?;

        Ok(ImportReport {
            job_id: job.id,
            status: job.status,
            source: source.to_string(),
            total_lines: result.total_lines_scanned,
            produced: result.transactions_produced,
            skipped: result.lines_skipped,
            inserted: outcome.inserted,
            ignored: outcome.ignored,
            locked: outcome.locked,
            period_start: job.period_start,
            period_end: job.period_end,
            skipped_lines: result.skipped,
        })
    }

    pub fn list_jobs(&self, limit: usize) -> Result<Vec<ImportJob>> {
        self.repository.list_import_jobs(limit)
    }

    pub fn get_job(&self, id: &str) -> Result<ImportJob> {
        self.repository
            .get_import_job(id)?
            .ok_or_else(|| Error::not_found(format!("import job {}", id)).into())
    }

    /// Delete a job and every transaction it created
    ///
    /// Refused when any of those transactions sits in a closed period.
    pub fn delete_job(&self, id: &str, actor: &Actor) -> Result<usize> {
        let job = self.get_job(id)?;
        if self.repository.import_job_touches_closed_period(id)? {
            return Err(Error::validation(format!(
                "import {} has transactions in a closed period; reopen it first",
                id
            ))
            .into());
        }

        let removed = self.repository.delete_import_job(id)?;
        self.repository.append_audit_entry(&AuditEntry::new(
            actor,
            AuditAction::DeleteImport,
            format!("{} ({}): {} transactions removed", job.file_name, job.source, removed),
        ))?;
        Ok(removed)
    }
}

/// Read a statement as UTF-8; the ingest pipeline strips a leading BOM
fn read_statement(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    String::from_utf8(bytes).with_context(|| format!("{} is not valid UTF-8", path.display()))
}

/// Attach a failure to mark the job FAILED to the error that caused it
fn with_record_failure(error: anyhow::Error, job_id: Uuid, recorded: Result<()>) -> anyhow::Error {
    match recorded {
        Ok(()) => error,
        Err(record_error) => error.context(format!(
            "import job {} could not be marked FAILED: {:#}",
            job_id, record_error
        )),
    }
}
