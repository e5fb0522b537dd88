//! DuckDB repository implementation

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use duckdb::{params, Connection};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::Error;
use crate::domain::{
    AuditAction, AuditEntry, AuditStatus, ClosingSummary, Direction, ImportJob, ImportJobStatus, Period,
    PeriodClosing, PeriodSnapshot, RestoreCounts, RestoreLog, SnapshotItem, Source, Transaction,
    TransactionStatus, User, UserRole,
};
use crate::ports::{SaveOutcome, TransactionStore};
use crate::services::MigrationService;

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Transaction columns in table order, shared by the ledger and snapshot item tables
const TX_COLUMNS: &str = "transaction_id, transaction_key, transaction_date, description, amount,
    direction, category, source, period_year, period_month, confidence_score, status,
    audit_status, observations, external_id, balance, original_date, original_description,
    original_amount, original_category, import_id, created_by, updated_by, created_at, updated_at";

/// Same columns, cast for reading (see `row_to_transaction`)
const TX_SELECT: &str = "transaction_id, transaction_key, transaction_date::VARCHAR, description,
    amount::VARCHAR, direction, category, source, period_year, period_month, confidence_score,
    status, audit_status, observations, external_id, balance::VARCHAR, original_date::VARCHAR,
    original_description, original_amount::VARCHAR, original_category, import_id, created_by,
    updated_by, created_at::VARCHAR, updated_at::VARCHAR";

/// Check if an error message indicates a file locking issue that should be retried
pub(crate) fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("could not set lock on file")
        || lower.contains("file is already open")
}

/// Date range of the ledger
#[derive(Debug, Clone, Default)]
pub struct DateRange {
    pub earliest: Option<NaiveDate>,
    pub latest: Option<NaiveDate>,
}

/// DuckDB repository implementation
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbRepository {
    /// Open (or create) the ledger database
    ///
    /// Retries with exponential backoff on file locking errors, which happen
    /// when another `caixa` process holds the file.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: db_path.to_path_buf(),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[caixa] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("Failed to open database after {} retries", MAX_RETRIES)))
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading stays off; nothing here needs ICU or httpfs
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<crate::services::MigrationResult> {
        let conn = self.conn.lock().unwrap();
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn get_db_size(&self) -> Result<u64> {
        Ok(std::fs::metadata(&self.db_path)?.len())
    }

    // === Transaction operations ===

    /// Insert rows, ignoring any whose key is already stored
    ///
    /// Rows of closed periods are counted as locked and not written. Closings
    /// are read inside the same DB transaction as the inserts.
    pub fn save_transactions(&self, transactions: &[Transaction]) -> Result<SaveOutcome> {
        let mut conn = self.conn.lock().unwrap();
        let db_tx = conn.transaction()?;
        let mut closed: HashMap<Period, bool> = HashMap::new();
        let mut outcome = SaveOutcome::default();
        for tx in transactions {
            let period = tx.period();
            let is_closed = match closed.get(&period) {
                Some(c) => *c,
                None => {
                    let c = period_closed(&db_tx, period)?;
                    closed.insert(period, c);
                    c
                }
            };
            if is_closed {
                outcome.locked += 1;
            } else if insert_transaction_row(&db_tx, tx)? {
                outcome.inserted += 1;
            } else {
                outcome.ignored += 1;
            }
        }
        db_tx.commit()?;
        Ok(outcome)
    }

    pub fn get_transactions_by_period(&self, period: Period) -> Result<Vec<Transaction>> {
        let conn = self.conn.lock().unwrap();
        self.query_period_transactions(&conn, period)
    }

    fn query_period_transactions(&self, conn: &Connection, period: Period) -> Result<Vec<Transaction>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM caixa_transactions
             WHERE period_year = ? AND period_month = ?
             ORDER BY transaction_date, created_at, transaction_key",
            TX_SELECT
        ))?;

        let transactions = stmt
            .query_map(params![period.year, period.month as i32], |row| {
                Ok(self.row_to_transaction(row, 0))
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(transactions)
    }

    pub fn get_transactions_by_year(&self, year: i32) -> Result<Vec<Transaction>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM caixa_transactions WHERE period_year = ? ORDER BY transaction_date",
            TX_SELECT
        ))?;

        let transactions = stmt
            .query_map(params![year], |row| Ok(self.row_to_transaction(row, 0)))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(transactions)
    }

    pub fn get_transaction_by_key(&self, key: &str) -> Result<Option<Transaction>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM caixa_transactions WHERE transaction_key = ?",
            TX_SELECT
        ))?;

        let tx = stmt.query_row([key], |row| Ok(self.row_to_transaction(row, 0))).ok();
        Ok(tx)
    }

    pub fn update_transaction_category(&self, key: &str, category: &str, updated_by: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE caixa_transactions SET category = ?, updated_by = ?, updated_at = ?
             WHERE transaction_key = ?",
            params![category, updated_by, now_str(), key],
        )?;
        Ok(rows > 0)
    }

    pub fn update_transaction_observations(
        &self,
        key: &str,
        observations: Option<&str>,
        updated_by: &str,
    ) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE caixa_transactions SET observations = ?, updated_by = ?, updated_at = ?
             WHERE transaction_key = ?",
            params![observations, updated_by, now_str(), key],
        )?;
        Ok(rows > 0)
    }

    pub fn mark_transaction_audited(&self, key: &str, updated_by: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE caixa_transactions SET audit_status = 'AUDITED', updated_by = ?, updated_at = ?
             WHERE transaction_key = ?",
            params![updated_by, now_str(), key],
        )?;
        Ok(rows > 0)
    }

    pub fn get_transaction_count(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM caixa_transactions", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn get_transaction_date_range(&self) -> Result<DateRange> {
        let conn = self.conn.lock().unwrap();
        let (earliest, latest): (Option<String>, Option<String>) = conn.query_row(
            "SELECT MIN(transaction_date)::VARCHAR, MAX(transaction_date)::VARCHAR FROM caixa_transactions",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(DateRange {
            earliest: earliest.map(|s| parse_date(&s)),
            latest: latest.map(|s| parse_date(&s)),
        })
    }

    /// Distinct periods that hold at least one transaction, newest first
    pub fn get_periods_with_transactions(&self) -> Result<Vec<Period>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT period_year, period_month FROM caixa_transactions
             ORDER BY period_year DESC, period_month DESC",
        )?;
        let periods = stmt
            .query_map([], |row| {
                let year: i32 = row.get(0)?;
                let month: i32 = row.get(1)?;
                Ok(Period { year, month: month as u32 })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(periods)
    }

    fn row_to_transaction(&self, row: &duckdb::Row, offset: usize) -> Transaction {
        // Column order follows TX_SELECT:
        // 0: transaction_id, 1: transaction_key, 2: transaction_date, 3: description, 4: amount,
        // 5: direction, 6: category, 7: source, 8: period_year, 9: period_month,
        // 10: confidence_score, 11: status, 12: audit_status, 13: observations, 14: external_id,
        // 15: balance, 16: original_date, 17: original_description, 18: original_amount,
        // 19: original_category, 20: import_id, 21: created_by, 22: updated_by,
        // 23: created_at, 24: updated_at
        let col = |i: usize| offset + i;
        let text = |i: usize| -> String { row.get(col(i)).unwrap_or_default() };
        let opt_text = |i: usize| -> Option<String> { row.get::<_, Option<String>>(col(i)).ok().flatten() };

        let id_str = text(0);
        let date = parse_date(&text(2));
        let month: i32 = row.get(col(9)).unwrap_or_default();
        let confidence: i32 = row.get(col(10)).unwrap_or(100);

        Transaction {
            id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::new_v4()),
            transaction_key: text(1),
            date,
            description: text(3),
            amount: parse_decimal(&text(4)),
            direction: Direction::from_str(&text(5)).unwrap_or(Direction::Outgoing),
            category: text(6),
            source: text(7),
            month: month as u32,
            year: row.get(col(8)).unwrap_or_default(),
            confidence_score: confidence.clamp(0, 100) as u8,
            status: TransactionStatus::from_str(&text(11)).unwrap_or(TransactionStatus::Confirmed),
            audit_status: AuditStatus::from_str(&text(12)).unwrap_or(AuditStatus::Pending),
            observations: opt_text(13),
            external_id: opt_text(14),
            balance: parse_decimal(&text(15)),
            original_date: opt_text(16).map(|s| parse_date(&s)).unwrap_or(date),
            original_description: text(17),
            original_amount: parse_decimal(&text(18)),
            original_category: text(19),
            import_id: opt_text(20).and_then(|s| Uuid::parse_str(&s).ok()),
            created_by: opt_text(21),
            updated_by: opt_text(22),
            created_at: parse_timestamp(&text(23)),
            updated_at: parse_timestamp(&text(24)),
        }
    }

    // === Import jobs ===

    pub fn upsert_import_job(&self, job: &ImportJob) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO caixa_import_jobs (job_id, source, file_name, status, period_start, period_end,
                total_lines, produced, skipped, inserted, ignored, locked, error_message, created_by, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (job_id) DO UPDATE SET
                status = EXCLUDED.status,
                period_start = EXCLUDED.period_start,
                period_end = EXCLUDED.period_end,
                total_lines = EXCLUDED.total_lines,
                produced = EXCLUDED.produced,
                skipped = EXCLUDED.skipped,
                inserted = EXCLUDED.inserted,
                ignored = EXCLUDED.ignored,
                locked = EXCLUDED.locked,
                error_message = EXCLUDED.error_message",
            params![
                job.id.to_string(),
                job.source,
                job.file_name,
                job.status.as_str(),
                job.period_start.map(|d| d.to_string()),
                job.period_end.map(|d| d.to_string()),
                job.total_lines,
                job.produced,
                job.skipped,
                job.inserted,
                job.ignored,
                job.locked,
                job.error_message,
                job.created_by,
                timestamp_str(&job.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_import_job(&self, id: &str) -> Result<Option<ImportJob>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT job_id, source, file_name, status, period_start::VARCHAR, period_end::VARCHAR,
                    total_lines, produced, skipped, inserted, ignored, locked, error_message,
                    created_by, created_at::VARCHAR
             FROM caixa_import_jobs WHERE job_id = ?",
        )?;
        let job = stmt.query_row([id], |row| Ok(self.row_to_import_job(row))).ok();
        Ok(job)
    }

    pub fn list_import_jobs(&self, limit: usize) -> Result<Vec<ImportJob>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT job_id, source, file_name, status, period_start::VARCHAR, period_end::VARCHAR,
                    total_lines, produced, skipped, inserted, ignored, locked, error_message,
                    created_by, created_at::VARCHAR
             FROM caixa_import_jobs ORDER BY created_at DESC LIMIT ?",
        )?;
        let jobs = stmt
            .query_map(params![limit as i64], |row| Ok(self.row_to_import_job(row)))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(jobs)
    }

    /// Whether any row created by this job sits in a closed period
    pub fn import_job_touches_closed_period(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM caixa_transactions t
             JOIN caixa_period_closings c
               ON c.period_year = t.period_year AND c.period_month = t.period_month
             WHERE t.import_id = ? AND c.is_closed",
            [id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Delete a job and the transactions it created, returning the number of transactions removed
    pub fn delete_import_job(&self, id: &str) -> Result<usize> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM caixa_transactions WHERE import_id = ?", [id])?;
        tx.execute("DELETE FROM caixa_import_jobs WHERE job_id = ?", [id])?;
        tx.commit()?;
        Ok(removed)
    }

    fn row_to_import_job(&self, row: &duckdb::Row) -> ImportJob {
        let id_str: String = row.get(0).unwrap_or_default();
        let status: String = row.get(3).unwrap_or_default();
        let created_str: String = row.get(14).unwrap_or_default();

        ImportJob {
            id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::new_v4()),
            source: row.get(1).unwrap_or_default(),
            file_name: row.get(2).unwrap_or_default(),
            status: ImportJobStatus::from_str(&status).unwrap_or(ImportJobStatus::Failed),
            period_start: row.get::<_, Option<String>>(4).ok().flatten().map(|s| parse_date(&s)),
            period_end: row.get::<_, Option<String>>(5).ok().flatten().map(|s| parse_date(&s)),
            total_lines: row.get(6).unwrap_or_default(),
            produced: row.get(7).unwrap_or_default(),
            skipped: row.get(8).unwrap_or_default(),
            inserted: row.get(9).unwrap_or_default(),
            ignored: row.get(10).unwrap_or_default(),
            locked: row.get(11).unwrap_or_default(),
            error_message: row.get::<_, Option<String>>(12).ok().flatten(),
            created_by: row.get::<_, Option<String>>(13).ok().flatten(),
            created_at: parse_timestamp(&created_str),
        }
    }

    // === Audit log ===

    pub fn append_audit_entry(&self, entry: &AuditEntry) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        write_audit_entry(&conn, entry)
    }

    /// Most recent audit entries, optionally narrowed to one transaction key
    pub fn get_audit_entries(&self, limit: usize, transaction_key: Option<&str>) -> Result<Vec<AuditEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT entry_id, logged_at::VARCHAR, user_id, user_name, action, details,
                    transaction_key, old_value, new_value, reason
             FROM caixa_audit_log
             WHERE (CAST(? AS VARCHAR) IS NULL OR transaction_key = ?)
             ORDER BY logged_at DESC LIMIT ?",
        )?;
        let entries = stmt
            .query_map(params![transaction_key, transaction_key, limit as i64], |row| {
                let id_str: String = row.get(0)?;
                let logged_at: String = row.get(1)?;
                let action: String = row.get(4)?;
                Ok(AuditEntry {
                    id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::new_v4()),
                    timestamp: parse_timestamp(&logged_at),
                    user_id: row.get(2)?,
                    user_name: row.get(3)?,
                    action: AuditAction::from_str(&action).unwrap_or(AuditAction::Import),
                    details: row.get(5)?,
                    transaction_key: row.get(6)?,
                    old_value: row.get(7)?,
                    new_value: row.get(8)?,
                    reason: row.get(9)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(entries)
    }

    // === Sources ===

    pub fn list_sources(&self) -> Result<Vec<Source>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT source_id, name, created_at::VARCHAR FROM caixa_sources ORDER BY source_id")?;
        let sources = stmt
            .query_map([], |row| {
                let created: String = row.get(2)?;
                Ok(Source {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: parse_timestamp(&created),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(sources)
    }

    /// Returns false when a source with the same id already exists
    pub fn insert_source(&self, source: &Source) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "INSERT INTO caixa_sources (source_id, name, created_at) VALUES (?, ?, ?)
             ON CONFLICT (source_id) DO NOTHING",
            params![source.id, source.name, timestamp_str(&source.created_at)],
        )?;
        Ok(rows > 0)
    }

    pub fn delete_source(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute("DELETE FROM caixa_sources WHERE source_id = ?", [id])?;
        Ok(rows > 0)
    }

    pub fn count_transactions_by_source(&self, source: &str) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM caixa_transactions WHERE source = ?",
            [source],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // === Period closings ===

    pub fn get_period_closing(&self, period: Period) -> Result<Option<PeriodClosing>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT period_year, period_month, is_closed, closed_at::VARCHAR, closed_by,
                    total_in::VARCHAR, total_out::VARCHAR, result::VARCHAR,
                    transaction_count, pending_audit_count
             FROM caixa_period_closings WHERE period_key = ?",
        )?;
        let closing = stmt.query_row([period.key()], |row| Ok(self.row_to_closing(row))).ok();
        Ok(closing)
    }

    pub fn list_period_closings(&self) -> Result<Vec<PeriodClosing>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT period_year, period_month, is_closed, closed_at::VARCHAR, closed_by,
                    total_in::VARCHAR, total_out::VARCHAR, result::VARCHAR,
                    transaction_count, pending_audit_count
             FROM caixa_period_closings ORDER BY period_key DESC",
        )?;
        let closings = stmt
            .query_map([], |row| Ok(self.row_to_closing(row)))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(closings)
    }

    pub fn is_period_closed(&self, period: Period) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        period_closed(&conn, period)
    }

    /// Close a period in one DB transaction
    ///
    /// `build` gets the period's rows as read inside the transaction and
    /// returns the closing record plus its audit entry. Pending rows are then
    /// marked AUDITED. On any error nothing is kept and the period stays open.
    pub fn finalize_period<F>(&self, period: Period, build: F) -> Result<PeriodClosing>
    where
        F: FnOnce(&[Transaction]) -> (PeriodClosing, AuditEntry),
    {
        let mut conn = self.conn.lock().unwrap();
        let db_tx = conn.transaction()?;
        if period_closed(&db_tx, period)? {
            return Err(Error::period_closed(period.key()).into());
        }

        let transactions = self.query_period_transactions(&db_tx, period)?;
        let (closing, entry) = build(&transactions);

        db_tx.execute(
            "UPDATE caixa_transactions SET audit_status = 'AUDITED', updated_by = ?, updated_at = ?
             WHERE period_year = ? AND period_month = ? AND audit_status <> 'AUDITED'",
            params![closing.closed_by, now_str(), period.year, period.month as i32],
        )?;
        write_period_closing(&db_tx, &closing)?;
        write_audit_entry(&db_tx, &entry)?;
        db_tx.commit()?;

        Ok(closing)
    }

    /// Delete a period's transactions and snapshots in one DB transaction
    ///
    /// Returns `(transactions_deleted, snapshots_deleted)`. `audit` builds the
    /// entry recorded with the deletes.
    pub fn reset_period<F>(&self, period: Period, audit: F) -> Result<(usize, usize)>
    where
        F: FnOnce(usize, usize) -> AuditEntry,
    {
        let mut conn = self.conn.lock().unwrap();
        let db_tx = conn.transaction()?;
        if period_closed(&db_tx, period)? {
            return Err(Error::period_closed(period.key()).into());
        }

        let transactions = db_tx.execute(
            "DELETE FROM caixa_transactions WHERE period_year = ? AND period_month = ?",
            params![period.year, period.month as i32],
        )?;
        db_tx.execute(
            "DELETE FROM caixa_snapshot_items WHERE snapshot_id IN (
                SELECT snapshot_id FROM caixa_period_snapshots WHERE period_year = ? AND period_month = ?)",
            params![period.year, period.month as i32],
        )?;
        let snapshots = db_tx.execute(
            "DELETE FROM caixa_period_snapshots WHERE period_year = ? AND period_month = ?",
            params![period.year, period.month as i32],
        )?;
        write_audit_entry(&db_tx, &audit(transactions, snapshots))?;
        db_tx.commit()?;

        Ok((transactions, snapshots))
    }

    /// Remove the closing record, returning whether one existed
    pub fn delete_period_closing(&self, period: Period) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute("DELETE FROM caixa_period_closings WHERE period_key = ?", [period.key()])?;
        Ok(rows > 0)
    }

    fn row_to_closing(&self, row: &duckdb::Row) -> PeriodClosing {
        let month: i32 = row.get(1).unwrap_or(1);
        let closed_at: Option<String> = row.get::<_, Option<String>>(3).ok().flatten();
        let decimal_at = |i: usize| -> Decimal {
            row.get::<_, String>(i).map(|s| parse_decimal(&s)).unwrap_or_default()
        };

        PeriodClosing {
            period: Period {
                year: row.get(0).unwrap_or_default(),
                month: month as u32,
            },
            is_closed: row.get(2).unwrap_or(false),
            closed_at: closed_at.map(|s| parse_timestamp(&s)),
            closed_by: row.get::<_, Option<String>>(4).ok().flatten(),
            summary: ClosingSummary {
                total_in: decimal_at(5),
                total_out: decimal_at(6),
                result: decimal_at(7),
                transaction_count: row.get(8).unwrap_or_default(),
                pending_audit_count: row.get(9).unwrap_or_default(),
            },
        }
    }

    // === Snapshots ===

    /// Copy the period's live rows into a new snapshot, returning the header with its row count
    pub fn create_snapshot(
        &self,
        period: Period,
        label: &str,
        created_by: Option<&str>,
    ) -> Result<PeriodSnapshot> {
        let mut conn = self.conn.lock().unwrap();
        let mut snapshot = PeriodSnapshot {
            id: Uuid::new_v4(),
            label: label.to_string(),
            period,
            tx_count: 0,
            created_at: Utc::now(),
            created_by: created_by.map(|s| s.to_string()),
        };

        let tx = conn.transaction()?;
        let copied = tx.execute(
            &format!(
                "INSERT INTO caixa_snapshot_items (snapshot_id, {cols})
                 SELECT ?, {cols} FROM caixa_transactions
                 WHERE period_year = ? AND period_month = ?",
                cols = TX_COLUMNS
            ),
            params![snapshot.id.to_string(), period.year, period.month as i32],
        )?;
        snapshot.tx_count = copied as i64;

        tx.execute(
            "INSERT INTO caixa_period_snapshots (snapshot_id, label, period_year, period_month,
                tx_count, created_at, created_by)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                snapshot.id.to_string(),
                snapshot.label,
                period.year,
                period.month as i32,
                snapshot.tx_count,
                timestamp_str(&snapshot.created_at),
                snapshot.created_by,
            ],
        )?;
        tx.commit()?;

        Ok(snapshot)
    }

    pub fn list_snapshots(&self, period: Option<Period>) -> Result<Vec<PeriodSnapshot>> {
        let conn = self.conn.lock().unwrap();
        let (year, month) = match period {
            Some(p) => (Some(p.year), Some(p.month as i32)),
            None => (None, None),
        };
        let mut stmt = conn.prepare(
            "SELECT snapshot_id, label, period_year, period_month, tx_count, created_at::VARCHAR, created_by
             FROM caixa_period_snapshots
             WHERE (CAST(? AS INTEGER) IS NULL OR period_year = ?)
               AND (CAST(? AS INTEGER) IS NULL OR period_month = ?)
             ORDER BY created_at DESC",
        )?;
        let snapshots = stmt
            .query_map(params![year, year, month, month], |row| Ok(self.row_to_snapshot(row)))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(snapshots)
    }

    pub fn get_snapshot(&self, id: &str) -> Result<Option<PeriodSnapshot>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT snapshot_id, label, period_year, period_month, tx_count, created_at::VARCHAR, created_by
             FROM caixa_period_snapshots WHERE snapshot_id = ?",
        )?;
        let snapshot = stmt.query_row([id], |row| Ok(self.row_to_snapshot(row))).ok();
        Ok(snapshot)
    }

    pub fn get_snapshot_items(&self, id: &str) -> Result<Vec<SnapshotItem>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT snapshot_id, {} FROM caixa_snapshot_items
             WHERE snapshot_id = ? ORDER BY transaction_date, transaction_key",
            TX_SELECT
        ))?;
        let items = stmt
            .query_map([id], |row| {
                let snapshot_id: String = row.get(0)?;
                Ok(SnapshotItem {
                    snapshot_id: Uuid::parse_str(&snapshot_id).unwrap_or_default(),
                    transaction: self.row_to_transaction(row, 1),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(items)
    }

    pub fn delete_snapshot(&self, id: &str) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM caixa_snapshot_items WHERE snapshot_id = ?", [id])?;
        let rows = tx.execute("DELETE FROM caixa_period_snapshots WHERE snapshot_id = ?", [id])?;
        tx.commit()?;
        Ok(rows > 0)
    }

    /// Bring the live period back to the snapshot's contents
    ///
    /// Rows are matched by `transaction_key`: items already live are
    /// overwritten, missing ones are inserted, and live rows of the period
    /// absent from the snapshot are deleted.
    pub fn restore_snapshot(&self, snapshot: &PeriodSnapshot) -> Result<RestoreCounts> {
        let mut conn = self.conn.lock().unwrap();
        let id = snapshot.id.to_string();
        let period = snapshot.period;

        let tx = conn.transaction()?;

        let item_count: i64 = tx.query_row(
            "SELECT COUNT(*) FROM caixa_snapshot_items WHERE snapshot_id = ?",
            [id.as_str()],
            |row| row.get(0),
        )?;
        let existing: i64 = tx.query_row(
            "SELECT COUNT(*) FROM caixa_snapshot_items s
             WHERE s.snapshot_id = ?
               AND EXISTS (SELECT 1 FROM caixa_transactions t WHERE t.transaction_key = s.transaction_key)",
            [id.as_str()],
            |row| row.get(0),
        )?;

        let deleted = tx.execute(
            "DELETE FROM caixa_transactions
             WHERE period_year = ? AND period_month = ?
               AND transaction_key NOT IN (
                   SELECT transaction_key FROM caixa_snapshot_items WHERE snapshot_id = ?)",
            params![period.year, period.month as i32, id.as_str()],
        )?;

        tx.execute(
            &format!(
                "INSERT INTO caixa_transactions ({cols})
                 SELECT {cols} FROM caixa_snapshot_items WHERE snapshot_id = ?
                 ON CONFLICT (transaction_key) DO UPDATE SET
                    transaction_date = EXCLUDED.transaction_date,
                    description = EXCLUDED.description,
                    amount = EXCLUDED.amount,
                    direction = EXCLUDED.direction,
                    category = EXCLUDED.category,
                    source = EXCLUDED.source,
                    period_year = EXCLUDED.period_year,
                    period_month = EXCLUDED.period_month,
                    confidence_score = EXCLUDED.confidence_score,
                    status = EXCLUDED.status,
                    audit_status = EXCLUDED.audit_status,
                    observations = EXCLUDED.observations,
                    external_id = EXCLUDED.external_id,
                    balance = EXCLUDED.balance,
                    import_id = EXCLUDED.import_id,
                    updated_by = EXCLUDED.updated_by,
                    updated_at = EXCLUDED.updated_at",
                cols = TX_COLUMNS
            ),
            [id.as_str()],
        )?;

        tx.commit()?;

        Ok(RestoreCounts {
            deleted_count: deleted as i64,
            inserted_count: item_count - existing,
            updated_count: existing,
        })
    }

    pub fn insert_restore_log(&self, log: &RestoreLog) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO caixa_restore_logs (restore_id, snapshot_id, period_year, period_month,
                restored_at, restored_by, reason, deleted_count, inserted_count, updated_count)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                log.id.to_string(),
                log.snapshot_id.to_string(),
                log.period.year,
                log.period.month as i32,
                timestamp_str(&log.restored_at),
                log.restored_by,
                log.reason,
                log.counts.deleted_count,
                log.counts.inserted_count,
                log.counts.updated_count,
            ],
        )?;
        Ok(())
    }

    pub fn list_restore_logs(&self, period: Option<Period>) -> Result<Vec<RestoreLog>> {
        let conn = self.conn.lock().unwrap();
        let (year, month) = match period {
            Some(p) => (Some(p.year), Some(p.month as i32)),
            None => (None, None),
        };
        let mut stmt = conn.prepare(
            "SELECT restore_id, snapshot_id, period_year, period_month, restored_at::VARCHAR,
                    restored_by, reason, deleted_count, inserted_count, updated_count
             FROM caixa_restore_logs
             WHERE (CAST(? AS INTEGER) IS NULL OR period_year = ?)
               AND (CAST(? AS INTEGER) IS NULL OR period_month = ?)
             ORDER BY restored_at DESC",
        )?;
        let logs = stmt
            .query_map(params![year, year, month, month], |row| {
                let id: String = row.get(0)?;
                let snapshot_id: String = row.get(1)?;
                let month: i32 = row.get(3)?;
                let restored_at: String = row.get(4)?;
                Ok(RestoreLog {
                    id: Uuid::parse_str(&id).unwrap_or_default(),
                    snapshot_id: Uuid::parse_str(&snapshot_id).unwrap_or_default(),
                    period: Period {
                        year: row.get(2)?,
                        month: month as u32,
                    },
                    restored_at: parse_timestamp(&restored_at),
                    restored_by: row.get(5)?,
                    reason: row.get(6)?,
                    counts: RestoreCounts {
                        deleted_count: row.get(7)?,
                        inserted_count: row.get(8)?,
                        updated_count: row.get(9)?,
                    },
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(logs)
    }

    fn row_to_snapshot(&self, row: &duckdb::Row) -> PeriodSnapshot {
        let id_str: String = row.get(0).unwrap_or_default();
        let month: i32 = row.get(3).unwrap_or(1);
        let created_str: String = row.get(5).unwrap_or_default();

        PeriodSnapshot {
            id: Uuid::parse_str(&id_str).unwrap_or_default(),
            label: row.get(1).unwrap_or_default(),
            period: Period {
                year: row.get(2).unwrap_or_default(),
                month: month as u32,
            },
            tx_count: row.get(4).unwrap_or_default(),
            created_at: parse_timestamp(&created_str),
            created_by: row.get::<_, Option<String>>(6).ok().flatten(),
        }
    }

    // === Users ===

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT user_id, name, email, role, active, created_at::VARCHAR
             FROM caixa_users WHERE email = ?",
        )?;
        let user = stmt
            .query_row([email.trim().to_lowercase()], |row| Ok(self.row_to_user(row)))
            .ok();
        Ok(user)
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT user_id, name, email, role, active, created_at::VARCHAR
             FROM caixa_users ORDER BY email",
        )?;
        let users = stmt
            .query_map([], |row| Ok(self.row_to_user(row)))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(users)
    }

    pub fn insert_user(&self, user: &User, password_hash: &str, password_salt: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO caixa_users (user_id, name, email, role, active, password_hash, password_salt, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                user.id,
                user.name,
                user.email,
                user.role.as_str(),
                user.active,
                password_hash,
                password_salt,
                timestamp_str(&user.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn update_user_access(&self, email: &str, role: UserRole, active: bool) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE caixa_users SET role = ?, active = ? WHERE email = ?",
            params![role.as_str(), active, email.trim().to_lowercase()],
        )?;
        Ok(rows > 0)
    }

    /// Stored `(hash, salt)` pair for a user
    pub fn get_user_credentials(&self, email: &str) -> Result<Option<(String, String)>> {
        let conn = self.conn.lock().unwrap();
        let creds = conn
            .query_row(
                "SELECT password_hash, password_salt FROM caixa_users WHERE email = ?",
                [email.trim().to_lowercase()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .ok();
        Ok(creds)
    }

    fn row_to_user(&self, row: &duckdb::Row) -> User {
        let role: String = row.get(3).unwrap_or_default();
        let created_str: String = row.get(5).unwrap_or_default();
        User {
            id: row.get(0).unwrap_or_default(),
            name: row.get(1).unwrap_or_default(),
            email: row.get(2).unwrap_or_default(),
            role: UserRole::from_str(&role).unwrap_or(UserRole::Operator),
            active: row.get(4).unwrap_or(true),
            created_at: parse_timestamp(&created_str),
        }
    }

    // === Doctor checks ===

    /// Keys whose stored period does not match their date
    pub fn check_period_mismatch(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT transaction_key FROM caixa_transactions
             WHERE period_year <> year(transaction_date) OR period_month <> month(transaction_date)
             LIMIT 100",
        )?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(keys)
    }

    pub fn check_non_positive_amounts(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT transaction_key FROM caixa_transactions WHERE amount <= 0 LIMIT 100",
        )?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(keys)
    }

    pub fn check_unknown_directions(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM caixa_transactions WHERE direction NOT IN ('INCOMING', 'OUTGOING')",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Snapshot items whose header is gone
    pub fn check_orphaned_snapshot_items(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM caixa_snapshot_items i
             LEFT JOIN caixa_period_snapshots s ON s.snapshot_id = i.snapshot_id
             WHERE s.snapshot_id IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Closed periods that still hold rows pending audit
    pub fn check_pending_in_closed_periods(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT c.period_key, COUNT(*) FROM caixa_period_closings c
             JOIN caixa_transactions t
               ON t.period_year = c.period_year AND t.period_month = c.period_month
             WHERE c.is_closed AND t.audit_status <> 'AUDITED'
             GROUP BY c.period_key ORDER BY c.period_key",
        )?;
        let periods = stmt
            .query_map([], |row| {
                let key: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok(format!("{} ({} pending)", key, count))
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(periods)
    }

    pub fn table_exists(&self, table_name: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables
             WHERE table_schema = 'main' AND table_name = ?",
            [table_name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

impl TransactionStore for DuckDbRepository {
    fn save(&self, transactions: &[Transaction]) -> Result<SaveOutcome> {
        self.save_transactions(transactions)
    }
}

fn period_closed(conn: &Connection, period: Period) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM caixa_period_closings WHERE period_key = ? AND is_closed",
        [period.key()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn write_period_closing(conn: &Connection, closing: &PeriodClosing) -> Result<()> {
    conn.execute(
        "INSERT INTO caixa_period_closings (period_key, period_year, period_month, is_closed,
            closed_at, closed_by, total_in, total_out, result, transaction_count, pending_audit_count)
         VALUES (?, ?, ?, ?, ?, ?, CAST(? AS DECIMAL(18, 2)), CAST(? AS DECIMAL(18, 2)),
                 CAST(? AS DECIMAL(18, 2)), ?, ?)
         ON CONFLICT (period_key) DO UPDATE SET
            is_closed = EXCLUDED.is_closed,
            closed_at = EXCLUDED.closed_at,
            closed_by = EXCLUDED.closed_by,
            total_in = EXCLUDED.total_in,
            total_out = EXCLUDED.total_out,
            result = EXCLUDED.result,
            transaction_count = EXCLUDED.transaction_count,
            pending_audit_count = EXCLUDED.pending_audit_count",
        params![
            closing.period.key(),
            closing.period.year,
            closing.period.month as i32,
            closing.is_closed,
            closing.closed_at.as_ref().map(timestamp_str),
            closing.closed_by,
            closing.summary.total_in.to_string(),
            closing.summary.total_out.to_string(),
            closing.summary.result.to_string(),
            closing.summary.transaction_count,
            closing.summary.pending_audit_count,
        ],
    )?;
    Ok(())
}

fn write_audit_entry(conn: &Connection, entry: &AuditEntry) -> Result<()> {
    conn.execute(
        "INSERT INTO caixa_audit_log (entry_id, logged_at, user_id, user_name, action, details,
            transaction_key, old_value, new_value, reason)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            entry.id.to_string(),
            timestamp_str(&entry.timestamp),
            entry.user_id,
            entry.user_name,
            entry.action.as_str(),
            entry.details,
            entry.transaction_key,
            entry.old_value,
            entry.new_value,
            entry.reason,
        ],
    )?;
    Ok(())
}

/// Insert one ledger row unless its key is already present
fn insert_transaction_row(conn: &Connection, tx: &Transaction) -> Result<bool> {
    let rows = conn.execute(
        &format!(
            "INSERT INTO caixa_transactions ({})
             VALUES (?, ?, ?, ?, CAST(? AS DECIMAL(18, 2)), ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
                     CAST(? AS DECIMAL(18, 2)), ?, ?, CAST(? AS DECIMAL(18, 2)), ?, ?, ?, ?, ?, ?)
             ON CONFLICT (transaction_key) DO NOTHING",
            TX_COLUMNS
        ),
        params![
            tx.id.to_string(),
            tx.transaction_key,
            tx.date.to_string(),
            tx.description,
            tx.amount.to_string(),
            tx.direction.as_str(),
            tx.category,
            tx.source,
            tx.year,
            tx.month as i32,
            tx.confidence_score as i32,
            tx.status.as_str(),
            tx.audit_status.as_str(),
            tx.observations,
            tx.external_id,
            tx.balance.to_string(),
            tx.original_date.to_string(),
            tx.original_description,
            tx.original_amount.to_string(),
            tx.original_category,
            tx.import_id.map(|id| id.to_string()),
            tx.created_by,
            tx.updated_by,
            timestamp_str(&tx.created_at),
            timestamp_str(&tx.updated_at),
        ],
    )?;
    Ok(rows > 0)
}

fn now_str() -> String {
    timestamp_str(&Utc::now())
}

/// DuckDB TIMESTAMP literal (UTC, microseconds)
fn timestamp_str(dt: &DateTime<Utc>) -> String {
    dt.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    parse_naive_datetime(s).and_utc()
}

fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_else(|_| Utc::now().date_naive())
}

fn parse_decimal(s: &str) -> Decimal {
    Decimal::from_str(s.trim()).unwrap_or_default()
}

fn parse_naive_datetime(s: &str) -> NaiveDateTime {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.naive_utc();
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .unwrap_or_else(|_| Utc::now().naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Actor, MANUAL_SOURCE};
    use crate::ingest::manual_key;
    use tempfile::TempDir;

    fn open_repository(dir: &TempDir) -> DuckDbRepository {
        let repo = DuckDbRepository::new(&dir.path().join("caixa.duckdb")).unwrap();
        repo.ensure_schema().unwrap();
        repo
    }

    fn entry(date: NaiveDate, description: &str) -> Transaction {
        let amount = Decimal::new(1000, 2);
        Transaction::manual(
            manual_key(date, amount, Direction::Outgoing, description),
            date,
            description,
            amount,
            Direction::Outgoing,
            "Outros",
            MANUAL_SOURCE,
            None,
        )
    }

    fn march_day(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn closing_for(period: Period, transactions: &[Transaction]) -> (PeriodClosing, AuditEntry) {
        let closing = PeriodClosing {
            period,
            is_closed: true,
            closed_at: Some(Utc::now()),
            closed_by: Some("system".to_string()),
            summary: ClosingSummary {
                transaction_count: transactions.len() as i64,
                ..Default::default()
            },
        };
        let entry = AuditEntry::new(&Actor::system(), AuditAction::FinalizePeriod, period.key());
        (closing, entry)
    }

    #[test]
    fn test_finalize_period_closes_and_audits() {
        let dir = TempDir::new().unwrap();
        let repo = open_repository(&dir);
        let march = Period::new(2025, 3).unwrap();
        repo.save_transactions(&[entry(march_day(10), "Aluguel"), entry(march_day(11), "Energia")])
            .unwrap();

        let closing = repo.finalize_period(march, |txs| closing_for(march, txs)).unwrap();

        assert_eq!(closing.summary.transaction_count, 2);
        assert!(repo.is_period_closed(march).unwrap());
        let rows = repo.get_transactions_by_period(march).unwrap();
        assert!(rows.iter().all(|t| t.audit_status == AuditStatus::Audited));
    }

    #[test]
    fn test_failed_finalize_leaves_period_untouched() {
        let dir = TempDir::new().unwrap();
        let repo = open_repository(&dir);
        let march = Period::new(2025, 3).unwrap();
        repo.save_transactions(&[entry(march_day(10), "Aluguel"), entry(march_day(11), "Energia")])
            .unwrap();

        // The audit write is the last step of the finalize
        repo.conn.lock().unwrap().execute_batch("DROP TABLE caixa_audit_log").unwrap();

        assert!(repo.finalize_period(march, |txs| closing_for(march, txs)).is_err());
        assert!(!repo.is_period_closed(march).unwrap());
        let rows = repo.get_transactions_by_period(march).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|t| t.audit_status == AuditStatus::Pending));
    }

    #[test]
    fn test_failed_reset_keeps_rows_and_snapshots() {
        let dir = TempDir::new().unwrap();
        let repo = open_repository(&dir);
        let march = Period::new(2025, 3).unwrap();
        repo.save_transactions(&[entry(march_day(10), "Aluguel")]).unwrap();
        repo.create_snapshot(march, "antes", None).unwrap();

        repo.conn.lock().unwrap().execute_batch("DROP TABLE caixa_audit_log").unwrap();

        let result = repo.reset_period(march, |deleted, snapshots| {
            AuditEntry::new(&Actor::system(), AuditAction::ResetPeriod, format!("{} {}", deleted, snapshots))
        });
        assert!(result.is_err());
        assert_eq!(repo.get_transactions_by_period(march).unwrap().len(), 1);
        assert_eq!(repo.list_snapshots(Some(march)).unwrap().len(), 1);
    }

    #[test]
    fn test_finalize_and_reset_refuse_closed_period() {
        let dir = TempDir::new().unwrap();
        let repo = open_repository(&dir);
        let march = Period::new(2025, 3).unwrap();
        repo.finalize_period(march, |txs| closing_for(march, txs)).unwrap();

        let err = repo.finalize_period(march, |txs| closing_for(march, txs)).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::PeriodClosed(_))));
        let err = repo
            .reset_period(march, |_, _| AuditEntry::new(&Actor::system(), AuditAction::ResetPeriod, "reset"))
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::PeriodClosed(_))));
    }

    #[test]
    fn test_save_counts_closed_period_rows_as_locked() {
        let dir = TempDir::new().unwrap();
        let repo = open_repository(&dir);
        let march = Period::new(2025, 3).unwrap();
        repo.finalize_period(march, |txs| closing_for(march, txs)).unwrap();

        let april = NaiveDate::from_ymd_opt(2025, 4, 2).unwrap();
        let outcome = repo
            .save_transactions(&[entry(march_day(10), "Aluguel"), entry(april, "Aluguel")])
            .unwrap();

        assert_eq!(outcome, SaveOutcome { inserted: 1, ignored: 0, locked: 1 });
        assert!(repo.get_transactions_by_period(march).unwrap().is_empty());
    }

    #[test]
    fn test_timestamp_round_trip() {
        let dt = DateTime::parse_from_rfc3339("2025-03-15T10:20:30.123456Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parse_timestamp(&timestamp_str(&dt)), dt);
        assert_eq!(
            parse_timestamp("2025-03-15 10:20:30"),
            DateTime::parse_from_rfc3339("2025-03-15T10:20:30Z").unwrap().with_timezone(&Utc)
        );
    }

    #[test]
    fn test_parse_decimal_from_duckdb_text() {
        assert_eq!(parse_decimal("1500.00"), Decimal::new(150000, 2));
        assert_eq!(parse_decimal("-12.30"), Decimal::new(-1230, 2));
        assert_eq!(parse_decimal(""), Decimal::ZERO);
    }

    #[test]
    fn test_retryable_errors() {
        assert!(is_retryable_error("IO Error: Could not set lock on file \"caixa.duckdb\""));
        assert!(is_retryable_error("The process cannot access the file because it is being used by another process"));
        assert!(!is_retryable_error("Catalog Error: Table with name foo does not exist"));
    }
}
