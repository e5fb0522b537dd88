//! Caixa Core - bank statement ingestion and ledger for an accounting office
//!
//! The crate follows a hexagonal layout:
//!
//! - **ingest**: the pure statement pipeline (header detection, column
//!   mapping, row normalization, deduplication keys)
//! - **domain**: ledger entities (Transaction, Period, ImportJob, ...)
//! - **ports**: traits for external dependencies (TransactionStore, Categorizer)
//! - **services**: use cases (import, ledger edits, closing, snapshots, reports)
//! - **adapters**: concrete implementations (DuckDB, HTTP categorizer)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ingest;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::categorizer::{HttpCategorizer, RuleCategorizer};
use adapters::duckdb::DuckDbRepository;
use config::Config;
use ports::Categorizer;
use services::*;

pub use domain::result::Error;
pub use domain::{Actor, Direction, Period, Transaction};
pub use ingest::{ingest_statement, IngestError, IngestOptions, IngestionResult, NormalizedTransaction};

/// Ledger database file inside the data directory
pub const DB_FILENAME: &str = "caixa.duckdb";

/// Main context for Caixa operations
///
/// Holds the configuration, the database connection and every service.
pub struct CaixaContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub categorizer: Arc<dyn Categorizer>,
    pub status_service: StatusService,
    pub import_service: ImportService,
    pub manual_service: ManualEntryService,
    pub ledger_service: LedgerService,
    pub closing_service: ClosingService,
    pub snapshot_service: SnapshotService,
    pub report_service: ReportService,
    pub source_service: SourceService,
    pub user_service: UserService,
    pub audit_service: AuditService,
    pub doctor_service: DoctorService,
}

impl CaixaContext {
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;

        let repository = Arc::new(DuckDbRepository::new(&data_dir.join(DB_FILENAME))?);
        repository.ensure_schema()?;

        let categorizer: Arc<dyn Categorizer> = match &config.categorizer {
            Some(settings) => Arc::new(HttpCategorizer::new(settings)?),
            None => Arc::new(RuleCategorizer::new(config.ingest.category_rules.clone())),
        };

        let non_impacting = config.non_impacting_categories.clone();

        Ok(Self {
            status_service: StatusService::new(Arc::clone(&repository)),
            import_service: ImportService::new(Arc::clone(&repository), config.ingest.clone()),
            manual_service: ManualEntryService::new(Arc::clone(&repository), Arc::clone(&categorizer)),
            ledger_service: LedgerService::new(Arc::clone(&repository)),
            closing_service: ClosingService::new(Arc::clone(&repository), non_impacting.clone()),
            snapshot_service: SnapshotService::new(Arc::clone(&repository)),
            report_service: ReportService::new(Arc::clone(&repository), non_impacting),
            source_service: SourceService::new(Arc::clone(&repository)),
            user_service: UserService::new(Arc::clone(&repository)),
            audit_service: AuditService::new(Arc::clone(&repository)),
            doctor_service: DoctorService::new(Arc::clone(&repository)),
            categorizer,
            repository,
            config,
        })
    }
}
