//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod audit;
mod closing;
mod doctor;
pub mod import;
mod ledger;
pub mod logging;
mod manual;
pub mod migration;
mod report;
mod snapshot;
mod source;
mod status;
mod user;

pub use audit::AuditService;
pub use closing::{ClosingService, PeriodStatus, ResetOutcome};
pub use doctor::{CheckResult, DoctorResult, DoctorService, DoctorSummary};
pub use import::{ImportReport, ImportService};
pub use ledger::{LedgerService, TransactionFilter};
pub use logging::{EntryPoint, LogEntry, LogEvent, LogStats, LoggingService};
pub use manual::{ManualEntry, ManualEntryOutcome, ManualEntryService};
pub use migration::{MigrationResult, MigrationService};
pub use report::{CategoryTotal, MonthlyPoint, PeriodSummary, ReportService, YearEvolution};
pub use snapshot::SnapshotService;
pub use source::SourceService;
pub use status::{DateRange, PeriodOverview, StatusService, StatusSummary};
pub use user::{ProvisionOutcome, UserService};
