//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod audit;
mod import_job;
mod period;
pub mod result;
mod snapshot;
mod source;
mod transaction;
mod user;

pub use audit::{AuditAction, AuditEntry};
pub use import_job::{ImportJob, ImportJobStatus};
pub use period::{ClosingSummary, Period, PeriodClosing};
pub use snapshot::{PeriodSnapshot, RestoreCounts, RestoreLog, SnapshotDetails, SnapshotItem};
pub use source::{Source, MANUAL_SOURCE};
pub use transaction::{AuditStatus, Direction, Transaction, TransactionStatus};
pub use user::{Actor, User, UserRole};
