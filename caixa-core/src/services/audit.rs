//! Audit service - read access to the audit trail

use std::sync::Arc;

use anyhow::Result;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::AuditEntry;

pub struct AuditService {
    repository: Arc<DuckDbRepository>,
}

impl AuditService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>> {
        self.repository.get_audit_entries(limit, None)
    }

    /// History of one transaction, newest first
    pub fn for_transaction(&self, key: &str, limit: usize) -> Result<Vec<AuditEntry>> {
        self.repository.get_audit_entries(limit, Some(key))
    }
}
