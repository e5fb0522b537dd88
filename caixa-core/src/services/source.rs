//! Source service - the institutions statements come from

use std::sync::Arc;

use anyhow::Result;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::Error;
use crate::domain::{Actor, AuditAction, AuditEntry, Source, MANUAL_SOURCE};

pub struct SourceService {
    repository: Arc<DuckDbRepository>,
}

impl SourceService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    pub fn list(&self) -> Result<Vec<Source>> {
        self.repository.list_sources()
    }

    /// Register a source; returns the existing one when the id is taken
    pub fn add(&self, name: &str, actor: &Actor) -> Result<Source> {
        if name.trim().is_empty() {
            return Err(Error::validation("source name cannot be empty").into());
        }

        let source = Source::new(name);
        if self.repository.insert_source(&source)? {
            self.repository.append_audit_entry(&AuditEntry::new(
                actor,
                AuditAction::AddSource,
                format!("{} ({})", source.name, source.id),
            ))?;
            return Ok(source);
        }

        let existing = self
            .repository
            .list_sources()?
            .into_iter()
            .find(|s| s.id == source.id)
            .unwrap_or(source);
        Ok(existing)
    }

    /// Remove a source that no transaction refers to
    pub fn remove(&self, name_or_id: &str, actor: &Actor) -> Result<()> {
        let id = Source::id_for(name_or_id);
        if id == MANUAL_SOURCE {
            return Err(Error::validation("the MANUAL source cannot be removed").into());
        }

        let in_use = self.repository.count_transactions_by_source(&id)?;
        if in_use > 0 {
            return Err(Error::validation(format!("source {} is used by {} transactions", id, in_use)).into());
        }

        if !self.repository.delete_source(&id)? {
            return Err(Error::not_found(format!("source {}", id)).into());
        }

        self.repository
            .append_audit_entry(&AuditEntry::new(actor, AuditAction::RemoveSource, id))?;
        Ok(())
    }
}
