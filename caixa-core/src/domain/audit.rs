//! Audit trail entries

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::Error;
use super::user::Actor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Import,
    DeleteImport,
    ManualEntry,
    UpdateCategory,
    UpdateObservations,
    MarkAudited,
    FinalizePeriod,
    ReopenPeriod,
    ResetPeriod,
    CreateSnapshot,
    RestoreSnapshot,
    DeleteSnapshot,
    AddSource,
    RemoveSource,
    ProvisionAdmin,
}

impl AuditAction {
    const ALL: [AuditAction; 15] = [
        AuditAction::Import,
        AuditAction::DeleteImport,
        AuditAction::ManualEntry,
        AuditAction::UpdateCategory,
        AuditAction::UpdateObservations,
        AuditAction::MarkAudited,
        AuditAction::FinalizePeriod,
        AuditAction::ReopenPeriod,
        AuditAction::ResetPeriod,
        AuditAction::CreateSnapshot,
        AuditAction::RestoreSnapshot,
        AuditAction::DeleteSnapshot,
        AuditAction::AddSource,
        AuditAction::RemoveSource,
        AuditAction::ProvisionAdmin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Import => "IMPORT",
            AuditAction::DeleteImport => "DELETE_IMPORT",
            AuditAction::ManualEntry => "MANUAL_ENTRY",
            AuditAction::UpdateCategory => "UPDATE_CATEGORY",
            AuditAction::UpdateObservations => "UPDATE_OBSERVATIONS",
            AuditAction::MarkAudited => "MARK_AUDITED",
            AuditAction::FinalizePeriod => "FINALIZE_PERIOD",
            AuditAction::ReopenPeriod => "REOPEN_PERIOD",
            AuditAction::ResetPeriod => "RESET_PERIOD",
            AuditAction::CreateSnapshot => "CREATE_SNAPSHOT",
            AuditAction::RestoreSnapshot => "RESTORE_SNAPSHOT",
            AuditAction::DeleteSnapshot => "DELETE_SNAPSHOT",
            AuditAction::AddSource => "ADD_SOURCE",
            AuditAction::RemoveSource => "REMOVE_SOURCE",
            AuditAction::ProvisionAdmin => "PROVISION_ADMIN",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|a| a.as_str() == s)
            .copied()
            .ok_or_else(|| Error::validation(format!("unknown audit action: {}", s)))
    }
}

/// One line of the audit trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub user_id: Option<String>,
    pub user_name: String,
    pub action: AuditAction,
    pub details: String,
    pub transaction_key: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub reason: Option<String>,
}

impl AuditEntry {
    pub fn new(actor: &Actor, action: AuditAction, details: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            user_id: actor.user_id.clone(),
            user_name: actor.name.clone(),
            action,
            details: details.into(),
            transaction_key: None,
            old_value: None,
            new_value: None,
            reason: None,
        }
    }

    pub fn with_transaction(mut self, key: impl Into<String>) -> Self {
        self.transaction_key = Some(key.into());
        self
    }

    pub fn with_change(mut self, old: Option<String>, new: Option<String>) -> Self {
        self.old_value = old;
        self.new_value = new;
        self
    }

    pub fn with_reason(mut self, reason: Option<&str>) -> Self {
        self.reason = reason.map(|r| r.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_strings_parse_back() {
        for action in AuditAction::ALL {
            assert_eq!(action.as_str().parse::<AuditAction>().unwrap(), action);
        }
    }

    #[test]
    fn test_builder() {
        let entry = AuditEntry::new(&Actor::system(), AuditAction::UpdateCategory, "recategorized")
            .with_transaction("abc")
            .with_change(Some("Outros".into()), Some("Aluguel".into()))
            .with_reason(Some("conferido com contrato"));
        assert_eq!(entry.user_name, "system");
        assert_eq!(entry.transaction_key.as_deref(), Some("abc"));
        assert_eq!(entry.new_value.as_deref(), Some("Aluguel"));
        assert_eq!(entry.reason.as_deref(), Some("conferido com contrato"));
    }
}
