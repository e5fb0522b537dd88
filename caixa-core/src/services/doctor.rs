//! Doctor service - ledger consistency checks

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use serde_json::json;

use crate::adapters::duckdb::DuckDbRepository;

pub struct DoctorService {
    repository: Arc<DuckDbRepository>,
}

impl DoctorService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    pub fn run_checks(&self) -> Result<DoctorResult> {
        let mut checks = HashMap::new();

        let mismatched = self.repository.check_period_mismatch()?;
        checks.insert(
            "period_mismatch".to_string(),
            key_list_check(
                &mismatched,
                "error",
                "Every transaction is filed under the period of its date",
                "transaction(s) filed under the wrong period",
            ),
        );

        let non_positive = self.repository.check_non_positive_amounts()?;
        checks.insert(
            "non_positive_amounts".to_string(),
            key_list_check(
                &non_positive,
                "error",
                "All amounts are positive",
                "transaction(s) with zero or negative amount",
            ),
        );

        let unknown = self.repository.check_unknown_directions()?;
        checks.insert(
            "unknown_directions".to_string(),
            CheckResult {
                status: if unknown == 0 { "pass" } else { "error" }.to_string(),
                message: if unknown == 0 {
                    "All transactions are INCOMING or OUTGOING".to_string()
                } else {
                    format!("{} transaction(s) have an unknown direction", unknown)
                },
                details: None,
            },
        );

        let orphaned = self.repository.check_orphaned_snapshot_items()?;
        checks.insert(
            "orphaned_snapshot_items".to_string(),
            CheckResult {
                status: if orphaned == 0 { "pass" } else { "warning" }.to_string(),
                message: if orphaned == 0 {
                    "No orphaned snapshot items".to_string()
                } else {
                    format!("{} snapshot item(s) belong to a deleted snapshot", orphaned)
                },
                details: None,
            },
        );

        let pending_closed = self.repository.check_pending_in_closed_periods()?;
        checks.insert(
            "pending_in_closed_periods".to_string(),
            CheckResult {
                status: if pending_closed.is_empty() { "pass" } else { "warning" }.to_string(),
                message: if pending_closed.is_empty() {
                    "Closed periods are fully audited".to_string()
                } else {
                    format!("{} closed period(s) still have pending rows", pending_closed.len())
                },
                details: if pending_closed.is_empty() {
                    None
                } else {
                    Some(pending_closed.iter().map(|p| json!({ "period": p })).collect())
                },
            },
        );

        let passed = checks.values().filter(|c| c.status == "pass").count() as i64;
        let warnings = checks.values().filter(|c| c.status == "warning").count() as i64;
        let errors = checks.values().filter(|c| c.status == "error").count() as i64;

        Ok(DoctorResult {
            checks,
            summary: DoctorSummary { passed, warnings, errors },
        })
    }
}

fn key_list_check(keys: &[String], failing_status: &str, ok_message: &str, problem: &str) -> CheckResult {
    if keys.is_empty() {
        return CheckResult {
            status: "pass".to_string(),
            message: ok_message.to_string(),
            details: None,
        };
    }
    CheckResult {
        status: failing_status.to_string(),
        message: format!("{} {}", keys.len(), problem),
        details: Some(keys.iter().map(|k| json!({ "transaction_key": k })).collect()),
    }
}

#[derive(Debug, Serialize)]
pub struct DoctorResult {
    pub checks: HashMap<String, CheckResult>,
    pub summary: DoctorSummary,
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
pub struct DoctorSummary {
    pub passed: i64,
    pub warnings: i64,
    pub errors: i64,
}
