//! Import job records

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportJobStatus {
    Processing,
    Completed,
    /// Finished, but nothing new was inserted or some rows were locked
    CompletedWithAlerts,
    Failed,
}

impl ImportJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportJobStatus::Processing => "PROCESSING",
            ImportJobStatus::Completed => "COMPLETED",
            ImportJobStatus::CompletedWithAlerts => "COMPLETED_WITH_ALERTS",
            ImportJobStatus::Failed => "FAILED",
        }
    }
}

impl FromStr for ImportJobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PROCESSING" => Ok(ImportJobStatus::Processing),
            "COMPLETED" => Ok(ImportJobStatus::Completed),
            "COMPLETED_WITH_ALERTS" => Ok(ImportJobStatus::CompletedWithAlerts),
            "FAILED" => Ok(ImportJobStatus::Failed),
            other => Err(Error::validation(format!("unknown import status: {}", other))),
        }
    }
}

/// One statement import, successful or not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJob {
    pub id: Uuid,
    pub source: String,
    pub file_name: String,
    pub status: ImportJobStatus,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub total_lines: i64,
    pub produced: i64,
    pub skipped: i64,
    pub inserted: i64,
    pub ignored: i64,
    /// Rows dropped because their period is closed
    pub locked: i64,
    pub error_message: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ImportJob {
    pub fn start(source: &str, file_name: &str, created_by: Option<&str>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: source.to_string(),
            file_name: file_name.to_string(),
            status: ImportJobStatus::Processing,
            period_start: None,
            period_end: None,
            total_lines: 0,
            produced: 0,
            skipped: 0,
            inserted: 0,
            ignored: 0,
            locked: 0,
            error_message: None,
            created_by: created_by.map(|s| s.to_string()),
            created_at: Utc::now(),
        }
    }

    /// Final status from the outcome counts
    pub fn finish(&mut self) {
        self.status = if self.inserted > 0 && self.locked == 0 {
            ImportJobStatus::Completed
        } else {
            ImportJobStatus::CompletedWithAlerts
        };
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = ImportJobStatus::Failed;
        self.error_message = Some(message.into());
    }
}
