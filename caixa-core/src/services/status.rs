//! Status service - overview of the ledger

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::{ImportJob, Period};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub total_transactions: i64,
    pub date_range: DateRange,
    pub sources: Vec<String>,
    pub periods: Vec<PeriodOverview>,
    pub last_import: Option<ImportJob>,
    pub db_size_bytes: u64,
}

#[derive(Debug, Serialize)]
pub struct DateRange {
    pub earliest: Option<String>,
    pub latest: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodOverview {
    pub period: String,
    pub is_closed: bool,
}

pub struct StatusService {
    repository: Arc<DuckDbRepository>,
}

impl StatusService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    pub fn get_status(&self) -> Result<StatusSummary> {
        let range = self.repository.get_transaction_date_range()?;
        let closed: Vec<Period> = self
            .repository
            .list_period_closings()?
            .into_iter()
            .filter(|c| c.is_closed)
            .map(|c| c.period)
            .collect();

        let periods = self
            .repository
            .get_periods_with_transactions()?
            .into_iter()
            .map(|p| PeriodOverview {
                period: p.key(),
                is_closed: closed.contains(&p),
            })
            .collect();

        Ok(StatusSummary {
            total_transactions: self.repository.get_transaction_count()?,
            date_range: DateRange {
                earliest: range.earliest.map(|d| d.to_string()),
                latest: range.latest.map(|d| d.to_string()),
            },
            sources: self.repository.list_sources()?.into_iter().map(|s| s.id).collect(),
            periods,
            last_import: self.repository.list_import_jobs(1)?.into_iter().next(),
            db_size_bytes: self.repository.get_db_size().unwrap_or(0),
        })
    }
}
