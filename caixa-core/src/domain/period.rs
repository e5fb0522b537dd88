//! Accounting periods (calendar months) and their closing state

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::result::Error;

/// A calendar month, keyed as `YYYY-MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self, Error> {
        if !(1..=12).contains(&month) {
            return Err(Error::validation(format!("month must be between 1 and 12, got {}", month)));
        }
        if !(1900..=9999).contains(&year) {
            return Err(Error::validation(format!("year out of range: {}", year)));
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn key(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl FromStr for Period {
    type Err = Error;

    /// Accepts `YYYY-MM` and `MM/YYYY`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || Error::validation(format!("invalid period '{}', expected YYYY-MM", s));

        let (year, month) = if let Some((y, m)) = s.split_once('-') {
            (y, m)
        } else if let Some((m, y)) = s.split_once('/') {
            (y, m)
        } else {
            return Err(invalid());
        };

        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Period::new(year, month)
    }
}

/// Totals frozen when a period is finalized
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosingSummary {
    pub total_in: Decimal,
    pub total_out: Decimal,
    /// In minus out, excluding categories that do not affect the result
    pub result: Decimal,
    pub transaction_count: i64,
    /// Rows still pending review at the moment of closing
    pub pending_audit_count: i64,
}

/// Closing record of one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodClosing {
    pub period: Period,
    pub is_closed: bool,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by: Option<String>,
    pub summary: ClosingSummary,
}

impl PeriodClosing {
    /// State of a period with no closing record
    pub fn open(period: Period) -> Self {
        Self {
            period,
            is_closed: false,
            closed_at: None,
            closed_by: None,
            summary: ClosingSummary::default(),
        }
    }
}
