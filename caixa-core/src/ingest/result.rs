//! Output of one ingestion run

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::Direction;

use super::columns::ColumnMapping;
use super::detect::Separator;

/// A statement row after normalization
///
/// Created once per source row and never modified by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedTransaction {
    pub date: NaiveDate,
    pub description: String,
    /// Always positive; the sign lives in `direction`
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub direction: Direction,
    pub category: String,
    pub source: String,
    pub transaction_key: String,
    pub month: u32,
    pub year: i32,
    pub confidence_score: u8,
    pub external_id: String,
    pub balance: Decimal,
    /// 1-based position among the file's non-empty lines
    pub line_number: usize,
}

/// Why a data line did not produce a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    ZeroAmount,
    InvalidDate,
    NonTransactionalMarker,
    MalformedRow,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::ZeroAmount => "zero or unparseable amount",
            SkipReason::InvalidDate => "invalid date",
            SkipReason::NonTransactionalMarker => "balance/summary line",
            SkipReason::MalformedRow => "missing date or amount cell",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedLine {
    pub line_number: usize,
    pub reason: SkipReason,
}

/// Transactions parsed from one file plus the counts needed to report on it
///
/// `total_lines_scanned == transactions_produced + lines_skipped` always holds;
/// the only way to add lines is through [`push`](Self::push) and
/// [`skip`](Self::skip).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionResult {
    pub source: String,
    pub separator: Separator,
    /// 1-based line number of the header among non-empty lines
    pub header_line: usize,
    pub mapping: ColumnMapping,
    pub transactions: Vec<NormalizedTransaction>,
    pub total_lines_scanned: usize,
    pub transactions_produced: usize,
    pub lines_skipped: usize,
    pub skipped: Vec<SkippedLine>,
}

impl IngestionResult {
    pub(crate) fn new(source: String, separator: Separator, header_line: usize, mapping: ColumnMapping) -> Self {
        Self {
            source,
            separator,
            header_line,
            mapping,
            transactions: Vec::new(),
            total_lines_scanned: 0,
            transactions_produced: 0,
            lines_skipped: 0,
            skipped: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, tx: NormalizedTransaction) {
        self.total_lines_scanned += 1;
        self.transactions_produced += 1;
        self.transactions.push(tx);
    }

    pub(crate) fn skip(&mut self, line_number: usize, reason: SkipReason) {
        self.total_lines_scanned += 1;
        self.lines_skipped += 1;
        self.skipped.push(SkippedLine { line_number, reason });
    }

    pub fn skipped_by(&self, reason: SkipReason) -> usize {
        self.skipped.iter().filter(|s| s.reason == reason).count()
    }

    /// Earliest and latest transaction dates, if any rows were produced
    pub fn period(&self) -> Option<(NaiveDate, NaiveDate)> {
        let start = self.transactions.iter().map(|t| t.date).min()?;
        let end = self.transactions.iter().map(|t| t.date).max()?;
        Some((start, end))
    }
}
