//! Report service - period totals, yearly evolution and CSV export

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::{AuditStatus, ClosingSummary, Direction, Period, Transaction};

/// Total of one category within a period
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub category: String,
    pub amount: Decimal,
    pub count: i64,
    /// False for flows such as owner withdrawals that do not change the result
    pub impacts_result: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSummary {
    pub period: Period,
    pub is_closed: bool,
    pub total_in: Decimal,
    pub total_out: Decimal,
    /// Outgoing amounts in non-impacting categories
    pub total_out_non_impacting: Decimal,
    /// In minus impacting out
    pub result: Decimal,
    pub incoming: Vec<CategoryTotal>,
    pub outgoing: Vec<CategoryTotal>,
    pub transaction_count: i64,
    pub pending_audit_count: i64,
}

/// One month of the yearly series
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPoint {
    pub month: u32,
    pub total_in: Decimal,
    pub total_out: Decimal,
    pub result: Decimal,
    pub transaction_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearEvolution {
    pub year: i32,
    pub months: Vec<MonthlyPoint>,
    pub total_in: Decimal,
    pub total_out: Decimal,
    pub result: Decimal,
}

pub struct ReportService {
    repository: Arc<DuckDbRepository>,
    non_impacting: Vec<String>,
}

impl ReportService {
    pub fn new(repository: Arc<DuckDbRepository>, non_impacting: Vec<String>) -> Self {
        Self {
            repository,
            non_impacting,
        }
    }

    pub fn period_summary(&self, period: Period) -> Result<PeriodSummary> {
        let transactions = self
            .repository
            .get_transactions_by_period(period)
            .context("Failed to load period transactions")?;
        let is_closed = self.repository.is_period_closed(period)?;

        let totals = summarize(&transactions, &self.non_impacting);
        let mut incoming: BTreeMap<String, CategoryTotal> = BTreeMap::new();
        let mut outgoing: BTreeMap<String, CategoryTotal> = BTreeMap::new();

        for tx in &transactions {
            let bucket = match tx.direction {
                Direction::Incoming => &mut incoming,
                Direction::Outgoing => &mut outgoing,
            };
            let entry = bucket.entry(tx.category.clone()).or_insert_with(|| CategoryTotal {
                category: tx.category.clone(),
                amount: Decimal::ZERO,
                count: 0,
                impacts_result: tx.direction == Direction::Incoming
                    || impacts_result(&self.non_impacting, &tx.category),
            });
            entry.amount += tx.amount;
            entry.count += 1;
        }

        Ok(PeriodSummary {
            period,
            is_closed,
            total_in: totals.total_in,
            total_out: totals.total_out,
            total_out_non_impacting: totals.total_out - (totals.total_in - totals.result),
            result: totals.result,
            incoming: sorted_by_amount(incoming),
            outgoing: sorted_by_amount(outgoing),
            transaction_count: totals.transaction_count,
            pending_audit_count: totals.pending_audit_count,
        })
    }

    /// Twelve-month series for `year`; months without rows are zero
    pub fn evolution(&self, year: i32) -> Result<YearEvolution> {
        let transactions = self
            .repository
            .get_transactions_by_year(year)
            .context("Failed to load yearly transactions")?;

        let mut by_month: BTreeMap<u32, Vec<Transaction>> = BTreeMap::new();
        for tx in transactions {
            by_month.entry(tx.month).or_default().push(tx);
        }

        let months: Vec<MonthlyPoint> = (1..=12)
            .map(|month| {
                let totals = by_month
                    .get(&month)
                    .map(|txs| summarize(txs, &self.non_impacting))
                    .unwrap_or_default();
                MonthlyPoint {
                    month,
                    total_in: totals.total_in,
                    total_out: totals.total_out,
                    result: totals.result,
                    transaction_count: totals.transaction_count,
                }
            })
            .collect();

        Ok(YearEvolution {
            year,
            total_in: months.iter().map(|m| m.total_in).sum(),
            total_out: months.iter().map(|m| m.total_out).sum(),
            result: months.iter().map(|m| m.result).sum(),
            months,
        })
    }

    /// Write the period's transactions as CSV, returning the number of rows written
    pub fn export_csv<W: Write>(&self, period: Period, writer: W) -> Result<usize> {
        let transactions = self.repository.get_transactions_by_period(period)?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "date",
            "description",
            "type",
            "amount",
            "category",
            "impacts_result",
            "source",
            "audit_status",
            "observations",
            "transaction_key",
        ])?;

        for tx in &transactions {
            let impacts = tx.direction == Direction::Incoming || impacts_result(&self.non_impacting, &tx.category);
            csv_writer.write_record([
                tx.date.to_string(),
                tx.description.clone(),
                tx.direction.as_str().to_string(),
                format!("{:.2}", tx.amount),
                tx.category.clone(),
                impacts.to_string(),
                tx.source.clone(),
                tx.audit_status.as_str().to_string(),
                tx.observations.clone().unwrap_or_default(),
                tx.transaction_key.clone(),
            ])?;
        }

        csv_writer.flush().context("Failed to write CSV export")?;
        Ok(transactions.len())
    }
}

fn impacts_result(non_impacting: &[String], category: &str) -> bool {
    !non_impacting.iter().any(|c| c.eq_ignore_ascii_case(category))
}

fn sorted_by_amount(map: BTreeMap<String, CategoryTotal>) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = map.into_values().collect();
    totals.sort_by(|a, b| b.amount.cmp(&a.amount).then_with(|| a.category.cmp(&b.category)));
    totals
}

/// Totals of a set of rows
///
/// Incoming rows always count; outgoing rows in a non-impacting category are
/// part of `total_out` but left out of `result`.
pub(crate) fn summarize(transactions: &[Transaction], non_impacting: &[String]) -> ClosingSummary {
    let mut summary = ClosingSummary::default();
    let mut impacting_out = Decimal::ZERO;

    for tx in transactions {
        match tx.direction {
            Direction::Incoming => summary.total_in += tx.amount,
            Direction::Outgoing => {
                summary.total_out += tx.amount;
                if impacts_result(non_impacting, &tx.category) {
                    impacting_out += tx.amount;
                }
            }
        }
        if tx.audit_status == AuditStatus::Pending {
            summary.pending_audit_count += 1;
        }
    }

    summary.transaction_count = transactions.len() as i64;
    summary.result = summary.total_in - impacting_out;
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tx(direction: Direction, amount: i64, category: &str) -> Transaction {
        Transaction::manual(
            format!("k-{}-{}-{}", direction, amount, category),
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            "lançamento",
            Decimal::new(amount, 2),
            direction,
            category,
            "MANUAL",
            None,
        )
    }

    #[test]
    fn test_summarize_excludes_non_impacting_outflows() {
        let non_impacting = vec!["Retirada de lucro".to_string()];
        let rows = vec![
            tx(Direction::Incoming, 100000, "Recebimento Cliente"),
            tx(Direction::Outgoing, 20000, "Aluguel"),
            tx(Direction::Outgoing, 50000, "Retirada de lucro"),
        ];

        let summary = summarize(&rows, &non_impacting);
        assert_eq!(summary.total_in, Decimal::new(100000, 2));
        assert_eq!(summary.total_out, Decimal::new(70000, 2));
        assert_eq!(summary.result, Decimal::new(80000, 2));
        assert_eq!(summary.transaction_count, 3);
        assert_eq!(summary.pending_audit_count, 3);
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&[], &[]);
        assert_eq!(summary, ClosingSummary::default());
    }

    #[test]
    fn test_category_match_ignores_case() {
        let non_impacting = vec!["Aporte de Capital".to_string()];
        assert!(!impacts_result(&non_impacting, "aporte de capital"));
        assert!(impacts_result(&non_impacting, "Outros"));
    }
}
