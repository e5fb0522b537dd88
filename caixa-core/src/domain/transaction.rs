//! Transaction domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::period::Period;
use super::result::Error;
use crate::ingest::NormalizedTransaction;

/// Money flow direction; amounts are always stored positive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Incoming => "INCOMING",
            Direction::Outgoing => "OUTGOING",
        }
    }

    /// Signed value of `amount` for this direction
    pub fn signed(&self, amount: Decimal) -> Decimal {
        match self {
            Direction::Incoming => amount,
            Direction::Outgoing => -amount,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "INCOMING" | "IN" | "ENTRADA" => Ok(Direction::Incoming),
            "OUTGOING" | "OUT" | "SAIDA" | "SAÍDA" => Ok(Direction::Outgoing),
            other => Err(Error::validation(format!("unknown direction: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Confirmed,
    Pending,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Confirmed => "CONFIRMED",
            TransactionStatus::Pending => "PENDING",
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONFIRMED" => Ok(TransactionStatus::Confirmed),
            "PENDING" => Ok(TransactionStatus::Pending),
            other => Err(Error::validation(format!("unknown transaction status: {}", other))),
        }
    }
}

/// Review state; finalizing a period marks everything in it audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    Pending,
    Audited,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Pending => "PENDING",
            AuditStatus::Audited => "AUDITED",
        }
    }
}

impl FromStr for AuditStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(AuditStatus::Pending),
            "AUDITED" => Ok(AuditStatus::Audited),
            other => Err(Error::validation(format!("unknown audit status: {}", other))),
        }
    }
}

/// A ledger row
///
/// `transaction_key` is the immutable natural key. The `original_*` fields
/// keep what was captured at creation so edits can always be compared with
/// the source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub transaction_key: String,
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub direction: Direction,
    pub category: String,
    pub source: String,
    pub month: u32,
    pub year: i32,
    pub confidence_score: u8,
    pub status: TransactionStatus,
    pub audit_status: AuditStatus,
    pub observations: Option<String>,
    pub external_id: Option<String>,
    pub balance: Decimal,

    // =========================================================================
    // Captured values
    // =========================================================================
    pub original_date: NaiveDate,
    pub original_description: String,
    pub original_amount: Decimal,
    pub original_category: String,

    // =========================================================================
    // Provenance
    // =========================================================================
    /// Import job that created this row (None for manual entries)
    pub import_id: Option<Uuid>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Build a ledger row from a parsed statement line
    pub fn from_statement(tx: &NormalizedTransaction, import_id: Uuid, created_by: Option<&str>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            transaction_key: tx.transaction_key.clone(),
            date: tx.date,
            description: tx.description.clone(),
            amount: tx.amount,
            direction: tx.direction,
            category: tx.category.clone(),
            source: tx.source.clone(),
            month: tx.month,
            year: tx.year,
            confidence_score: tx.confidence_score,
            status: TransactionStatus::Confirmed,
            audit_status: AuditStatus::Pending,
            observations: None,
            external_id: Some(tx.external_id.clone()),
            balance: tx.balance,
            original_date: tx.date,
            original_description: tx.description.clone(),
            original_amount: tx.amount,
            original_category: tx.category.clone(),
            import_id: Some(import_id),
            created_by: created_by.map(|s| s.to_string()),
            updated_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Build a manually entered ledger row
    #[allow(clippy::too_many_arguments)]
    pub fn manual(
        transaction_key: String,
        date: NaiveDate,
        description: &str,
        amount: Decimal,
        direction: Direction,
        category: &str,
        source: &str,
        created_by: Option<&str>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            transaction_key,
            date,
            description: description.trim().to_string(),
            amount,
            direction,
            category: category.to_string(),
            source: source.to_string(),
            month: date.month(),
            year: date.year(),
            confidence_score: 100,
            status: TransactionStatus::Confirmed,
            audit_status: AuditStatus::Pending,
            observations: None,
            external_id: None,
            balance: Decimal::ZERO,
            original_date: date,
            original_description: description.trim().to_string(),
            original_amount: amount,
            original_category: category.to_string(),
            import_id: None,
            created_by: created_by.map(|s| s.to_string()),
            updated_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn period(&self) -> Period {
        Period::from_date(self.date)
    }

    /// Amount with sign applied (incoming positive, outgoing negative)
    pub fn signed_amount(&self) -> Decimal {
        self.direction.signed(self.amount)
    }

    /// True when category differs from what was captured on creation
    pub fn is_recategorized(&self) -> bool {
        self.category != self.original_category
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{ingest_statement, IngestOptions};

    #[test]
    fn test_from_statement_captures_originals() {
        let result = ingest_statement(
            "Data;Descrição;Valor\n15/03/2025;Tarifa Pix;-1,99",
            "asaas",
            &IngestOptions::default(),
        )
        .unwrap();
        let import_id = Uuid::new_v4();
        let tx = Transaction::from_statement(&result.transactions[0], import_id, Some("ana@escritorio.com"));

        assert_eq!(tx.transaction_key, result.transactions[0].transaction_key);
        assert_eq!(tx.original_amount, tx.amount);
        assert_eq!(tx.original_category, "Taxas e Tarifas");
        assert_eq!(tx.audit_status, AuditStatus::Pending);
        assert_eq!(tx.import_id, Some(import_id));
        assert_eq!(tx.period().key(), "2025-03");
        assert_eq!(tx.signed_amount(), Decimal::new(-199, 2));
        assert!(!tx.is_recategorized());
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!("incoming".parse::<Direction>().unwrap(), Direction::Incoming);
        assert_eq!("saída".parse::<Direction>().unwrap(), Direction::Outgoing);
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn test_direction_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&Direction::Outgoing).unwrap(), "\"OUTGOING\"");
    }
}
