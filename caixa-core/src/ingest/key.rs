//! Transaction keys for idempotent imports
//!
//! The key is derived only from values captured at import time, so later edits
//! to category or observations never change it and re-importing the same
//! statement hits the same rows.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::domain::Direction;

fn whitespace() -> &'static Regex {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    WHITESPACE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Trim, lower-case and collapse internal whitespace to single spaces
pub fn normalize_description(description: &str) -> String {
    whitespace()
        .replace_all(description.trim(), " ")
        .to_lowercase()
}

/// Key for a row that came from a statement file
///
/// Lowercase hex SHA-256 of `SOURCE|YYYY-MM-DD|amount|DIRECTION|description`.
pub fn statement_key(
    source: &str,
    date: NaiveDate,
    amount: Decimal,
    direction: Direction,
    description: &str,
) -> String {
    let material = format!(
        "{}|{}|{:.2}|{}|{}",
        source.trim().to_uppercase(),
        date.format("%Y-%m-%d"),
        amount,
        direction.as_str(),
        normalize_description(description)
    );

    let mut hasher = Sha256::new();
    hasher.update(material.as_bytes());
    hex::encode(hasher.finalize())
}

/// Key for a manually entered row
///
/// There is no captured original to hash, so the same fields are joined into a
/// readable composite key. Resubmitting the same entry yields the same key.
pub fn manual_key(date: NaiveDate, amount: Decimal, direction: Direction, description: &str) -> String {
    format!(
        "MANUAL_{}_{:.2}_{}_{}",
        date.format("%Y-%m-%d"),
        amount,
        direction.as_str(),
        normalize_description(description)
    )
}
