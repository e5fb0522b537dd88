//! Row normalization: one raw statement line to one transaction or one skip

use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::Direction;

use super::columns::ColumnMapping;
use super::key::statement_key;
use super::options::{DirectionKeywords, IngestOptions};
use super::result::{NormalizedTransaction, SkipReason};

/// Confidence for rows whose direction was read from a type column
pub const EXPLICIT_CONFIDENCE: u8 = 100;
/// Confidence for rows whose direction was guessed from the amount sign
pub const INFERRED_CONFIDENCE: u8 = 80;

/// Outcome of normalizing one line
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Produced(NormalizedTransaction),
    Skipped(SkipReason),
}

pub fn normalize_row(
    fields: &[String],
    line_number: usize,
    mapping: &ColumnMapping,
    source: &str,
    options: &IngestOptions,
) -> RowOutcome {
    let date_cell = cell(fields, Some(mapping.date));
    let amount_cell = cell(fields, Some(mapping.amount));
    let (date_raw, amount_raw) = match (date_cell, amount_cell) {
        (Some(d), Some(a)) => (d, a),
        _ => return RowOutcome::Skipped(SkipReason::MalformedRow),
    };

    let description = cell(fields, mapping.description)
        .map(|d| d.to_string())
        .unwrap_or_else(|| options.empty_description.clone());

    if is_marker_row(&description, &options.skip_markers) {
        return RowOutcome::Skipped(SkipReason::NonTransactionalMarker);
    }

    let raw_amount = parse_currency(amount_raw);
    let amount = round_cents(raw_amount.abs());
    if amount.is_zero() {
        return RowOutcome::Skipped(SkipReason::ZeroAmount);
    }

    let date = match parse_statement_date(date_raw) {
        Some(d) => d,
        None => return RowOutcome::Skipped(SkipReason::InvalidDate),
    };

    let (direction, explicit) =
        infer_direction(cell(fields, mapping.kind), raw_amount, &options.direction_keywords);

    let category = options
        .category_rules
        .seed_category(&description, direction)
        .to_string();

    let external_id = cell(fields, mapping.external_id)
        .map(|id| id.to_string())
        .unwrap_or_else(|| {
            let prefix: String = description.chars().take(10).collect();
            format!("GEN_{}_{:.2}_{}", date.format("%Y-%m-%d"), amount, prefix)
        });

    let balance = cell(fields, mapping.balance).map(parse_currency).unwrap_or(Decimal::ZERO);

    RowOutcome::Produced(NormalizedTransaction {
        transaction_key: statement_key(source, date, amount, direction, &description),
        date,
        description,
        amount,
        direction,
        category,
        source: source.to_string(),
        month: date.month(),
        year: date.year(),
        confidence_score: if explicit { EXPLICIT_CONFIDENCE } else { INFERRED_CONFIDENCE },
        external_id,
        balance,
        line_number,
    })
}

/// Non-blank trimmed cell at `index`
fn cell(fields: &[String], index: Option<usize>) -> Option<&str> {
    index
        .and_then(|i| fields.get(i))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

fn is_marker_row(description: &str, markers: &[String]) -> bool {
    let description = description.trim().to_lowercase();
    markers
        .iter()
        .any(|m| description.contains(&m.to_lowercase()))
}

/// Round to cents, halves away from zero (2,125 becomes 2,13)
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Parse a locale-formatted currency amount
///
/// Accepts Brazilian (`1.234,56`) and plain (`1234.56`) notations, currency
/// symbols, a minus sign anywhere in the cell and accounting parentheses. Anything
/// unparseable is zero.
pub fn parse_currency(raw: &str) -> Decimal {
    let trimmed = raw.trim();
    let parenthesized = trimmed.starts_with('(') && trimmed.ends_with(')');
    let negative = parenthesized || trimmed.contains('-');

    let digits: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();

    let normalized = if digits.contains('.') && digits.contains(',') {
        digits.replace('.', "").replace(',', ".")
    } else if digits.contains(',') {
        digits.replace(',', ".")
    } else {
        digits
    };

    match Decimal::from_str(&normalized) {
        Ok(value) if negative => -value,
        Ok(value) => value,
        Err(_) => Decimal::ZERO,
    }
}

/// Parse `D/M/YYYY`, `YYYY-M-D` and mixed-separator variants
pub fn parse_statement_date(raw: &str) -> Option<NaiveDate> {
    // Ignore a trailing time component ("15/03/2025 10:22:31")
    let date_part = raw.trim().split_whitespace().next()?;
    let parts: Vec<&str> = date_part.split(|c: char| c == '/' || c == '-').collect();
    if parts.len() != 3 {
        return None;
    }

    let numbers: Vec<u32> = parts
        .iter()
        .map(|p| p.trim().parse::<u32>().ok())
        .collect::<Option<Vec<_>>>()?;

    let (year, month, day) = if parts[0].trim().len() == 4 {
        (numbers[0], numbers[1], numbers[2])
    } else {
        (numbers[2], numbers[1], numbers[0])
    };

    NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
}

/// Decide direction from the type column, falling back to the amount sign
///
/// Returns the direction and whether it came from an explicit type keyword.
pub fn infer_direction(
    type_text: Option<&str>,
    raw_amount: Decimal,
    keywords: &DirectionKeywords,
) -> (Direction, bool) {
    if let Some(text) = type_text {
        let text = text.to_lowercase();
        let hit = |list: &[String]| list.iter().any(|k| text.contains(&k.to_lowercase()));
        if hit(keywords.incoming.as_slice()) {
            return (Direction::Incoming, true);
        }
        if hit(keywords.outgoing.as_slice()) {
            return (Direction::Outgoing, true);
        }
    }

    if raw_amount > Decimal::ZERO {
        (Direction::Incoming, false)
    } else {
        (Direction::Outgoing, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn mapping_with_type() -> ColumnMapping {
        ColumnMapping {
            date: 0,
            amount: 2,
            description: Some(1),
            kind: Some(3),
            balance: None,
            external_id: None,
        }
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn produce(cells: &[&str]) -> NormalizedTransaction {
        match normalize_row(&row(cells), 2, &mapping_with_type(), "ASAAS", &IngestOptions::default()) {
            RowOutcome::Produced(tx) => tx,
            RowOutcome::Skipped(reason) => panic!("row skipped: {:?}", reason),
        }
    }

    fn skip(cells: &[&str]) -> SkipReason {
        match normalize_row(&row(cells), 2, &mapping_with_type(), "ASAAS", &IngestOptions::default()) {
            RowOutcome::Skipped(reason) => reason,
            RowOutcome::Produced(tx) => panic!("row produced: {:?}", tx),
        }
    }

    #[test]
    fn test_parse_currency_brazilian() {
        assert_eq!(parse_currency("1.500,00"), dec("1500.00"));
        assert_eq!(parse_currency("R$ 2.500,50"), dec("2500.50"));
        assert_eq!(parse_currency("-1.234.567,89"), dec("-1234567.89"));
        assert_eq!(parse_currency("10,5"), dec("10.5"));
    }

    #[test]
    fn test_parse_currency_plain_and_signs() {
        assert_eq!(parse_currency("1234.56"), dec("1234.56"));
        assert_eq!(parse_currency("(45,00)"), dec("-45.00"));
        assert_eq!(parse_currency("45,00-"), dec("-45.00"));
        assert_eq!(parse_currency("+12"), dec("12"));
        assert_eq!(parse_currency("R$ -50,00"), dec("-50.00"));
    }

    #[test]
    fn test_parse_currency_garbage_is_zero() {
        assert_eq!(parse_currency(""), Decimal::ZERO);
        assert_eq!(parse_currency("n/a"), Decimal::ZERO);
        assert_eq!(parse_currency("1.2.3"), Decimal::ZERO);
    }

    #[test]
    fn test_dates_normalize_to_iso() {
        assert_eq!(parse_statement_date("15/03/2025"), Some(date("2025-03-15")));
        assert_eq!(parse_statement_date("2025-03-15"), Some(date("2025-03-15")));
        assert_eq!(parse_statement_date("5-3-2025"), Some(date("2025-03-05")));
        assert_eq!(parse_statement_date("15/03/2025 10:22:31"), Some(date("2025-03-15")));
    }

    #[test]
    fn test_invalid_dates_rejected() {
        assert_eq!(parse_statement_date("31/02/2025"), None);
        assert_eq!(parse_statement_date("15/03"), None);
        assert_eq!(parse_statement_date("aa/03/2025"), None);
        assert_eq!(parse_statement_date("2025/13/01"), None);
    }

    #[test]
    fn test_explicit_incoming_with_negative_amount() {
        let tx = produce(&["15/03/2025", "Estorno", "-50,00", "Entrada"]);
        assert_eq!(tx.direction, Direction::Incoming);
        assert_eq!(tx.amount, dec("50.00"));
        assert_eq!(tx.confidence_score, EXPLICIT_CONFIDENCE);
    }

    #[test]
    fn test_direction_from_sign_when_type_unrecognized() {
        let tx = produce(&["15/03/2025", "Ajuste", "-12,00", "Outro"]);
        assert_eq!(tx.direction, Direction::Outgoing);
        assert_eq!(tx.amount, dec("12.00"));
        assert_eq!(tx.confidence_score, INFERRED_CONFIDENCE);
    }

    #[test]
    fn test_month_and_year_follow_date() {
        let tx = produce(&["2024-12-31", "Tarifa bancária", "9,90", "Débito"]);
        assert_eq!((tx.year, tx.month), (2024, 12));
        assert_eq!(tx.category, "Taxas e Tarifas");
    }

    #[test]
    fn test_missing_description_uses_default() {
        let tx = produce(&["15/03/2025", "", "10,00", "Crédito"]);
        assert_eq!(tx.description, "Sem descrição");
        assert!(tx.external_id.starts_with("GEN_2025-03-15_10.00_Sem descri"));
    }

    #[test]
    fn test_skip_reasons() {
        assert_eq!(skip(&["16/03/2025", "Saldo anterior", "100,00", ""]), SkipReason::NonTransactionalMarker);
        assert_eq!(skip(&["16/03/2025", "Pix", "0,00", "Crédito"]), SkipReason::ZeroAmount);
        assert_eq!(skip(&["16/03/2025", "Pix", "abc", "Crédito"]), SkipReason::ZeroAmount);
        assert_eq!(skip(&["32/03/2025", "Pix", "10,00", "Crédito"]), SkipReason::InvalidDate);
        assert_eq!(skip(&["Total"]), SkipReason::MalformedRow);
        assert_eq!(skip(&["", "Pix", "10,00", "Crédito"]), SkipReason::MalformedRow);
    }

    #[test]
    fn test_sub_cent_amount_is_zero() {
        assert_eq!(skip(&["16/03/2025", "Pix", "0,001", "Crédito"]), SkipReason::ZeroAmount);
    }

    #[test]
    fn test_half_cent_rounds_up() {
        assert_eq!(produce(&["16/03/2025", "Pix", "2,125", "Crédito"]).amount, dec("2.13"));
        assert_eq!(produce(&["16/03/2025", "Pix", "-2,125", ""]).amount, dec("2.13"));
        assert_eq!(produce(&["16/03/2025", "Pix", "0,005", "Crédito"]).amount, dec("0.01"));
        assert_eq!(round_cents(dec("-1.005")), dec("-1.01"));
    }
}
