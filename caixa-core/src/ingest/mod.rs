//! Bank statement ingestion
//!
//! Turns the text of a bank CSV export into normalized transactions with
//! stable keys. The pipeline is pure: no I/O, no shared state, and the same
//! input always yields the same result, so imports of different files can run
//! in parallel freely.
//!
//! Stages, leaves first:
//!
//! 1. [`detect`]: find the header line and the separator
//! 2. [`columns`]: map header cells to semantic fields
//! 3. [`normalize`]: parse each data line (amount, direction, date, seed category)
//! 4. [`key`]: derive the idempotency key
//! 5. [`result`]: collect transactions and skip counts

pub mod categorize;
pub mod columns;
pub mod detect;
mod error;
pub mod key;
pub mod normalize;
mod options;
pub mod result;

pub use categorize::{CategoryRule, CategoryRules};
pub use columns::{AliasTable, ColumnMapping, SemanticField};
pub use detect::{HeaderDetection, Separator};
pub use error::IngestError;
pub use key::{manual_key, normalize_description, statement_key};
pub use options::{DirectionKeywords, IngestOptions};
pub use result::{IngestionResult, NormalizedTransaction, SkipReason, SkippedLine};

use columns::{map_columns, split_record};
use detect::{detect_header, statement_lines};
use normalize::{normalize_row, RowOutcome};

/// Parse a whole statement file
///
/// `source` identifies the institution or channel ("ASAAS", "INTER", ...)
/// and is stored upper-cased. File-level problems are returned as errors;
/// row-level problems are counted on the result.
pub fn ingest_statement(
    content: &str,
    source: &str,
    options: &IngestOptions,
) -> Result<IngestionResult, IngestError> {
    let lines = statement_lines(content);
    if lines.is_empty() {
        return Err(IngestError::EmptyFile);
    }

    let header = detect_header(&lines, options)?;
    let header_cells = split_record(lines[header.line_index], header.separator);
    let mapping = map_columns(&header_cells, &options.aliases)?;

    let source = source.trim().to_uppercase();
    let mut result = IngestionResult::new(
        source.clone(),
        header.separator,
        header.line_index + 1,
        mapping.clone(),
    );

    for (index, line) in lines.iter().enumerate().skip(header.line_index + 1) {
        let line_number = index + 1;
        let fields = split_record(line, header.separator);
        match normalize_row(&fields, line_number, &mapping, &source, options) {
            RowOutcome::Produced(tx) => result.push(tx),
            RowOutcome::Skipped(reason) => result.skip(line_number, reason),
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    const THREE_ROWS: &str = "Data;Descrição;Valor;Tipo\n\
                              15/03/2025;Pagamento Aluguel;1500,00;Débito\n\
                              16/03/2025;Recebimento Cliente;2500,50;Crédito\n\
                              16/03/2025;Saldo anterior;0,00;\n";

    fn ingest(content: &str) -> Result<IngestionResult, IngestError> {
        ingest_statement(content, "asaas", &IngestOptions::default())
    }

    #[test]
    fn test_three_row_statement() {
        let result = ingest(THREE_ROWS).unwrap();

        assert_eq!(result.total_lines_scanned, 3);
        assert_eq!(result.transactions_produced, 2);
        assert_eq!(result.lines_skipped, 1);
        assert_eq!(result.separator, Separator::Semicolon);

        let rent = &result.transactions[0];
        assert_eq!(rent.direction, Direction::Outgoing);
        assert_eq!(rent.amount, Decimal::from_str("1500.00").unwrap());
        assert_eq!(rent.date, NaiveDate::from_ymd_opt(2025, 3, 15).unwrap());
        assert_eq!(rent.category, "Outros");
        assert_eq!(rent.source, "ASAAS");

        let receipt = &result.transactions[1];
        assert_eq!(receipt.direction, Direction::Incoming);
        assert_eq!(receipt.amount, Decimal::from_str("2500.50").unwrap());
        assert_eq!(receipt.date, NaiveDate::from_ymd_opt(2025, 3, 16).unwrap());
        assert_eq!(receipt.category, "Recebimento Cliente");

        assert_eq!(result.skipped, vec![SkippedLine { line_number: 4, reason: SkipReason::NonTransactionalMarker }]);
    }

    #[test]
    fn test_reimport_yields_same_keys() {
        let first = ingest(THREE_ROWS).unwrap();
        let second = ingest(THREE_ROWS).unwrap();
        let keys = |r: &IngestionResult| r.transactions.iter().map(|t| t.transaction_key.clone()).collect::<Vec<_>>();
        assert_eq!(keys(&first), keys(&second));
        assert_ne!(keys(&first)[0], keys(&first)[1]);
    }

    #[test]
    fn test_same_rows_different_layout_same_keys() {
        // A different export of the same events: comma separated, preamble, extra columns
        let other = "Extrato Asaas\n\
                     Identificador,Data,Descrição,Valor,Saldo\n\
                     a1,2025-03-15,\"Pagamento  Aluguel\",-1500.00,100.00\n\
                     a2,2025-03-16,Recebimento Cliente,2500.50,2600.50\n";
        let a = ingest(THREE_ROWS).unwrap();
        let b = ingest(other).unwrap();
        assert_eq!(b.separator, Separator::Comma);
        assert_eq!(a.transactions[0].transaction_key, b.transactions[0].transaction_key);
        assert_eq!(a.transactions[1].transaction_key, b.transactions[1].transaction_key);
        assert_eq!(b.transactions[0].external_id, "a1");
        assert_eq!(b.transactions[1].balance, Decimal::from_str("2600.50").unwrap());
    }

    #[test]
    fn test_counts_reconcile_with_noisy_rows() {
        let content = "Data;Descrição;Valor\n\
                       01/03/2025;Pix;10,00\n\
                       31/02/2025;Data inválida;10,00\n\
                       02/03/2025;Zerado;0,00\n\
                       Total;;\n\
                       03/03/2025;Tarifa;-2,50\n";
        let result = ingest(content).unwrap();
        assert_eq!(result.total_lines_scanned, 5);
        assert_eq!(
            result.total_lines_scanned,
            result.transactions_produced + result.lines_skipped
        );
        assert_eq!(result.transactions_produced, 2);
        assert_eq!(result.skipped_by(SkipReason::InvalidDate), 1);
        assert_eq!(result.skipped_by(SkipReason::ZeroAmount), 1);
        assert_eq!(result.skipped_by(SkipReason::MalformedRow), 1);
        assert_eq!(
            result.period(),
            Some((
                NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
            ))
        );
    }

    #[test]
    fn test_summary_only_file_fails() {
        let err = ingest("Relatório gerado em 01/04/2025\nNenhuma movimentação no período").unwrap_err();
        assert!(matches!(err, IngestError::HeaderNotFound { .. }));
        assert!(err.to_string().contains("could not locate the transaction header"));
    }

    #[test]
    fn test_empty_file_fails() {
        assert_eq!(ingest("\n\n   \r\n").unwrap_err(), IngestError::EmptyFile);
    }

    #[test]
    fn test_header_without_amount_column_fails() {
        let err = ingest("Data;Descrição;Saldo\n01/03/2025;Pix;10,00").unwrap_err();
        assert!(matches!(
            err,
            IngestError::RequiredColumnMissing { field: SemanticField::Amount, .. }
        ));
    }

    #[test]
    fn test_bilingual_preamble_is_not_taken_for_the_header() {
        let content = "Saldo/Balance: 1.000,00;Data/Date: 01/03/2025\n\
                       Data;Descrição;Valor\n\
                       15/03/2025;Pix;10,00\n";
        let result = ingest(content).unwrap();
        assert_eq!(result.header_line, 2);
        assert_eq!(result.transactions_produced, 1);
        assert_eq!(result.transactions[0].amount, Decimal::from_str("10.00").unwrap());
    }

    #[test]
    fn test_header_only_file_has_no_rows() {
        let result = ingest("Data;Descrição;Valor").unwrap();
        assert_eq!(result.total_lines_scanned, 0);
        assert!(result.transactions.is_empty());
        assert_eq!(result.period(), None);
    }
}
