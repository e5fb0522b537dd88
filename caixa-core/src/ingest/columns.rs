//! Column mapping: header cells to semantic fields

use std::fmt;

use serde::{Deserialize, Serialize};

use super::detect::Separator;
use super::error::IngestError;
use super::options::strings;

/// A field the normalizer knows how to interpret
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SemanticField {
    Date,
    Amount,
    Description,
    Type,
    Balance,
    ExternalId,
}

impl SemanticField {
    /// Mapping order. A column claimed by an earlier field is not offered to later ones.
    pub const ALL: [SemanticField; 6] = [
        SemanticField::Date,
        SemanticField::Amount,
        SemanticField::Description,
        SemanticField::Type,
        SemanticField::Balance,
        SemanticField::ExternalId,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticField::Date => "date",
            SemanticField::Amount => "amount",
            SemanticField::Description => "description",
            SemanticField::Type => "type",
            SemanticField::Balance => "balance",
            SemanticField::ExternalId => "externalId",
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, SemanticField::Date | SemanticField::Amount)
    }
}

impl fmt::Display for SemanticField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepted header aliases per field, in priority order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AliasTable {
    pub date: Vec<String>,
    pub amount: Vec<String>,
    pub description: Vec<String>,
    #[serde(rename = "type")]
    pub kind: Vec<String>,
    pub balance: Vec<String>,
    pub external_id: Vec<String>,
}

impl Default for AliasTable {
    fn default() -> Self {
        Self {
            date: strings(&["data", "date", "vencimento", "lançamento"]),
            amount: strings(&["valor", "amount", "quantia", "valor bruto", "total"]),
            description: strings(&["descrição", "descricao", "description", "histórico", "historico", "observação"]),
            kind: strings(&["tipo", "type", "evento", "natureza"]),
            balance: strings(&["saldo", "balance"]),
            external_id: strings(&["identificador", "id da transação", "id"]),
        }
    }
}

impl AliasTable {
    pub fn aliases(&self, field: SemanticField) -> &[String] {
        match field {
            SemanticField::Date => &self.date,
            SemanticField::Amount => &self.amount,
            SemanticField::Description => &self.description,
            SemanticField::Type => &self.kind,
            SemanticField::Balance => &self.balance,
            SemanticField::ExternalId => &self.external_id,
        }
    }
}

/// Column index of each semantic field for one file
///
/// `date` and `amount` are always present; a mapping without them cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    pub date: usize,
    pub amount: usize,
    pub description: Option<usize>,
    #[serde(rename = "type")]
    pub kind: Option<usize>,
    pub balance: Option<usize>,
    pub external_id: Option<usize>,
}

impl ColumnMapping {
    pub fn get(&self, field: SemanticField) -> Option<usize> {
        match field {
            SemanticField::Date => Some(self.date),
            SemanticField::Amount => Some(self.amount),
            SemanticField::Description => self.description,
            SemanticField::Type => self.kind,
            SemanticField::Balance => self.balance,
            SemanticField::ExternalId => self.external_id,
        }
    }

    /// Index as a signed number, -1 when the field is absent
    pub fn index_or_sentinel(&self, field: SemanticField) -> i64 {
        self.get(field).map(|i| i as i64).unwrap_or(-1)
    }
}

/// Map header cells to fields: exact alias match first, then substring match
pub fn map_columns(header: &[String], aliases: &AliasTable) -> Result<ColumnMapping, IngestError> {
    let cells: Vec<String> = header.iter().map(|h| h.trim().to_lowercase()).collect();
    let mut claimed = vec![false; cells.len()];
    let mut found: [Option<usize>; 6] = [None; 6];

    for (slot, field) in SemanticField::ALL.iter().enumerate() {
        let names: Vec<String> = aliases.aliases(*field).iter().map(|a| a.to_lowercase()).collect();

        let exact = cells
            .iter()
            .enumerate()
            .find(|(i, cell)| !claimed[*i] && names.iter().any(|n| *cell == n))
            .map(|(i, _)| i);
        let index = exact.or_else(|| {
            cells
                .iter()
                .enumerate()
                .find(|(i, cell)| !claimed[*i] && names.iter().any(|n| cell.contains(n.as_str())))
                .map(|(i, _)| i)
        });

        match index {
            Some(i) => {
                claimed[i] = true;
                found[slot] = Some(i);
            }
            None if field.is_required() => {
                return Err(IngestError::required_column_missing(*field, aliases.aliases(*field)));
            }
            None => {}
        }
    }

    let [date, amount, description, kind, balance, external_id] = found;
    match (date, amount) {
        (Some(date), Some(amount)) => Ok(ColumnMapping {
            date,
            amount,
            description,
            kind,
            balance,
            external_id,
        }),
        (None, _) => Err(IngestError::required_column_missing(SemanticField::Date, &aliases.date)),
        (_, None) => Err(IngestError::required_column_missing(SemanticField::Amount, &aliases.amount)),
    }
}

/// Split one line into trimmed, quote-stripped cells
///
/// Quoted cells may contain the separator. Lines the CSV reader rejects fall
/// back to a plain split.
pub fn split_record(line: &str, separator: Separator) -> Vec<String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(separator.as_byte())
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());

    let fields: Vec<String> = match reader.records().next() {
        Some(Ok(record)) => record.iter().map(|f| f.to_string()).collect(),
        _ => line.split(separator.as_char()).map(|f| f.to_string()).collect(),
    };

    fields
        .into_iter()
        .map(|f| f.trim().replace('"', ""))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_maps_portuguese_header() {
        let mapping = map_columns(
            &header(&["Data", "Identificador", "Descrição", "Valor", "Saldo", "Tipo"]),
            &AliasTable::default(),
        )
        .unwrap();
        assert_eq!(mapping.date, 0);
        assert_eq!(mapping.external_id, Some(1));
        assert_eq!(mapping.description, Some(2));
        assert_eq!(mapping.amount, 3);
        assert_eq!(mapping.balance, Some(4));
        assert_eq!(mapping.kind, Some(5));
    }

    #[test]
    fn test_exact_match_beats_earlier_substring_match() {
        // "Data de crédito" contains "data" but "Data" is an exact hit
        let mapping = map_columns(
            &header(&["Data de crédito", "Data", "Valor"]),
            &AliasTable::default(),
        )
        .unwrap();
        assert_eq!(mapping.date, 1);
    }

    #[test]
    fn test_substring_match_first_column_wins() {
        let mapping = map_columns(
            &header(&["Data movimento", "Data compensação", "Valor líquido"]),
            &AliasTable::default(),
        )
        .unwrap();
        assert_eq!(mapping.date, 0);
        assert_eq!(mapping.amount, 2);
    }

    #[test]
    fn test_claimed_column_not_reused() {
        // taken by amount, so balance must not also point at it
        let mapping = map_columns(
            &header(&["Data", "Descrição", "Valor do saldo"]),
            &AliasTable::default(),
        )
        .unwrap();
        assert_eq!(mapping.amount, 2);
        assert_eq!(mapping.balance, None);
    }

    #[test]
    fn test_optional_fields_absent() {
        let mapping = map_columns(&header(&["data", "valor"]), &AliasTable::default()).unwrap();
        assert_eq!(mapping.description, None);
        assert_eq!(mapping.index_or_sentinel(SemanticField::Description), -1);
        assert_eq!(mapping.index_or_sentinel(SemanticField::Amount), 1);
    }

    #[test]
    fn test_missing_amount_column_names_field() {
        let err = map_columns(&header(&["Data", "Descrição", "Saldo"]), &AliasTable::default()).unwrap_err();
        match &err {
            IngestError::RequiredColumnMissing { field, expected } => {
                assert_eq!(*field, SemanticField::Amount);
                assert!(expected.contains("valor"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().contains("'amount'"));
    }

    #[test]
    fn test_custom_alias_table() {
        let aliases: AliasTable = serde_json::from_str(r#"{"date": ["posted on"], "amount": ["net"]}"#).unwrap();
        let mapping = map_columns(&header(&["Ref", "Posted On", "Net"]), &aliases).unwrap();
        assert_eq!(mapping.date, 1);
        assert_eq!(mapping.amount, 2);
    }

    #[test]
    fn test_split_record_honors_quotes() {
        let cells = split_record("15/03/2025;\"Pix; Fulano\";\"1.500,00\"", Separator::Semicolon);
        assert_eq!(cells, vec!["15/03/2025", "Pix; Fulano", "1.500,00"]);
    }

    #[test]
    fn test_split_record_keeps_trailing_empty_cell() {
        let cells = split_record("16/03/2025;Saldo anterior;0,00;", Separator::Semicolon);
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[3], "");
    }
}
