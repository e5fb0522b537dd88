//! Tunables for the ingestion pipeline
//!
//! Everything that encodes knowledge about a particular bank's export format
//! lives here as data, so a new format is onboarded by editing the `ingest`
//! section of settings.json rather than the parser.

use serde::{Deserialize, Serialize};

use super::categorize::CategoryRules;
use super::columns::{AliasTable, SemanticField};

/// Options controlling header detection, column mapping and row normalization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IngestOptions {
    /// How many non-empty lines to inspect when looking for the header
    pub scan_window: usize,
    /// Minimum number of keyword categories a line must hit to be the header
    pub min_header_matches: usize,
    pub header_keywords: HeaderKeywords,
    pub aliases: AliasTable,
    /// Description fragments marking balance/summary rows that are not transactions
    pub skip_markers: Vec<String>,
    pub direction_keywords: DirectionKeywords,
    pub category_rules: CategoryRules,
    /// Description used when the row has no description cell or it is blank
    pub empty_description: String,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            scan_window: 50,
            min_header_matches: 3,
            header_keywords: HeaderKeywords::default(),
            aliases: AliasTable::default(),
            skip_markers: strings(&["saldo anterior", "saldo do dia", "saldo final", "previous balance"]),
            direction_keywords: DirectionKeywords::default(),
            category_rules: CategoryRules::default(),
            empty_description: "Sem descrição".to_string(),
        }
    }
}

/// Header-detection keywords grouped by the field they announce
///
/// Spellings of the same field count once, so "Data" and "Date" on one line
/// are a single hit. Matching is case-insensitive and by substring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeaderKeywords {
    pub date: Vec<String>,
    pub amount: Vec<String>,
    pub description: Vec<String>,
    pub balance: Vec<String>,
    pub external_id: Vec<String>,
}

impl Default for HeaderKeywords {
    fn default() -> Self {
        Self {
            date: strings(&["data", "date"]),
            amount: strings(&["valor", "amount"]),
            description: strings(&["descrição", "descricao", "description"]),
            balance: strings(&["saldo", "balance"]),
            external_id: strings(&["identificador"]),
        }
    }
}

impl HeaderKeywords {
    pub fn categories(&self) -> [(SemanticField, &[String]); 5] {
        [
            (SemanticField::Date, self.date.as_slice()),
            (SemanticField::Amount, self.amount.as_slice()),
            (SemanticField::Description, self.description.as_slice()),
            (SemanticField::Balance, self.balance.as_slice()),
            (SemanticField::ExternalId, self.external_id.as_slice()),
        ]
    }

    /// Every keyword, for error messages
    pub fn all(&self) -> Vec<String> {
        self.categories()
            .iter()
            .flat_map(|(_, words)| words.iter().cloned())
            .collect()
    }
}

/// Keywords searched for in the type column to decide direction
///
/// Incoming keywords are checked first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DirectionKeywords {
    pub incoming: Vec<String>,
    pub outgoing: Vec<String>,
}

impl Default for DirectionKeywords {
    fn default() -> Self {
        Self {
            incoming: strings(&["entrada", "recebimento", "crédito", "credito", "credit"]),
            outgoing: strings(&["saída", "saida", "débito", "debito", "pagamento", "debit"]),
        }
    }
}

pub(crate) fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_keep_defaults() {
        let options: IngestOptions =
            serde_json::from_str(r#"{"scanWindow": 10, "skipMarkers": ["saldo"]}"#).unwrap();
        assert_eq!(options.scan_window, 10);
        assert_eq!(options.skip_markers, vec!["saldo".to_string()]);
        assert_eq!(options.min_header_matches, 3);
        assert!(!options.aliases.date.is_empty());
        assert_eq!(options.header_keywords.balance, vec!["saldo".to_string(), "balance".to_string()]);
    }

    #[test]
    fn test_header_keywords_override_one_category() {
        let options: IngestOptions =
            serde_json::from_str(r#"{"headerKeywords": {"date": ["dt. movimento"]}}"#).unwrap();
        assert_eq!(options.header_keywords.date, vec!["dt. movimento".to_string()]);
        assert!(!options.header_keywords.amount.is_empty());
    }
}
