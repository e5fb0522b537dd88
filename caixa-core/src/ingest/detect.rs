//! Header and delimiter detection
//!
//! Bank exports often carry a preamble (account holder, period, opening
//! balance) before the real header, so the header is located by keyword
//! density instead of assuming row 0.

use serde::{Deserialize, Serialize};

use super::columns::SemanticField;
use super::error::IngestError;
use super::options::{HeaderKeywords, IngestOptions};

/// Field separator of a statement file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Separator {
    Semicolon,
    Comma,
}

impl Separator {
    pub fn as_char(&self) -> char {
        match self {
            Separator::Semicolon => ';',
            Separator::Comma => ',',
        }
    }

    pub fn as_byte(&self) -> u8 {
        self.as_char() as u8
    }

    /// Pick the separator occurring more often in `line`; ties go to comma
    pub fn infer(line: &str) -> Self {
        let semicolons = line.matches(';').count();
        let commas = line.matches(',').count();
        if semicolons > commas {
            Separator::Semicolon
        } else {
            Separator::Comma
        }
    }
}

/// Where the header was found
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderDetection {
    /// Index into the non-empty line list
    pub line_index: usize,
    pub separator: Separator,
    /// Keyword categories present on the header line
    pub matched_fields: Vec<SemanticField>,
}

/// Split raw content into trimmed, non-empty lines
pub fn statement_lines(content: &str) -> Vec<&str> {
    content
        .trim_start_matches('\u{feff}')
        .split('\n')
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Locate the header line within the scan window
pub fn detect_header(lines: &[&str], options: &IngestOptions) -> Result<HeaderDetection, IngestError> {
    if lines.is_empty() {
        return Err(IngestError::EmptyFile);
    }

    let window = lines.len().min(options.scan_window);
    for (index, line) in lines.iter().take(window).enumerate() {
        let matched = [Separator::Semicolon, Separator::Comma]
            .iter()
            .map(|sep| matched_fields(line, *sep, &options.header_keywords))
            .max_by_key(|m| m.len())
            .unwrap_or_default();

        if matched.len() >= options.min_header_matches {
            return Ok(HeaderDetection {
                line_index: index,
                separator: Separator::infer(line),
                matched_fields: matched,
            });
        }
    }

    Err(IngestError::header_not_found(
        window,
        options.min_header_matches,
        &options.header_keywords.all(),
    ))
}

/// Categories with at least one keyword in some cell of `line`
fn matched_fields(line: &str, separator: Separator, keywords: &HeaderKeywords) -> Vec<SemanticField> {
    let cells: Vec<String> = line
        .split(separator.as_char())
        .map(|c| c.trim().trim_matches('"').to_lowercase())
        .collect();

    keywords
        .categories()
        .into_iter()
        .filter(|(_, words)| {
            words.iter().any(|k| {
                let k = k.to_lowercase();
                cells.iter().any(|c| c.contains(&k))
            })
        })
        .map(|(field, _)| field)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(content: &str) -> Result<HeaderDetection, IngestError> {
        let lines = statement_lines(content);
        detect_header(&lines, &IngestOptions::default())
    }

    #[test]
    fn test_semicolon_header() {
        let found = detect("Data;Descrição;Valor").unwrap();
        assert_eq!(found.separator, Separator::Semicolon);
        assert_eq!(found.line_index, 0);
    }

    #[test]
    fn test_comma_header() {
        let found = detect("Data,Descrição,Valor").unwrap();
        assert_eq!(found.separator, Separator::Comma);
    }

    #[test]
    fn test_header_after_preamble() {
        let content = "Extrato da conta\r\nPeríodo: 01/03/2025 a 31/03/2025\r\n\r\n\
                       Data;Identificador;Descrição;Valor;Saldo\r\n\
                       15/03/2025;abc;Pix;10,00;10,00\r\n";
        let found = detect(content).unwrap();
        assert_eq!(found.line_index, 2);
        assert_eq!(found.separator, Separator::Semicolon);
        assert!(found.matched_fields.contains(&SemanticField::Balance));
        assert!(found.matched_fields.contains(&SemanticField::ExternalId));
    }

    #[test]
    fn test_synonyms_of_one_category_count_once() {
        let content = "Saldo/Balance: 1.000,00;Data/Date: 01/03/2025\n\
                       Data;Descrição;Valor\n\
                       15/03/2025;Pix;10,00\n";
        let found = detect(content).unwrap();
        assert_eq!(found.line_index, 1);
        assert_eq!(
            found.matched_fields,
            vec![SemanticField::Date, SemanticField::Amount, SemanticField::Description]
        );
    }

    #[test]
    fn test_line_with_two_categories_is_not_a_header() {
        let err = detect("Data;Date;Data do pagamento;Saldo;Balance").unwrap_err();
        assert!(matches!(err, IngestError::HeaderNotFound { scanned: 1, required: 3, .. }));
    }

    #[test]
    fn test_separator_majority_wins_over_commas_inside_cells() {
        let found = detect("Data;Descrição;Valor (R$, bruto);Saldo").unwrap();
        assert_eq!(found.separator, Separator::Semicolon);
    }

    #[test]
    fn test_summary_only_file_has_no_header() {
        let err = detect("Resumo do mês\nTotal de entradas: 10\nTotal de saídas: 5").unwrap_err();
        match err {
            IngestError::HeaderNotFound { scanned, required, expected } => {
                assert_eq!(scanned, 3);
                assert_eq!(required, 3);
                assert!(expected.contains("valor"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_header_outside_scan_window_is_not_found() {
        let mut content = String::new();
        for i in 0..60 {
            content.push_str(&format!("preambulo {}\n", i));
        }
        content.push_str("Data;Descrição;Valor\n");
        assert!(matches!(detect(&content), Err(IngestError::HeaderNotFound { scanned: 50, .. })));
    }

    #[test]
    fn test_blank_content_is_empty_file() {
        assert_eq!(detect("  \n\r\n   ").unwrap_err(), IngestError::EmptyFile);
    }

    #[test]
    fn test_statement_lines_strips_bom_and_blank_lines() {
        let lines = statement_lines("\u{feff}a;b\r\n\r\n  c;d  \n");
        assert_eq!(lines, vec!["a;b", "c;d"]);
    }
}
