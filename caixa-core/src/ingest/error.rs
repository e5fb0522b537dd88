//! File-level ingestion errors
//!
//! Row-level problems are never errors: they are counted as skips on the
//! [`IngestionResult`](super::IngestionResult). Everything here aborts the
//! whole file and is meant to be shown to the user verbatim.

use thiserror::Error;

use super::columns::SemanticField;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    #[error("file is empty: no non-blank lines found")]
    EmptyFile,

    #[error(
        "could not locate the transaction header in this file \
         (scanned {scanned} lines, expected at least {required} of: {expected})"
    )]
    HeaderNotFound {
        scanned: usize,
        required: usize,
        expected: String,
    },

    #[error("required column '{field}' not found in header (expected a column named like: {expected})")]
    RequiredColumnMissing {
        field: SemanticField,
        expected: String,
    },
}

impl IngestError {
    pub(crate) fn header_not_found(scanned: usize, required: usize, keywords: &[String]) -> Self {
        Self::HeaderNotFound {
            scanned,
            required,
            expected: keywords.join(", "),
        }
    }

    pub(crate) fn required_column_missing(field: SemanticField, aliases: &[String]) -> Self {
        Self::RequiredColumnMissing {
            field,
            expected: aliases.join(", "),
        }
    }
}
