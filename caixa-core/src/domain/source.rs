//! Statement sources (banks, payment gateways, manual entry)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source of manually entered rows
pub const MANUAL_SOURCE: &str = "MANUAL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Source {
    pub fn new(name: &str) -> Self {
        Self {
            id: Self::id_for(name),
            name: name.trim().to_string(),
            created_at: Utc::now(),
        }
    }

    /// Upper-cased name with runs of whitespace replaced by `_`
    pub fn id_for(name: &str) -> String {
        name.split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .to_uppercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_id() {
        assert_eq!(Source::id_for("  Banco   Inter "), "BANCO_INTER");
        assert_eq!(Source::new("asaas").id, "ASAAS");
    }
}
