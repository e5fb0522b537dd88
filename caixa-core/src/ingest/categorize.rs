//! Seed categorization applied at import time
//!
//! Only a starting point: users and the remote categorizer may overwrite it.

use serde::{Deserialize, Serialize};

use crate::domain::Direction;

use super::options::strings;

/// One keyword rule: any keyword found in the description selects `category`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub keywords: Vec<String>,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryRules {
    /// Checked in order; first hit wins
    pub rules: Vec<CategoryRule>,
    pub incoming_default: String,
    pub outgoing_default: String,
}

impl Default for CategoryRules {
    fn default() -> Self {
        Self {
            rules: vec![
                CategoryRule {
                    keywords: strings(&["taxa", "tarifa"]),
                    category: "Taxas e Tarifas".to_string(),
                },
                CategoryRule {
                    keywords: strings(&["repasse"]),
                    category: "Repasses".to_string(),
                },
            ],
            incoming_default: "Recebimento Cliente".to_string(),
            outgoing_default: "Outros".to_string(),
        }
    }
}

impl CategoryRules {
    pub fn seed_category(&self, description: &str, direction: Direction) -> &str {
        let description = description.to_lowercase();
        self.rules
            .iter()
            .find(|rule| {
                rule.keywords
                    .iter()
                    .any(|k| description.contains(&k.to_lowercase()))
            })
            .map(|rule| rule.category.as_str())
            .unwrap_or(match direction {
                Direction::Incoming => self.incoming_default.as_str(),
                Direction::Outgoing => self.outgoing_default.as_str(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_keyword_wins_over_direction() {
        let rules = CategoryRules::default();
        assert_eq!(rules.seed_category("Tarifa PIX", Direction::Outgoing), "Taxas e Tarifas");
        assert_eq!(rules.seed_category("Estorno de TAXA", Direction::Incoming), "Taxas e Tarifas");
    }

    #[test]
    fn test_direction_fallback() {
        let rules = CategoryRules::default();
        assert_eq!(rules.seed_category("Repasse mensal", Direction::Incoming), "Repasses");
        assert_eq!(rules.seed_category("Pix recebido", Direction::Incoming), "Recebimento Cliente");
        assert_eq!(rules.seed_category("Pagamento Aluguel", Direction::Outgoing), "Outros");
    }
}
