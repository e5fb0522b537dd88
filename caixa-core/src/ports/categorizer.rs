//! Category suggestion port

use serde::{Deserialize, Serialize};

use crate::domain::Direction;

/// Category proposed for a description, with a 0-100 confidence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySuggestion {
    pub category: String,
    pub confidence: u8,
}

impl CategorySuggestion {
    pub fn new(category: impl Into<String>, confidence: u8) -> Self {
        Self {
            category: category.into(),
            confidence: confidence.min(100),
        }
    }
}

/// Something that can propose a category for a ledger row
///
/// Implementations never fail: when they cannot decide they return their
/// fallback suggestion.
pub trait Categorizer: Send + Sync {
    /// Short name shown in logs ("rules", "http")
    fn name(&self) -> &str;

    fn suggest(&self, description: &str, direction: Direction) -> CategorySuggestion;
}
