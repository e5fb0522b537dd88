//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. Services depend
//! only on these traits, not on concrete implementations.

mod categorizer;
mod store;

pub use categorizer::{CategorySuggestion, Categorizer};
pub use store::{SaveOutcome, TransactionStore};
