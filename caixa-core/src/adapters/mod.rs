//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the TransactionStore port (and all other persistence)
//! - HTTP and keyword-rule implementations of the Categorizer port

pub mod categorizer;
pub mod duckdb;
