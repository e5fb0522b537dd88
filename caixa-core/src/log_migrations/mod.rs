//! Migrations for `logs.duckdb`, embedded with include_str!
//!
//! Kept apart from the ledger migrations so the event log can be deleted
//! or rotated without touching business data.

/// `(file name, sql)` pairs, applied in order
pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
];
