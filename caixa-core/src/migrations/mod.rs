//! Ledger database migrations, embedded at compile time
//!
//! Each entry is `(file name, sql)`. `000_migrations.sql` bootstraps the
//! `sys_migrations` tracking table and must stay first.
//!
//! To add a migration, create `NNN_description.sql` next to this file and
//! append it here.

pub const MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
    ("002_default_sources.sql", include_str!("002_default_sources.sql")),
];
