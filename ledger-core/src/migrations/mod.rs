//! Ledger database migrations - embedded SQL files
//!
//! Migrations are compiled into the binary with include_str! and applied in
//! order by the migration service.

/// All migrations, embedded at compile time.
/// Format: (filename, sql_content)
///
/// When adding a migration, create NNN_description.sql and append it here.
pub const MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
    (
        "002_transfer_indexes.sql",
        include_str!("002_transfer_indexes.sql"),
    ),
];
