//! # Database Migrations
//!
//! Embedded SQL migrations for the back-office database.
//!
//! ## Schema
//! ```text
//! migrations/sqlite/
//! ├── 001_reference_data.sql       suppliers, locations, skus
//! ├── 002_purchase_documents.sql   purchase_dn(_line), purchase_ti(_line)
//! ├── 003_matching_and_stock.sql   dn_ti_match, stock_movements
//! ├── 004_document_events.sql      view-invalidation outbox
//! └── 005_list_views.sql           v_dn_list, v_ti_list
//! ```
//!
//! Applied migrations are tracked in `_sqlx_migrations`. Never edit an
//! applied file; add the next number instead.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Embedded at compile time by `sqlx::migrate!`; no runtime file access.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending migrations in filename order, each in its own
/// transaction.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// Returns `(embedded, applied)` migration counts, for diagnostics.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let tracked: Option<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_optional(pool)
    .await?;

    if tracked.is_none() {
        return Ok((total, 0));
    }

    let applied: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?;

    Ok((total, applied as usize))
}
