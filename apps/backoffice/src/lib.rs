//! # Lanna Back-Office
//!
//! Purchasing commands called in-process by the Thai back-office web UI.
//!
//! ## Module Organization
//! ```text
//! lanna_backoffice/
//! ├── lib.rs          ◄─── You are here (startup)
//! ├── config.rs       ◄─── BackofficeConfig (file + LANNA_* env)
//! ├── state/
//! │   ├── db.rs       ◄─── Database handle
//! │   └── draft.rs    ◄─── Draft being edited
//! ├── commands/
//! │   ├── purchasing.rs ◄─ Save, fetch, post, void DN / TI
//! │   ├── matching.rs   ◄─ DN ↔ TI matches
//! │   ├── listing.rs    ◄─ DN / TI list screens
//! │   ├── draft.rs      ◄─ Draft editing and submit
//! │   └── events.rs     ◄─ Document event outbox
//! └── error.rs        ◄─── ApiError returned by every command
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. BackofficeConfig::load(None)   defaults → file → LANNA_* env        │
//! │  2. init_tracing(&config)          RUST_LOG wins over logging.filter    │
//! │  3. bootstrap(&config)             open SQLite, run migrations          │
//! │  4. Host keeps DbState + DraftState + config and passes them to         │
//! │     each command                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod state;

use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::EnvFilter;

use config::BackofficeConfig;
use error::ApiResult;
use lanna_db::{Database, DbConfig};
use state::DbState;

/// Initializes the tracing subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages everywhere
/// - `RUST_LOG=lanna=trace` - Trace for lanna crates only
/// - Default: `logging.filter` from the config
///
/// Calling it twice is harmless; the second call is ignored.
pub fn init_tracing(config: &BackofficeConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Opens the database the config points at.
pub async fn bootstrap(config: &BackofficeConfig) -> ApiResult<DbState> {
    let db_path = get_database_path(config)?;
    info!(?db_path, "Database path determined");

    let db = Database::new(
        DbConfig::new(db_path).max_connections(config.database.max_connections),
    )
    .await?;

    info!("Database connected and migrations applied");
    Ok(DbState::new(db))
}

/// Resolves the database file.
///
/// `LANNA_DB_PATH` (or `database.path`) wins; otherwise the platform data
/// directory is used and created if missing.
pub fn get_database_path(config: &BackofficeConfig) -> ApiResult<PathBuf> {
    Ok(config.database_path()?)
}
