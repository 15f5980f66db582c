//! # Database State
//!
//! Wraps the `Database` for use in commands.
//!
//! The `SqlitePool` inside `Database` is thread-safe, so commands run
//! queries concurrently without extra locking.
//!
//! ## Usage in Commands
//! ```rust,ignore
//! pub async fn get_dn(db: &DbState, id: &str) -> ApiResult<DeliveryNoteDto> {
//!     let dn = db.inner().delivery_notes().get_by_id(id).await?;
//!     ...
//! }
//! ```

use lanna_db::Database;

/// Database handle shared by all commands.
#[derive(Debug, Clone)]
pub struct DbState {
    db: Database,
}

impl DbState {
    pub fn new(db: Database) -> Self {
        DbState { db }
    }

    pub fn inner(&self) -> &Database {
        &self.db
    }
}
