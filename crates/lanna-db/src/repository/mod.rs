//! # Repository Module
//!
//! Database repository implementations for the purchasing workflow.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Back-office command                                                   │
//! │       │                                                                 │
//! │       │  db.delivery_notes().save_draft(&payload)                      │
//! │       ▼                                                                 │
//! │  DeliveryNoteRepository                                                │
//! │  ├── save_draft(&self, payload)   ← header + delete/reinsert lines     │
//! │  ├── get_by_id(&self, id)                                              │
//! │  └── get_lines(&self, id)                                              │
//! │       │                                                                 │
//! │       │  One transaction per write                                     │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`SupplierRepository`], [`LocationRepository`], [`SkuRepository`] - reference data
//! - [`DeliveryNoteRepository`] - DN draft store and reads
//! - [`TaxInvoiceRepository`] - TI draft store and reads
//! - [`MatchRepository`] - DN/TI line matching
//! - [`DocumentListRepository`] - paginated list screens
//! - [`DocumentEventRepository`] - view-invalidation outbox
//! - [`StockMovementRepository`] - inventory effects of posted DNs
//!
//! [`SupplierRepository`]: reference::SupplierRepository
//! [`LocationRepository`]: reference::LocationRepository
//! [`SkuRepository`]: reference::SkuRepository
//! [`DeliveryNoteRepository`]: delivery_note::DeliveryNoteRepository
//! [`TaxInvoiceRepository`]: tax_invoice::TaxInvoiceRepository
//! [`MatchRepository`]: matching::MatchRepository
//! [`DocumentListRepository`]: listing::DocumentListRepository
//! [`DocumentEventRepository`]: events::DocumentEventRepository
//! [`StockMovementRepository`]: stock::StockMovementRepository

pub mod delivery_note;
pub mod events;
pub mod listing;
pub mod matching;
pub mod reference;
pub mod stock;
pub mod tax_invoice;

use sqlx::{Executor, Sqlite, SqliteConnection};

use crate::error::{DbError, DbResult};
use lanna_core::{CoreError, DocumentKind, DocumentStatus};

// =============================================================================
// Shared Helpers
// =============================================================================

/// Reads a document's status. `None` when the id does not exist.
pub(crate) async fn fetch_status<'e, E>(
    executor: E,
    kind: DocumentKind,
    id: &str,
) -> DbResult<Option<DocumentStatus>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT status FROM {} WHERE id = ?1", kind.header_table());
    let status = sqlx::query_scalar::<_, DocumentStatus>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(status)
}

/// Explains why a conditional `... WHERE status = 'DRAFT'` update touched
/// nothing: the document is missing, or it has left DRAFT.
pub(crate) async fn explain_not_draft(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    id: &str,
) -> DbError {
    match fetch_status(&mut *conn, kind, id).await {
        Ok(None) => DbError::not_found(kind.to_string(), id),
        Ok(Some(status)) => CoreError::NotEditable {
            kind,
            id: id.to_string(),
            status,
        }
        .into(),
        Err(e) => e,
    }
}

/// Counts match records that reference any line of the document.
pub(crate) async fn count_document_matches(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    id: &str,
) -> DbResult<i64> {
    let match_column = match kind {
        DocumentKind::DeliveryNote => "dn_line_id",
        DocumentKind::TaxInvoice => "ti_line_id",
    };
    let sql = format!(
        "SELECT COUNT(*) FROM dn_ti_match m JOIN {} l ON l.id = m.{} WHERE l.{} = ?1",
        kind.line_table(),
        match_column,
        kind.line_parent_column()
    );
    let count: i64 = sqlx::query_scalar(&sql)
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

/// Refuses to touch the lines of a document that matches still reference.
pub(crate) async fn ensure_no_matches(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    id: &str,
) -> DbResult<()> {
    if count_document_matches(conn, kind, id).await? > 0 {
        return Err(CoreError::DocumentHasMatches {
            kind,
            id: id.to_string(),
        }
        .into());
    }
    Ok(())
}

/// True when the error is the UNIQUE index on `idempotency_key`.
pub(crate) fn is_idempotency_conflict(err: &DbError) -> bool {
    matches!(err, DbError::UniqueViolation { field, .. } if field.ends_with("idempotency_key"))
}
