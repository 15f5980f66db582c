//! # Status Gate
//!
//! The single entry point for leaving DRAFT.
//!
//! ```text
//! post(kind, id) ──► read status ──► missing?        → NotFound
//!                                    not DRAFT?      → NotEditable (engine untouched)
//!                                    DRAFT           → PostingEngine::post_*
//!
//! void(kind, id) ──► read status ──► (same checks)
//!                    BEGIN
//!                      UPDATE ... status = 'VOID' WHERE status = 'DRAFT'
//!                      matches on any line?          → DocumentHasMatches
//!                      INSERT document_events ('voided')
//!                    COMMIT
//! ```
//!
//! The status read is a fast path for the UI. The conditional update inside
//! the engine (or inside `void`) is what actually guards the transition.

use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbError;
use crate::posting::{finalize, Finalization, PostingEngine, PostingError, PostingResult};
use crate::repository::events::record_event;
use crate::repository::{ensure_no_matches, fetch_status};
use lanna_core::{DocumentEventType, DocumentKind, DocumentStatus};

/// Guards the DRAFT → POSTED and DRAFT → VOID transitions.
#[derive(Debug, Clone)]
pub struct StatusGate<E> {
    pool: SqlitePool,
    engine: E,
}

impl<E: PostingEngine> StatusGate<E> {
    pub fn new(pool: SqlitePool, engine: E) -> Self {
        StatusGate { pool, engine }
    }

    /// Posts a DRAFT document through the engine.
    ///
    /// ## Errors
    /// - `NotFound` - no document with this id
    /// - `NotEditable` - the document is POSTED or VOID; the engine is not called
    /// - `AlreadyFinalized` - another post won the race
    /// - `Rejected` - a posting rule refused the document
    pub async fn post(&self, kind: DocumentKind, id: &str, posted_by: &str) -> PostingResult<()> {
        self.check_transition(kind, id, DocumentStatus::Posted).await?;

        info!(kind = kind.code(), id = %id, posted_by = %posted_by, "Posting document");

        match kind {
            DocumentKind::DeliveryNote => self.engine.post_delivery_note(id, posted_by).await,
            DocumentKind::TaxInvoice => self.engine.post_tax_invoice(id, posted_by).await,
        }
    }

    /// Voids a DRAFT document. Refused while any of its lines is matched.
    pub async fn void(&self, kind: DocumentKind, id: &str, voided_by: &str) -> PostingResult<()> {
        self.check_transition(kind, id, DocumentStatus::Void).await?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        finalize(&mut tx, kind, id, Finalization::Void, voided_by, Utc::now()).await?;
        ensure_no_matches(&mut tx, kind, id).await?;
        record_event(
            &mut tx,
            kind,
            id,
            DocumentEventType::Voided,
            &json!({ "voided_by": voided_by }),
        )
        .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(kind = kind.code(), id = %id, voided_by = %voided_by, "Document voided");
        Ok(())
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    async fn check_transition(
        &self,
        kind: DocumentKind,
        id: &str,
        to: DocumentStatus,
    ) -> PostingResult<()> {
        let status = fetch_status(&self.pool, kind, id)
            .await?
            .ok_or_else(|| PostingError::NotFound {
                kind,
                id: id.to_string(),
            })?;

        if !status.can_transition_to(to) {
            return Err(PostingError::NotEditable {
                kind,
                id: id.to_string(),
                status,
            });
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
