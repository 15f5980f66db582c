//! # Delivery Note Repository
//!
//! The draft store for delivery notes: one save persists the header and the
//! complete line set.
//!
//! ## Save Draft
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       save_draft(payload)                               │
//! │                                                                         │
//! │  payload.validate()  ── Err → nothing written                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │   ├─ create: INSERT header (status = DRAFT, whatever the payload says) │
//! │   │                                                                     │
//! │   └─ update: UPDATE header ... WHERE id = ? AND status = 'DRAFT'       │
//! │              0 rows → NotFound / NotEditable                           │
//! │              lines matched? → DocumentHasMatches                       │
//! │              DELETE FROM purchase_dn_line WHERE dn_id = ?              │
//! │   │                                                                     │
//! │   ├─ INSERT every submitted line (fresh ids)                           │
//! │   └─ INSERT document_events ('draft_saved')                            │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde_json::json;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::events::record_event;
use super::{ensure_no_matches, explain_not_draft, is_idempotency_conflict};
use crate::error::{DbError, DbResult};
use lanna_core::draft::trimmed_or_none;
use lanna_core::{
    DeliveryNote, DeliveryNoteLine, DnDraftPayload, DocumentEventType, DocumentKind,
    DocumentStatus,
};

const KIND: DocumentKind = DocumentKind::DeliveryNote;

const SELECT_HEADER: &str = r#"
    SELECT id, supplier_id, location_id, doc_no, doc_date, remark, status,
           domain_hint, posted_at, posted_by, voided_at, voided_by,
           created_at, updated_at
    FROM purchase_dn
"#;

/// Repository for delivery note drafts and reads.
#[derive(Debug, Clone)]
pub struct DeliveryNoteRepository {
    pool: SqlitePool,
}

impl DeliveryNoteRepository {
    /// Creates a new DeliveryNoteRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DeliveryNoteRepository { pool }
    }

    /// Saves a delivery note draft (create or update).
    ///
    /// ## Returns
    /// The document id: newly generated on create, the payload's on update.
    /// A create that repeats an earlier `idempotency_key` returns the first
    /// document's id and writes nothing.
    ///
    /// ## Errors
    /// - `Domain(Validation)` - payload rejected, nothing written
    /// - `NotFound` - update of an unknown id
    /// - `Domain(NotEditable)` - update of a POSTED / VOID document
    /// - `Domain(DocumentHasMatches)` - update would delete matched lines
    pub async fn save_draft(&self, payload: &DnDraftPayload) -> DbResult<String> {
        payload.validate()?;

        if let Some(key) = payload.idempotency_key.as_deref().filter(|_| payload.is_create()) {
            if let Some(existing) = self.find_by_idempotency_key(key).await? {
                debug!(id = %existing, "Create repeated with same idempotency key");
                return Ok(existing);
            }
        }

        match self.save_in_transaction(payload).await {
            Err(e) if payload.is_create() && is_idempotency_conflict(&e) => {
                // A concurrent create with the same key committed first.
                let key = payload.idempotency_key.as_deref().unwrap_or_default();
                self.find_by_idempotency_key(key)
                    .await?
                    .ok_or(e)
            }
            other => other,
        }
    }

    async fn save_in_transaction(&self, payload: &DnDraftPayload) -> DbResult<String> {
        let now = Utc::now();
        let doc_no = trimmed_or_none(payload.doc_no.as_deref());
        let remark = trimmed_or_none(payload.remark.as_deref());

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let (id, created) = match payload.id.as_deref() {
            None => {
                let id = Uuid::new_v4().to_string();
                debug!(id = %id, lines = payload.lines.len(), "Creating delivery note draft");

                sqlx::query(
                    r#"
                    INSERT INTO purchase_dn (
                        id, supplier_id, location_id, doc_no, doc_date, remark,
                        status, domain_hint, idempotency_key, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
                    "#,
                )
                .bind(&id)
                .bind(payload.supplier_id.trim())
                .bind(payload.location_id.trim())
                .bind(&doc_no)
                .bind(payload.doc_date)
                .bind(&remark)
                .bind(DocumentStatus::Draft)
                .bind(payload.domain_hint)
                .bind(payload.idempotency_key.as_deref())
                .bind(now)
                .execute(&mut *tx)
                .await?;

                (id, true)
            }
            Some(id) => {
                debug!(id = %id, lines = payload.lines.len(), "Updating delivery note draft");

                let result = sqlx::query(
                    r#"
                    UPDATE purchase_dn SET
                        supplier_id = ?2,
                        location_id = ?3,
                        doc_no = ?4,
                        doc_date = ?5,
                        remark = ?6,
                        domain_hint = ?7,
                        updated_at = ?8
                    WHERE id = ?1 AND status = 'DRAFT'
                    "#,
                )
                .bind(id)
                .bind(payload.supplier_id.trim())
                .bind(payload.location_id.trim())
                .bind(&doc_no)
                .bind(payload.doc_date)
                .bind(&remark)
                .bind(payload.domain_hint)
                .bind(now)
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(explain_not_draft(&mut tx, KIND, id).await);
                }

                ensure_no_matches(&mut tx, KIND, id).await?;

                sqlx::query("DELETE FROM purchase_dn_line WHERE dn_id = ?1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;

                (id.to_string(), false)
            }
        };

        insert_lines(&mut tx, &id, payload).await?;

        record_event(
            &mut tx,
            KIND,
            &id,
            DocumentEventType::DraftSaved,
            &json!({ "created": created, "line_count": payload.lines.len() }),
        )
        .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(id = %id, created, "Delivery note draft saved");
        Ok(id)
    }

    /// Gets a delivery note header by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<DeliveryNote>> {
        let sql = format!("{} WHERE id = ?1", SELECT_HEADER);
        let dn = sqlx::query_as::<_, DeliveryNote>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(dn)
    }

    /// Lines of a delivery note in `line_no` order.
    pub async fn get_lines(&self, dn_id: &str) -> DbResult<Vec<DeliveryNoteLine>> {
        let lines = sqlx::query_as::<_, DeliveryNoteLine>(
            r#"
            SELECT id, dn_id, line_no, sku_id, quantity, provisional_unit_cost
            FROM purchase_dn_line
            WHERE dn_id = ?1
            ORDER BY line_no ASC
            "#,
        )
        .bind(dn_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(lines)
    }

    /// Gets a single line by its id.
    pub async fn get_line(&self, line_id: &str) -> DbResult<Option<DeliveryNoteLine>> {
        let line = sqlx::query_as::<_, DeliveryNoteLine>(
            r#"
            SELECT id, dn_id, line_no, sku_id, quantity, provisional_unit_cost
            FROM purchase_dn_line
            WHERE id = ?1
            "#,
        )
        .bind(line_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(line)
    }

    pub async fn line_count(&self, dn_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM purchase_dn_line WHERE dn_id = ?1")
            .bind(dn_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn find_by_idempotency_key(&self, key: &str) -> DbResult<Option<String>> {
        let id: Option<String> =
            sqlx::query_scalar("SELECT id FROM purchase_dn WHERE idempotency_key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(id)
    }
}

async fn insert_lines(
    conn: &mut SqliteConnection,
    dn_id: &str,
    payload: &DnDraftPayload,
) -> DbResult<()> {
    for line in &payload.lines {
        sqlx::query(
            r#"
            INSERT INTO purchase_dn_line (
                id, dn_id, line_no, sku_id, quantity, provisional_unit_cost
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(dn_id)
        .bind(line.line_no)
        .bind(line.sku_id.trim())
        .bind(line.quantity)
        .bind(line.provisional_unit_cost)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
