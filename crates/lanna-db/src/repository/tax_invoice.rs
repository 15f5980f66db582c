//! # Tax Invoice Repository
//!
//! The draft store for tax invoices. Same save cycle as delivery notes
//! (see [`delivery_note`](super::delivery_note)); the header additionally
//! carries discount, freight and other-charge amounts, and lines carry a firm
//! unit cost, a line discount and a tax rate.
//!
//! Totals are not computed here. They are written by the posting engine.

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
    DocumentEventType, DocumentKind, DocumentStatus, TaxInvoice, TaxInvoiceLine, TiDraftPayload,
};

const KIND: DocumentKind = DocumentKind::TaxInvoice;

const SELECT_HEADER: &str = r#"
    SELECT id, supplier_id, location_id, doc_no, doc_date, remark, status,
           discount_amount, freight_amount, other_charge_amount,
           subtotal_amount, vat_amount, grand_total_amount,
           posted_at, posted_by, voided_at, voided_by, created_at, updated_at
    FROM purchase_ti
"#;

const SELECT_LINE: &str = r#"
    SELECT id, ti_id, line_no, sku_id, quantity, unit_cost, line_discount, tax_rate
    FROM purchase_ti_line
"#;

/// Repository for tax invoice drafts and reads.
#[derive(Debug, Clone)]
pub struct TaxInvoiceRepository {
    pool: SqlitePool,
}

impl TaxInvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TaxInvoiceRepository { pool }
    }

    /// Saves a tax invoice draft (create or update).
    ///
    /// Same contract as
    /// [`DeliveryNoteRepository::save_draft`](super::delivery_note::DeliveryNoteRepository::save_draft).
    pub async fn save_draft(&self, payload: &TiDraftPayload) -> DbResult<String> {
        payload.validate()?;

        if let Some(key) = payload.idempotency_key.as_deref().filter(|_| payload.is_create()) {
            if let Some(existing) = self.find_by_idempotency_key(key).await? {
                debug!(id = %existing, "Create repeated with same idempotency key");
                return Ok(existing);
            }
        }

        match self.save_in_transaction(payload).await {
            Err(e) if payload.is_create() && is_idempotency_conflict(&e) => {
                let key = payload.idempotency_key.as_deref().unwrap_or_default();
                self.find_by_idempotency_key(key)
                    .await?
                    .ok_or(e)
            }
            other => other,
        }
    }

    async fn save_in_transaction(&self, payload: &TiDraftPayload) -> DbResult<String> {
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
                debug!(id = %id, lines = payload.lines.len(), "Creating tax invoice draft");

                sqlx::query(
                    r#"
                    INSERT INTO purchase_ti (
                        id, supplier_id, location_id, doc_no, doc_date, remark, status,
                        discount_amount, freight_amount, other_charge_amount,
                        idempotency_key, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
                    "#,
                )
                .bind(&id)
                .bind(payload.supplier_id.trim())
                .bind(payload.location_id.trim())
                .bind(&doc_no)
                .bind(payload.doc_date)
                .bind(&remark)
                .bind(DocumentStatus::Draft)
                .bind(payload.discount_amount)
                .bind(payload.freight_amount)
                .bind(payload.other_charge_amount)
                .bind(payload.idempotency_key.as_deref())
                .bind(now)
                .execute(&mut *tx)
                .await?;

                (id, true)
            }
            Some(id) => {
                debug!(id = %id, lines = payload.lines.len(), "Updating tax invoice draft");

                let result = sqlx::query(
                    r#"
                    UPDATE purchase_ti SET
                        supplier_id = ?2,
                        location_id = ?3,
                        doc_no = ?4,
                        doc_date = ?5,
                        remark = ?6,
                        discount_amount = ?7,
                        freight_amount = ?8,
                        other_charge_amount = ?9,
                        updated_at = ?10
                    WHERE id = ?1 AND status = 'DRAFT'
                    "#,
                )
                .bind(id)
                .bind(payload.supplier_id.trim())
                .bind(payload.location_id.trim())
                .bind(&doc_no)
                .bind(payload.doc_date)
                .bind(&remark)
                .bind(payload.discount_amount)
                .bind(payload.freight_amount)
                .bind(payload.other_charge_amount)
                .bind(now)
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(explain_not_draft(&mut tx, KIND, id).await);
                }

                ensure_no_matches(&mut tx, KIND, id).await?;

                sqlx::query("DELETE FROM purchase_ti_line WHERE ti_id = ?1")
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

        info!(id = %id, created, "Tax invoice draft saved");
        Ok(id)
    }

    /// Gets a tax invoice header by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<TaxInvoice>> {
        let sql = format!("{} WHERE id = ?1", SELECT_HEADER);
        let ti = sqlx::query_as::<_, TaxInvoice>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ti)
    }

    /// Lines of a tax invoice in `line_no` order.
    pub async fn get_lines(&self, ti_id: &str) -> DbResult<Vec<TaxInvoiceLine>> {
        let sql = format!("{} WHERE ti_id = ?1 ORDER BY line_no ASC", SELECT_LINE);
        let lines = sqlx::query_as::<_, TaxInvoiceLine>(&sql)
            .bind(ti_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(lines)
    }

    pub async fn get_line(&self, line_id: &str) -> DbResult<Option<TaxInvoiceLine>> {
        let sql = format!("{} WHERE id = ?1", SELECT_LINE);
        let line = sqlx::query_as::<_, TaxInvoiceLine>(&sql)
            .bind(line_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(line)
    }

    pub async fn line_count(&self, ti_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM purchase_ti_line WHERE ti_id = ?1")
            .bind(ti_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn find_by_idempotency_key(&self, key: &str) -> DbResult<Option<String>> {
        let id: Option<String> =
            sqlx::query_scalar("SELECT id FROM purchase_ti WHERE idempotency_key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(id)
    }
}

/// Loads lines inside an open transaction (posting engine).
pub(crate) async fn lines_in(conn: &mut SqliteConnection, ti_id: &str) -> DbResult<Vec<TaxInvoiceLine>> {
    let sql = format!("{} WHERE ti_id = ?1 ORDER BY line_no ASC", SELECT_LINE);
    let lines = sqlx::query_as::<_, TaxInvoiceLine>(&sql)
        .bind(ti_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(lines)
}

/// Loads the header inside an open transaction (posting engine).
pub(crate) async fn header_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<TaxInvoice>> {
    let sql = format!("{} WHERE id = ?1", SELECT_HEADER);
    let ti = sqlx::query_as::<_, TaxInvoice>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(ti)
}

async fn insert_lines(
    conn: &mut SqliteConnection,
    ti_id: &str,
    payload: &TiDraftPayload,
) -> DbResult<()> {
    for line in &payload.lines {
        sqlx::query(
            r#"
            INSERT INTO purchase_ti_line (
                id, ti_id, line_no, sku_id, quantity, unit_cost, line_discount, tax_rate
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(ti_id)
        .bind(line.line_no)
        .bind(line.sku_id.trim())
        .bind(line.quantity)
        .bind(line.unit_cost)
        .bind(line.line_discount)
        .bind(line.tax_rate)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::NaiveDate;
    use lanna_core::{CoreError, Money, Quantity, TaxRate, TiLineInput};

    async fn setup() -> (Database, TiDraftPayload) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let supplier_id = db.suppliers().insert("S1", "Siam Foods").await.unwrap().id;
        let location_id = db.locations().insert("L1", "Main store").await.unwrap().id;
        let sku = db.skus().insert("SKU-A", "Rice").await.unwrap().id;

        let payload = TiDraftPayload {
            id: None,
            supplier_id,
            location_id,
            doc_no: Some("INV-77".to_string()),
            doc_date: NaiveDate::from_ymd_opt(2025, 1, 12).unwrap(),
            remark: None,
            discount_amount: Money::from_satang(500),
            freight_amount: Money::from_satang(3_000),
            other_charge_amount: Money::zero(),
            status: None,
            idempotency_key: None,
            lines: vec![TiLineInput {
                line_no: 1,
                sku_id: sku,
                quantity: Quantity::from_units(10),
                unit_cost: Money::from_satang(1_250),
                line_discount: Money::zero(),
                tax_rate: TaxRate::THAI_VAT,
            }],
        };
        (db, payload)
    }

    #[tokio::test]
    async fn test_create_and_read_back() {
        let (db, payload) = setup().await;
        let repo = db.tax_invoices();

        let id = repo.save_draft(&payload).await.unwrap();
        let ti = repo.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(ti.status, DocumentStatus::Draft);
        assert_eq!(ti.freight_amount, Money::from_satang(3_000));
        assert_eq!(ti.grand_total_amount, None);

        let lines = repo.get_lines(&id).await.unwrap();
        assert_eq!(lines[0].tax_rate, TaxRate::THAI_VAT);
        assert_eq!(lines[0].unit_cost, Money::from_satang(1_250));
    }

    #[tokio::test]
    async fn test_update_keeps_status_and_replaces_lines() {
        let (db, payload) = setup().await;
        let repo = db.tax_invoices();
        let id = repo.save_draft(&payload).await.unwrap();

        let mut update = payload.clone();
        update.id = Some(id.clone());
        update.lines[0].quantity = Quantity::from_units(4);
        let mut second = update.lines[0].clone();
        second.line_no = 2;
        update.lines.push(second);
        repo.save_draft(&update).await.unwrap();

        assert_eq!(repo.line_count(&id).await.unwrap(), 2);
        let ti = repo.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(ti.status, DocumentStatus::Draft);
    }

    #[tokio::test]
    async fn test_update_of_void_invoice_is_refused() {
        let (db, payload) = setup().await;
        let repo = db.tax_invoices();
        let id = repo.save_draft(&payload).await.unwrap();

        sqlx::query("UPDATE purchase_ti SET status = 'VOID' WHERE id = ?1")
            .bind(&id)
            .execute(db.pool())
            .await
            .unwrap();

        let mut update = payload.clone();
        update.id = Some(id.clone());
        let err = repo.save_draft(&update).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::NotEditable {
                status: DocumentStatus::Void,
                ..
            })
        ));
        assert_eq!(repo.line_count(&id).await.unwrap(), 1);
    }
}
