//! # Match Repository
//!
//! Creates and deletes quantity links between DN lines and TI lines.
//!
//! ## add_match
//! ```text
//! BEGIN
//!   DN line exists?                       no  → NotFound
//!   DN document VOID?                     yes → NotEditable
//!   Σ matches on DN line + qty ≤ line qty? no → OverAllocated
//!   if TI line given:
//!     TI line exists?                     no  → NotFound
//!     TI document DRAFT?                  no  → NotEditable
//!     Σ matches on TI line + qty ≤ qty?   no  → OverAllocated
//!   INSERT dn_ti_match (cost snapshot stored as given)
//!   INSERT document_events ('match_added')
//! COMMIT
//! ```
//!
//! Events are keyed by the TI document when the match names a TI line,
//! otherwise by the DN document.

use chrono::Utc;
use serde_json::json;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::events::record_event;
use super::is_idempotency_conflict;
use crate::error::{DbError, DbResult};
use lanna_core::matching::check_allocation;
use lanna_core::{
    CoreError, DnTiMatch, DocumentEventType, DocumentKind, DocumentStatus, MatchSummaryLine,
    NewMatch, Quantity,
};

/// A line with its document's id and status, read under the transaction.
#[derive(Debug, FromRow)]
struct LineContext {
    document_id: String,
    line_no: u32,
    quantity: Quantity,
    status: DocumentStatus,
}

#[derive(Debug, FromRow)]
struct MatchContext {
    dn_id: String,
    ti_id: Option<String>,
    ti_status: Option<DocumentStatus>,
}

#[derive(Debug, FromRow)]
struct SummaryRow {
    id: String,
    line_no: u32,
    sku_id: String,
    quantity: Quantity,
    matched: Quantity,
}

/// Repository for DN/TI match records.
#[derive(Debug, Clone)]
pub struct MatchRepository {
    pool: SqlitePool,
}

impl MatchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        MatchRepository { pool }
    }

    /// Records a match and returns its id.
    ///
    /// A repeated `idempotency_key` returns the first match's id.
    pub async fn add_match(&self, input: &NewMatch) -> DbResult<String> {
        input.validate()?;

        if let Some(key) = input.idempotency_key.as_deref() {
            if let Some(existing) = self.find_by_idempotency_key(key).await? {
                debug!(id = %existing, "Match repeated with same idempotency key");
                return Ok(existing);
            }
        }

        match self.add_in_transaction(input).await {
            Err(e) if is_idempotency_conflict(&e) => {
                let key = input.idempotency_key.as_deref().unwrap_or_default();
                self.find_by_idempotency_key(key).await?.ok_or(e)
            }
            other => other,
        }
    }

    async fn add_in_transaction(&self, input: &NewMatch) -> DbResult<String> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let dn_line = load_line(&mut tx, DocumentKind::DeliveryNote, &input.dn_line_id).await?;
        if dn_line.status == DocumentStatus::Void {
            return Err(CoreError::NotEditable {
                kind: DocumentKind::DeliveryNote,
                id: dn_line.document_id,
                status: dn_line.status,
            }
            .into());
        }
        let dn_matched = matched_quantity(&mut tx, "dn_line_id", &input.dn_line_id).await?;
        check_allocation(
            &format!("DN line {}", dn_line.line_no),
            dn_line.quantity,
            dn_matched,
            input.qty_matched,
        )?;

        let mut event_target = (DocumentKind::DeliveryNote, dn_line.document_id.clone());

        if let Some(ti_line_id) = input.ti_line_id.as_deref() {
            let ti_line = load_line(&mut tx, DocumentKind::TaxInvoice, ti_line_id).await?;
            if !ti_line.status.is_editable() {
                return Err(CoreError::NotEditable {
                    kind: DocumentKind::TaxInvoice,
                    id: ti_line.document_id,
                    status: ti_line.status,
                }
                .into());
            }
            let ti_matched = matched_quantity(&mut tx, "ti_line_id", ti_line_id).await?;
            check_allocation(
                &format!("TI line {}", ti_line.line_no),
                ti_line.quantity,
                ti_matched,
                input.qty_matched,
            )?;
            event_target = (DocumentKind::TaxInvoice, ti_line.document_id);
        }

        let id = Uuid::new_v4().to_string();
        debug!(
            id = %id,
            dn_line_id = %input.dn_line_id,
            ti_line_id = ?input.ti_line_id,
            qty = %input.qty_matched,
            "Adding match"
        );

        sqlx::query(
            r#"
            INSERT INTO dn_ti_match (
                id, ti_line_id, dn_line_id, qty_matched, unit_cost_at_match,
                idempotency_key, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&id)
        .bind(input.ti_line_id.as_deref())
        .bind(&input.dn_line_id)
        .bind(input.qty_matched)
        .bind(input.unit_cost_at_match)
        .bind(input.idempotency_key.as_deref())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        record_event(
            &mut tx,
            event_target.0,
            &event_target.1,
            DocumentEventType::MatchAdded,
            &json!({
                "match_id": id,
                "dn_line_id": input.dn_line_id,
                "ti_line_id": input.ti_line_id,
            }),
        )
        .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(id = %id, "Match added");
        Ok(id)
    }

    /// Deletes exactly one match.
    ///
    /// ## Errors
    /// - `NotFound` - no match with this id
    /// - `Domain(NotEditable)` - the match's TI document is POSTED or VOID
    pub async fn delete_match(&self, match_id: &str) -> DbResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let ctx = sqlx::query_as::<_, MatchContext>(
            r#"
            SELECT dl.dn_id AS dn_id, tl.ti_id AS ti_id, t.status AS ti_status
            FROM dn_ti_match m
            JOIN purchase_dn_line dl ON dl.id = m.dn_line_id
            LEFT JOIN purchase_ti_line tl ON tl.id = m.ti_line_id
            LEFT JOIN purchase_ti t ON t.id = tl.ti_id
            WHERE m.id = ?1
            "#,
        )
        .bind(match_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Match", match_id))?;

        if let (Some(ti_id), Some(status)) = (&ctx.ti_id, ctx.ti_status) {
            if !status.is_editable() {
                return Err(CoreError::NotEditable {
                    kind: DocumentKind::TaxInvoice,
                    id: ti_id.clone(),
                    status,
                }
                .into());
            }
        }

        debug!(id = %match_id, "Deleting match");

        sqlx::query("DELETE FROM dn_ti_match WHERE id = ?1")
            .bind(match_id)
            .execute(&mut *tx)
            .await?;

        let (kind, document_id) = match ctx.ti_id {
            Some(ti_id) => (DocumentKind::TaxInvoice, ti_id),
            None => (DocumentKind::DeliveryNote, ctx.dn_id),
        };
        record_event(
            &mut tx,
            kind,
            &document_id,
            DocumentEventType::MatchDeleted,
            &json!({ "match_id": match_id }),
        )
        .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(id = %match_id, "Match deleted");
        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<DnTiMatch>> {
        let m = sqlx::query_as::<_, DnTiMatch>(
            r#"
            SELECT id, ti_line_id, dn_line_id, qty_matched, unit_cost_at_match, created_at
            FROM dn_ti_match
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(m)
    }

    /// Matches against any line of a tax invoice, by TI line number.
    pub async fn list_for_ti(&self, ti_id: &str) -> DbResult<Vec<DnTiMatch>> {
        let matches = sqlx::query_as::<_, DnTiMatch>(
            r#"
            SELECT m.id, m.ti_line_id, m.dn_line_id, m.qty_matched,
                   m.unit_cost_at_match, m.created_at
            FROM dn_ti_match m
            JOIN purchase_ti_line tl ON tl.id = m.ti_line_id
            WHERE tl.ti_id = ?1
            ORDER BY tl.line_no ASC, m.created_at ASC, m.id ASC
            "#,
        )
        .bind(ti_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(matches)
    }

    /// Matches against one DN line.
    pub async fn list_for_dn_line(&self, dn_line_id: &str) -> DbResult<Vec<DnTiMatch>> {
        let matches = sqlx::query_as::<_, DnTiMatch>(
            r#"
            SELECT id, ti_line_id, dn_line_id, qty_matched, unit_cost_at_match, created_at
            FROM dn_ti_match
            WHERE dn_line_id = ?1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(dn_line_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(matches)
    }

    /// Per-line matched and remaining quantities of a delivery note.
    pub async fn dn_match_summary(&self, dn_id: &str) -> DbResult<Vec<MatchSummaryLine>> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT l.id, l.line_no, l.sku_id, l.quantity,
                   COALESCE(SUM(m.qty_matched), 0) AS matched
            FROM purchase_dn_line l
            LEFT JOIN dn_ti_match m ON m.dn_line_id = l.id
            WHERE l.dn_id = ?1
            GROUP BY l.id, l.line_no, l.sku_id, l.quantity
            ORDER BY l.line_no ASC
            "#,
        )
        .bind(dn_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| MatchSummaryLine::new(r.id, r.line_no, r.sku_id, r.quantity, r.matched))
            .collect())
    }

    pub async fn find_by_idempotency_key(&self, key: &str) -> DbResult<Option<String>> {
        let id: Option<String> =
            sqlx::query_scalar("SELECT id FROM dn_ti_match WHERE idempotency_key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(id)
    }
}

async fn load_line(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    line_id: &str,
) -> DbResult<LineContext> {
    let sql = format!(
        r#"
        SELECT d.id AS document_id, l.line_no, l.quantity, d.status
        FROM {line} l
        JOIN {header} d ON d.id = l.{parent}
        WHERE l.id = ?1
        "#,
        line = kind.line_table(),
        header = kind.header_table(),
        parent = kind.line_parent_column(),
    );

    sqlx::query_as::<_, LineContext>(&sql)
        .bind(line_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found(format!("{} line", kind), line_id))
}

/// Sum of existing matches on a line. `column` is a fixed match column name.
async fn matched_quantity(
    conn: &mut SqliteConnection,
    column: &'static str,
    line_id: &str,
) -> DbResult<Quantity> {
    let sql = format!(
        "SELECT COALESCE(SUM(qty_matched), 0) FROM dn_ti_match WHERE {} = ?1",
        column
    );
    let milli: i64 = sqlx::query_scalar(&sql)
        .bind(line_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(Quantity::from_milli(milli))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::NaiveDate;
    use lanna_core::{DnDraftPayload, DnLineInput, DomainHint, Money, TaxRate, TiDraftPayload, TiLineInput};

    struct Fixture {
        db: Database,
        dn_id: String,
        dn_line_id: String,
        ti_id: String,
        ti_line_id: String,
    }

    async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let supplier_id = db.suppliers().insert("S1", "Siam Foods").await.unwrap().id;
        let location_id = db.locations().insert("L1", "Main store").await.unwrap().id;
        let sku = db.skus().insert("SKU-A", "Rice").await.unwrap().id;
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();

        let dn_id = db
            .delivery_notes()
            .save_draft(&DnDraftPayload {
                id: None,
                supplier_id: supplier_id.clone(),
                location_id: location_id.clone(),
                doc_no: None,
                doc_date: date,
                remark: None,
                domain_hint: DomainHint::Taxed,
                status: None,
                idempotency_key: None,
                lines: vec![DnLineInput {
                    line_no: 1,
                    sku_id: sku.clone(),
                    quantity: Quantity::from_units(10),
                    provisional_unit_cost: None,
                }],
            })
            .await
            .unwrap();
        let ti_id = db
            .tax_invoices()
            .save_draft(&TiDraftPayload {
                id: None,
                supplier_id,
                location_id,
                doc_no: None,
                doc_date: date,
                remark: None,
                discount_amount: Money::zero(),
                freight_amount: Money::zero(),
                other_charge_amount: Money::zero(),
                status: None,
                idempotency_key: None,
                lines: vec![TiLineInput {
                    line_no: 1,
                    sku_id: sku,
                    quantity: Quantity::from_units(8),
                    unit_cost: Money::from_satang(1_250),
                    line_discount: Money::zero(),
                    tax_rate: TaxRate::THAI_VAT,
                }],
            })
            .await
            .unwrap();

        let dn_line_id = db.delivery_notes().get_lines(&dn_id).await.unwrap()[0].id.clone();
        let ti_line_id = db.tax_invoices().get_lines(&ti_id).await.unwrap()[0].id.clone();
        Fixture {
            db,
            dn_id,
            dn_line_id,
            ti_id,
            ti_line_id,
        }
    }

    fn new_match(f: &Fixture, ti: bool, qty: i64) -> NewMatch {
        NewMatch {
            ti_line_id: ti.then(|| f.ti_line_id.clone()),
            dn_line_id: f.dn_line_id.clone(),
            qty_matched: Quantity::from_units(qty),
            unit_cost_at_match: Money::from_satang(1_250),
            idempotency_key: None,
        }
    }

    #[tokio::test]
    async fn test_add_and_summarize() {
        let f = fixture().await;
        let repo = f.db.matches();

        let id = repo.add_match(&new_match(&f, true, 6)).await.unwrap();
        let stored = repo.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.unit_cost_at_match, Money::from_satang(1_250));
        assert_eq!(stored.ti_line_id.as_deref(), Some(f.ti_line_id.as_str()));

        repo.add_match(&new_match(&f, false, 3)).await.unwrap();

        let summary = repo.dn_match_summary(&f.dn_id).await.unwrap();
        assert_eq!(summary[0].matched, Quantity::from_units(9));
        assert_eq!(summary[0].remaining, Quantity::from_units(1));
        assert_eq!(repo.list_for_ti(&f.ti_id).await.unwrap().len(), 1);
        assert_eq!(repo.list_for_dn_line(&f.dn_line_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_over_allocation_rejected() {
        let f = fixture().await;
        let repo = f.db.matches();

        repo.add_match(&new_match(&f, false, 7)).await.unwrap();
        let err = repo.add_match(&new_match(&f, false, 4)).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::OverAllocated { .. })));

        // TI line holds 8
        let err = repo.add_match(&new_match(&f, true, 9)).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::OverAllocated { .. })));

        assert_eq!(repo.list_for_dn_line(&f.dn_line_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_dn_line_is_not_found() {
        let f = fixture().await;
        let mut m = new_match(&f, false, 1);
        m.dn_line_id = Uuid::new_v4().to_string();
        let err = f.db.matches().add_match(&m).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_is_refused_for_posted_invoice() {
        let f = fixture().await;
        let repo = f.db.matches();
        let id = repo.add_match(&new_match(&f, true, 2)).await.unwrap();

        sqlx::query("UPDATE purchase_ti SET status = 'POSTED' WHERE id = ?1")
            .bind(&f.ti_id)
            .execute(f.db.pool())
            .await
            .unwrap();

        let err = repo.delete_match(&id).await.unwrap_err();
        assert!(err.is_state_conflict());
        assert!(repo.get_by_id(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_without_ti_line_after_dn_posted() {
        let f = fixture().await;
        let repo = f.db.matches();
        let id = repo.add_match(&new_match(&f, false, 2)).await.unwrap();

        f.db.status_gate()
            .post(DocumentKind::DeliveryNote, &f.dn_id, "somchai")
            .await
            .unwrap();

        // Only a TI document's status guards a match; a DN-only match stays deletable.
        repo.delete_match(&id).await.unwrap();
        assert!(repo.list_for_dn_line(&f.dn_line_id).await.unwrap().is_empty());

        let dn = f.db.delivery_notes().get_by_id(&f.dn_id).await.unwrap().unwrap();
        assert_eq!(dn.status, DocumentStatus::Posted);
    }

    #[tokio::test]
    async fn test_delete_twice_is_not_found() {
        let f = fixture().await;
        let repo = f.db.matches();
        let id = repo.add_match(&new_match(&f, false, 2)).await.unwrap();

        repo.delete_match(&id).await.unwrap();
        let err = repo.delete_match(&id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_idempotent_add() {
        let f = fixture().await;
        let repo = f.db.matches();
        let mut m = new_match(&f, false, 2);
        m.idempotency_key = Some("scan-1".to_string());

        let a = repo.add_match(&m).await.unwrap();
        let b = repo.add_match(&m).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(repo.list_for_dn_line(&f.dn_line_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_matched_lines_block_draft_update() {
        let f = fixture().await;
        f.db.matches().add_match(&new_match(&f, false, 1)).await.unwrap();

        let dn = f.db.delivery_notes().get_by_id(&f.dn_id).await.unwrap().unwrap();
        let lines = f.db.delivery_notes().get_lines(&f.dn_id).await.unwrap();
        let update = DnDraftPayload {
            id: Some(dn.id.clone()),
            supplier_id: dn.supplier_id,
            location_id: dn.location_id,
            doc_no: dn.doc_no,
            doc_date: dn.doc_date,
            remark: dn.remark,
            domain_hint: dn.domain_hint,
            status: None,
            idempotency_key: None,
            lines: vec![DnLineInput {
                line_no: 1,
                sku_id: lines[0].sku_id.clone(),
                quantity: Quantity::from_units(20),
                provisional_unit_cost: None,
            }],
        };

        let err = f.db.delivery_notes().save_draft(&update).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::DocumentHasMatches { .. })));
        assert_eq!(
            f.db.delivery_notes().get_lines(&f.dn_id).await.unwrap()[0].id,
            lines[0].id
        );
    }
}
