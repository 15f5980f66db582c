//! # Posting Engine
//!
//! Finalizes a DRAFT document: checks the line rules, writes the document's
//! financial or inventory effect and flips the status, all in one
//! transaction.
//!
//! ## Posting a Delivery Note
//! ```text
//! BEGIN
//!   UPDATE purchase_dn SET status = 'POSTED' ... WHERE id = ? AND status = 'DRAFT'
//!        │
//!        ├── 0 rows → re-read: missing → NotFound, else AlreadyFinalized
//!        ▼
//!   lines ≥ 1, every SKU exists and is active, every quantity > 0
//!        │
//!        ├── rule broken → Rejected(message)        (ROLLBACK)
//!        ▼
//!   INSERT stock_movements  (one per line, +qty, provisional cost or 0)
//!   INSERT document_events  ('posted')
//! COMMIT
//! ```
//!
//! A tax invoice follows the same path but, instead of stock movements,
//! computes its totals (see `lanna_core::totals`) and stores subtotal, VAT
//! and grand total on the header.
//!
//! The status flip is the first statement, so two concurrent posts of the
//! same document cannot both pass: the loser sees zero rows affected.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::events::record_event;
use crate::repository::fetch_status;
use crate::repository::tax_invoice::{header_in, lines_in};
use lanna_core::totals::compute_ti_totals;
use lanna_core::{
    CoreError, DocumentEventType, DocumentKind, DocumentStatus, DomainHint, HeaderAdjustments,
    Money, Quantity,
};

// =============================================================================
// Errors
// =============================================================================

/// Why a post or void did not happen.
#[derive(Debug, Error)]
pub enum PostingError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: DocumentKind, id: String },

    /// The document was not DRAFT when the request arrived.
    #[error("{kind} {id} is {status} and can no longer be changed")]
    NotEditable {
        kind: DocumentKind,
        id: String,
        status: DocumentStatus,
    },

    /// The document left DRAFT between the status check and the update.
    /// Retrying cannot succeed.
    #[error("{kind} {id} was already finalized ({status})")]
    AlreadyFinalized {
        kind: DocumentKind,
        id: String,
        status: DocumentStatus,
    },

    /// A posting rule refused the document. The message is shown as-is.
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl PostingError {
    /// True for "the document is no longer in the state this needs".
    pub fn is_state_conflict(&self) -> bool {
        match self {
            PostingError::NotEditable { .. } | PostingError::AlreadyFinalized { .. } => true,
            PostingError::Db(e) => e.is_state_conflict(),
            _ => false,
        }
    }
}

impl From<sqlx::Error> for PostingError {
    fn from(err: sqlx::Error) -> Self {
        PostingError::Db(err.into())
    }
}

impl From<CoreError> for PostingError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::PostingRule(message) => PostingError::Rejected(message),
            CoreError::NotEditable { kind, id, status } => {
                PostingError::NotEditable { kind, id, status }
            }
            other => PostingError::Db(DbError::Domain(other)),
        }
    }
}

pub type PostingResult<T> = Result<T, PostingError>;

// =============================================================================
// Engine Trait
// =============================================================================

/// Performs the DRAFT → POSTED transition with its side effects.
///
/// Implementations must re-check the DRAFT status atomically with the status
/// change and report a lost race as [`PostingError::AlreadyFinalized`].
#[async_trait]
pub trait PostingEngine: Send + Sync {
    async fn post_delivery_note(&self, id: &str, posted_by: &str) -> PostingResult<()>;

    async fn post_tax_invoice(&self, id: &str, posted_by: &str) -> PostingResult<()>;
}

// =============================================================================
// Status Flip
// =============================================================================

/// The two ways out of DRAFT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Finalization {
    Post,
    Void,
}

impl Finalization {
    pub(crate) const fn target(&self) -> DocumentStatus {
        match self {
            Finalization::Post => DocumentStatus::Posted,
            Finalization::Void => DocumentStatus::Void,
        }
    }

    const fn columns(&self) -> (&'static str, &'static str) {
        match self {
            Finalization::Post => ("posted_at", "posted_by"),
            Finalization::Void => ("voided_at", "voided_by"),
        }
    }
}

/// Conditionally moves a DRAFT document to its final status.
pub(crate) async fn finalize(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    id: &str,
    how: Finalization,
    actor: &str,
    now: DateTime<Utc>,
) -> PostingResult<()> {
    let (at_column, by_column) = how.columns();
    let sql = format!(
        r#"
        UPDATE {table}
        SET status = ?2, {at} = ?3, {by} = ?4, updated_at = ?3
        WHERE id = ?1 AND status = 'DRAFT'
        "#,
        table = kind.header_table(),
        at = at_column,
        by = by_column,
    );

    let result = sqlx::query(&sql)
        .bind(id)
        .bind(how.target())
        .bind(now)
        .bind(actor)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(match fetch_status(&mut *conn, kind, id).await? {
            None => PostingError::NotFound {
                kind,
                id: id.to_string(),
            },
            Some(status) => {
                warn!(kind = kind.code(), id = %id, %status, "Lost finalization race");
                PostingError::AlreadyFinalized {
                    kind,
                    id: id.to_string(),
                    status,
                }
            }
        });
    }
    Ok(())
}

// =============================================================================
// Line Rules
// =============================================================================

#[derive(Debug, FromRow)]
struct PostingLine {
    id: String,
    line_no: u32,
    sku_id: String,
    quantity: Quantity,
    provisional_unit_cost: Option<Money>,
    sku_active: Option<bool>,
}

/// Loads the lines to post and applies the rules shared by DN and TI.
async fn checked_lines(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    id: &str,
) -> PostingResult<Vec<PostingLine>> {
    let cost = match kind {
        DocumentKind::DeliveryNote => "l.provisional_unit_cost",
        DocumentKind::TaxInvoice => "NULL",
    };
    let sql = format!(
        r#"
        SELECT l.id, l.line_no, l.sku_id, l.quantity,
               {cost} AS provisional_unit_cost, s.is_active AS sku_active
        FROM {line} l
        LEFT JOIN skus s ON s.id = l.sku_id
        WHERE l.{parent} = ?1
        ORDER BY l.line_no ASC
        "#,
        cost = cost,
        line = kind.line_table(),
        parent = kind.line_parent_column(),
    );

    let lines = sqlx::query_as::<_, PostingLine>(&sql)
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

    if lines.is_empty() {
        return Err(PostingError::Rejected(format!("{} has no lines", kind)));
    }
    for line in &lines {
        match line.sku_active {
            None => {
                return Err(PostingError::Rejected(format!(
                    "Line {}: SKU {} not found",
                    line.line_no, line.sku_id
                )))
            }
            Some(false) => {
                return Err(PostingError::Rejected(format!(
                    "Line {}: SKU {} is inactive",
                    line.line_no, line.sku_id
                )))
            }
            Some(true) => {}
        }
        if !line.quantity.is_positive() {
            return Err(PostingError::Rejected(format!(
                "Line {}: quantity must be positive",
                line.line_no
            )));
        }
    }
    Ok(lines)
}

// =============================================================================
// SQLite Engine
// =============================================================================

#[derive(Debug, FromRow)]
struct DnPostingHeader {
    location_id: String,
    domain_hint: DomainHint,
}

/// Posting engine over the local SQLite database.
#[derive(Debug, Clone)]
pub struct SqlitePostingEngine {
    pool: SqlitePool,
}

impl SqlitePostingEngine {
    pub fn new(pool: SqlitePool) -> Self {
        SqlitePostingEngine { pool }
    }

    async fn begin(&self) -> DbResult<sqlx::Transaction<'static, sqlx::Sqlite>> {
        self.pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }
}

#[async_trait]
impl PostingEngine for SqlitePostingEngine {
    async fn post_delivery_note(&self, id: &str, posted_by: &str) -> PostingResult<()> {
        let kind = DocumentKind::DeliveryNote;
        let now = Utc::now();
        let mut tx = self.begin().await?;

        finalize(&mut tx, kind, id, Finalization::Post, posted_by, now).await?;
        let lines = checked_lines(&mut tx, kind, id).await?;

        let header = sqlx::query_as::<_, DnPostingHeader>(
            "SELECT location_id, domain_hint FROM purchase_dn WHERE id = ?1",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        for line in &lines {
            let cost = line.provisional_unit_cost.unwrap_or_default();
            debug!(dn_id = %id, line_no = line.line_no, qty = %line.quantity, "Writing stock movement");

            sqlx::query(
                r#"
                INSERT INTO stock_movements (
                    id, sku_id, location_id, domain, qty_delta, unit_cost,
                    source_kind, source_id, source_line_id, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&line.sku_id)
            .bind(&header.location_id)
            .bind(header.domain_hint)
            .bind(line.quantity)
            .bind(cost)
            .bind(kind)
            .bind(id)
            .bind(&line.id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        record_event(
            &mut tx,
            kind,
            id,
            DocumentEventType::Posted,
            &json!({ "posted_by": posted_by, "line_count": lines.len() }),
        )
        .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(id = %id, lines = lines.len(), "Delivery note posted");
        Ok(())
    }

    async fn post_tax_invoice(&self, id: &str, posted_by: &str) -> PostingResult<()> {
        let kind = DocumentKind::TaxInvoice;
        let now = Utc::now();
        let mut tx = self.begin().await?;

        finalize(&mut tx, kind, id, Finalization::Post, posted_by, now).await?;
        checked_lines(&mut tx, kind, id).await?;

        let header = header_in(&mut tx, id)
            .await?
            .ok_or_else(|| PostingError::NotFound {
                kind,
                id: id.to_string(),
            })?;
        let lines = lines_in(&mut tx, id).await?;
        let totals = compute_ti_totals(&lines, HeaderAdjustments::from(&header))?;

        debug!(
            id = %id,
            subtotal = %totals.subtotal,
            vat = %totals.vat,
            grand_total = %totals.grand_total,
            "Storing tax invoice totals"
        );

        sqlx::query(
            r#"
            UPDATE purchase_ti
            SET subtotal_amount = ?2, vat_amount = ?3, grand_total_amount = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(totals.subtotal)
        .bind(totals.vat)
        .bind(totals.grand_total)
        .execute(&mut *tx)
        .await?;

        record_event(
            &mut tx,
            kind,
            id,
            DocumentEventType::Posted,
            &json!({ "posted_by": posted_by, "grand_total": totals.grand_total.satang() }),
        )
        .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(id = %id, grand_total = %totals.grand_total, "Tax invoice posted");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::NaiveDate;
    use lanna_core::{DnDraftPayload, DnLineInput, TaxRate, TiDraftPayload, TiLineInput};

    struct Refs {
        supplier_id: String,
        location_id: String,
        sku_id: String,
    }

    async fn setup() -> (Database, Refs) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let refs = Refs {
            supplier_id: db.suppliers().insert("S1", "Siam Foods").await.unwrap().id,
            location_id: db.locations().insert("L1", "Main store").await.unwrap().id,
            sku_id: db.skus().insert("SKU-A", "Rice").await.unwrap().id,
        };
        (db, refs)
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()
    }

    async fn dn(db: &Database, refs: &Refs) -> String {
        db.delivery_notes()
            .save_draft(&DnDraftPayload {
                id: None,
                supplier_id: refs.supplier_id.clone(),
                location_id: refs.location_id.clone(),
                doc_no: Some("DN-1".to_string()),
                doc_date: date(),
                remark: None,
                domain_hint: DomainHint::NonTax,
                status: None,
                idempotency_key: None,
                lines: vec![
                    DnLineInput {
                        line_no: 1,
                        sku_id: refs.sku_id.clone(),
                        quantity: Quantity::from_units(10),
                        provisional_unit_cost: Some(Money::from_satang(1_250)),
                    },
                    DnLineInput {
                        line_no: 2,
                        sku_id: refs.sku_id.clone(),
                        quantity: Quantity::from_milli(2_500),
                        provisional_unit_cost: None,
                    },
                ],
            })
            .await
            .unwrap()
    }

    async fn ti(db: &Database, refs: &Refs, discount: Money) -> String {
        db.tax_invoices()
            .save_draft(&TiDraftPayload {
                id: None,
                supplier_id: refs.supplier_id.clone(),
                location_id: refs.location_id.clone(),
                doc_no: Some("TI-1".to_string()),
                doc_date: date(),
                remark: None,
                discount_amount: discount,
                freight_amount: Money::from_satang(5_000),
                other_charge_amount: Money::zero(),
                status: None,
                idempotency_key: None,
                lines: vec![TiLineInput {
                    line_no: 1,
                    sku_id: refs.sku_id.clone(),
                    quantity: Quantity::from_units(8),
                    unit_cost: Money::from_satang(1_250),
                    line_discount: Money::zero(),
                    tax_rate: TaxRate::THAI_VAT,
                }],
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_post_dn_writes_stock_movements() {
        let (db, refs) = setup().await;
        let id = dn(&db, &refs).await;

        db.posting_engine().post_delivery_note(&id, "somchai").await.unwrap();

        let stored = db.delivery_notes().get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.status, DocumentStatus::Posted);
        assert_eq!(stored.posted_by.as_deref(), Some("somchai"));
        assert!(stored.posted_at.is_some());

        let movements = db.stock_movements().list_for_document(&id).await.unwrap();
        assert_eq!(movements.len(), 2);
        assert!(movements.iter().all(|m| m.domain == DomainHint::NonTax));
        assert_eq!(
            db.stock_movements()
                .on_hand(&refs.sku_id, &refs.location_id)
                .await
                .unwrap(),
            Quantity::from_milli(12_500)
        );
        let costs: Vec<_> = movements.iter().map(|m| m.unit_cost.satang()).collect();
        assert!(costs.contains(&1_250) && costs.contains(&0));
    }

    #[tokio::test]
    async fn test_second_post_is_already_finalized() {
        let (db, refs) = setup().await;
        let id = dn(&db, &refs).await;
        let engine = db.posting_engine();

        engine.post_delivery_note(&id, "a").await.unwrap();
        let err = engine.post_delivery_note(&id, "b").await.unwrap_err();
        assert!(matches!(
            err,
            PostingError::AlreadyFinalized { status: DocumentStatus::Posted, .. }
        ));
        assert!(err.is_state_conflict());
        assert_eq!(db.stock_movements().list_for_document(&id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_inactive_sku_rejects_and_rolls_back() {
        let (db, refs) = setup().await;
        let id = dn(&db, &refs).await;
        db.skus().set_active(&refs.sku_id, false).await.unwrap();

        let err = db.posting_engine().post_delivery_note(&id, "a").await.unwrap_err();
        match err {
            PostingError::Rejected(message) => assert!(message.contains("inactive")),
            other => panic!("unexpected error: {other:?}"),
        }

        let stored = db.delivery_notes().get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.status, DocumentStatus::Draft);
        assert!(db.stock_movements().list_for_document(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_post_unknown_document() {
        let (db, _) = setup().await;
        let err = db
            .posting_engine()
            .post_tax_invoice(&Uuid::new_v4().to_string(), "a")
            .await
            .unwrap_err();
        assert!(matches!(err, PostingError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_post_ti_stores_totals() {
        let (db, refs) = setup().await;
        let id = ti(&db, &refs, Money::from_satang(1_000)).await;

        db.posting_engine().post_tax_invoice(&id, "a").await.unwrap();

        // 8 × 12.50 = 100.00 net, VAT 7.00, −10.00 discount, +50.00 freight
        let stored = db.tax_invoices().get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.status, DocumentStatus::Posted);
        assert_eq!(stored.subtotal_amount, Some(Money::from_satang(10_000)));
        assert_eq!(stored.vat_amount, Some(Money::from_satang(700)));
        assert_eq!(stored.grand_total_amount, Some(Money::from_satang(14_700)));
    }

    #[tokio::test]
    async fn test_ti_discount_over_subtotal_is_rejected() {
        let (db, refs) = setup().await;
        let id = ti(&db, &refs, Money::from_satang(10_001)).await;

        let err = db.posting_engine().post_tax_invoice(&id, "a").await.unwrap_err();
        assert!(matches!(err, PostingError::Rejected(_)));

        let stored = db.tax_invoices().get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.status, DocumentStatus::Draft);
        assert!(stored.grand_total_amount.is_none());
    }

    #[tokio::test]
    async fn test_ti_amount_overflow_is_rejected_not_panicking() {
        let (db, refs) = setup().await;
        let id = ti(&db, &refs, Money::zero()).await;

        // Rows written outside the draft store skip the unit cost ceiling.
        sqlx::query("UPDATE purchase_ti_line SET unit_cost = ?2 WHERE ti_id = ?1")
            .bind(&id)
            .bind(i64::MAX / 8 + 1)
            .execute(db.pool())
            .await
            .unwrap();

        let err = db.posting_engine().post_tax_invoice(&id, "a").await.unwrap_err();
        match err {
            PostingError::Rejected(message) => assert!(message.contains("amount range")),
            other => panic!("unexpected error: {other:?}"),
        }

        let stored = db.tax_invoices().get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.status, DocumentStatus::Draft);
        assert!(stored.grand_total_amount.is_none());
    }
}
