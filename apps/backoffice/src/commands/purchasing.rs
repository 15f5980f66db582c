//! # Purchasing Commands
//!
//! Save, fetch, post and void delivery notes and tax invoices.
//!
//! ## Document Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Document Lifecycle                                   │
//! │                                                                         │
//! │   save_dn_draft / save_ti_draft                                        │
//! │          │      (create: new id, status forced DRAFT)                  │
//! │          ▼      (update: header in place, lines replaced)              │
//! │   ┌──────────┐   post_document    ┌──────────┐                         │
//! │   │  DRAFT   │───────────────────►│  POSTED  │  stock movements (DN)   │
//! │   │          │                    └──────────┘  totals stored (TI)     │
//! │   │          │   void_document    ┌──────────┐                         │
//! │   │          │───────────────────►│   VOID   │                         │
//! │   └──────────┘                    └──────────┘                         │
//! │                                                                         │
//! │   POSTED and VOID are final. post/void return nothing; the UI          │
//! │   re-fetches with get_dn / get_ti.                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::state::DbState;
use lanna_core::totals::preview_ti_totals as compute_preview;
use lanna_core::{
    DeliveryNote, DeliveryNoteLine, DnDraftPayload, DocumentKind, DocumentStatus, DomainHint,
    Money, Quantity, TaxInvoice, TaxInvoiceLine, TaxRate, TiDraftPayload, TiTotals,
};

// =============================================================================
// DTOs
// =============================================================================

/// Delivery note with its lines, as shown on the DN form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryNoteDto {
    pub id: String,
    pub supplier_id: String,
    pub location_id: String,
    pub doc_no: Option<String>,
    pub doc_date: NaiveDate,
    pub remark: Option<String>,
    pub status: DocumentStatus,
    pub domain_hint: DomainHint,
    pub posted_at: Option<DateTime<Utc>>,
    pub posted_by: Option<String>,
    pub voided_at: Option<DateTime<Utc>>,
    pub voided_by: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub lines: Vec<DnLineDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnLineDto {
    pub id: String,
    pub line_no: u32,
    pub sku_id: String,
    pub quantity: Quantity,
    pub provisional_unit_cost: Option<Money>,
}

impl From<DeliveryNoteLine> for DnLineDto {
    fn from(l: DeliveryNoteLine) -> Self {
        DnLineDto {
            id: l.id,
            line_no: l.line_no,
            sku_id: l.sku_id,
            quantity: l.quantity,
            provisional_unit_cost: l.provisional_unit_cost,
        }
    }
}

impl DeliveryNoteDto {
    fn new(dn: DeliveryNote, lines: Vec<DeliveryNoteLine>) -> Self {
        DeliveryNoteDto {
            id: dn.id,
            supplier_id: dn.supplier_id,
            location_id: dn.location_id,
            doc_no: dn.doc_no,
            doc_date: dn.doc_date,
            remark: dn.remark,
            status: dn.status,
            domain_hint: dn.domain_hint,
            posted_at: dn.posted_at,
            posted_by: dn.posted_by,
            voided_at: dn.voided_at,
            voided_by: dn.voided_by,
            updated_at: dn.updated_at,
            lines: lines.into_iter().map(DnLineDto::from).collect(),
        }
    }
}

/// Tax invoice with its lines. Totals are `None` until posted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxInvoiceDto {
    pub id: String,
    pub supplier_id: String,
    pub location_id: String,
    pub doc_no: Option<String>,
    pub doc_date: NaiveDate,
    pub remark: Option<String>,
    pub status: DocumentStatus,
    pub discount_amount: Money,
    pub freight_amount: Money,
    pub other_charge_amount: Money,
    pub subtotal_amount: Option<Money>,
    pub vat_amount: Option<Money>,
    pub grand_total_amount: Option<Money>,
    pub posted_at: Option<DateTime<Utc>>,
    pub posted_by: Option<String>,
    pub voided_at: Option<DateTime<Utc>>,
    pub voided_by: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub lines: Vec<TiLineDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TiLineDto {
    pub id: String,
    pub line_no: u32,
    pub sku_id: String,
    pub quantity: Quantity,
    pub unit_cost: Money,
    pub line_discount: Money,
    pub tax_rate: TaxRate,
}

impl From<TaxInvoiceLine> for TiLineDto {
    fn from(l: TaxInvoiceLine) -> Self {
        TiLineDto {
            id: l.id,
            line_no: l.line_no,
            sku_id: l.sku_id,
            quantity: l.quantity,
            unit_cost: l.unit_cost,
            line_discount: l.line_discount,
            tax_rate: l.tax_rate,
        }
    }
}

impl TaxInvoiceDto {
    fn new(ti: TaxInvoice, lines: Vec<TaxInvoiceLine>) -> Self {
        TaxInvoiceDto {
            id: ti.id,
            supplier_id: ti.supplier_id,
            location_id: ti.location_id,
            doc_no: ti.doc_no,
            doc_date: ti.doc_date,
            remark: ti.remark,
            status: ti.status,
            discount_amount: ti.discount_amount,
            freight_amount: ti.freight_amount,
            other_charge_amount: ti.other_charge_amount,
            subtotal_amount: ti.subtotal_amount,
            vat_amount: ti.vat_amount,
            grand_total_amount: ti.grand_total_amount,
            posted_at: ti.posted_at,
            posted_by: ti.posted_by,
            voided_at: ti.voided_at,
            voided_by: ti.voided_by,
            updated_at: ti.updated_at,
            lines: lines.into_iter().map(TiLineDto::from).collect(),
        }
    }
}

// =============================================================================
// Draft Store
// =============================================================================

/// Creates or updates a delivery note draft.
///
/// ## Returns
/// The document id: new on create, the input id on update.
pub async fn save_dn_draft(db: &DbState, payload: DnDraftPayload) -> ApiResult<String> {
    debug!(id = ?payload.id, lines = payload.lines.len(), "save_dn_draft command");
    let id = db.inner().delivery_notes().save_draft(&payload).await?;
    Ok(id)
}

/// Creates or updates a tax invoice draft.
pub async fn save_ti_draft(db: &DbState, payload: TiDraftPayload) -> ApiResult<String> {
    debug!(id = ?payload.id, lines = payload.lines.len(), "save_ti_draft command");
    let id = db.inner().tax_invoices().save_draft(&payload).await?;
    Ok(id)
}

pub async fn get_dn(db: &DbState, id: &str) -> ApiResult<DeliveryNoteDto> {
    let repo = db.inner().delivery_notes();
    let dn = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Delivery note", id))?;
    let lines = repo.get_lines(id).await?;
    Ok(DeliveryNoteDto::new(dn, lines))
}

pub async fn get_ti(db: &DbState, id: &str) -> ApiResult<TaxInvoiceDto> {
    let repo = db.inner().tax_invoices();
    let ti = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Tax invoice", id))?;
    let lines = repo.get_lines(id).await?;
    Ok(TaxInvoiceDto::new(ti, lines))
}

// =============================================================================
// Status Gate
// =============================================================================

/// Posts a DRAFT document.
///
/// ## Errors
/// - `NOT_FOUND` when the id is unknown
/// - `STATE_CONFLICT` when the document is already POSTED or VOID
/// - `POSTING_REJECTED` with the rule's message (no lines, inactive SKU,
///   discount larger than the subtotal, ...)
pub async fn post_document(
    db: &DbState,
    kind: DocumentKind,
    id: &str,
    posted_by: &str,
) -> ApiResult<()> {
    if posted_by.trim().is_empty() {
        return Err(ApiError::validation("posted_by is required"));
    }
    db.inner().status_gate().post(kind, id, posted_by).await?;
    info!(kind = kind.code(), id = %id, "Document posted");
    Ok(())
}

/// Voids a DRAFT document. Refused while any of its lines is matched.
pub async fn void_document(
    db: &DbState,
    kind: DocumentKind,
    id: &str,
    voided_by: &str,
) -> ApiResult<()> {
    if voided_by.trim().is_empty() {
        return Err(ApiError::validation("voided_by is required"));
    }
    db.inner().status_gate().void(kind, id, voided_by).await?;
    info!(kind = kind.code(), id = %id, "Document voided");
    Ok(())
}

/// Totals the TI form would get if posted now. Nothing is stored.
pub fn preview_ti_totals(payload: &TiDraftPayload) -> ApiResult<TiTotals> {
    payload.validate()?;
    Ok(compute_preview(payload)?)
}
