//! # Domain Types
//!
//! Core domain types for the purchasing workflow.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  DeliveryNote   │   │   TaxInvoice    │   │    DnTiMatch    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  doc_no         │   │  doc_no         │   │  ti_line_id?    │       │
//! │  │  status         │   │  status         │   │  dn_line_id     │       │
//! │  │  domain_hint    │   │  adjustments    │   │  qty_matched    │       │
//! │  │  lines ──┐      │   │  lines ──┐      │   │  cost snapshot  │       │
//! │  └──────────┼──────┘   └──────────┼──────┘   └────────┬────────┘       │
//! │             ▼                     ▼                    │                │
//! │     DeliveryNoteLine ◄──────── matched ──────► TaxInvoiceLine          │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ DocumentStatus  │   │   DomainHint    │   │    TaxRate      │       │
//! │  │  DRAFT          │   │  TAXED          │   │  bps (u32)      │       │
//! │  │  POSTED         │   │  NONTAX         │   │  700 = 7% VAT   │       │
//! │  │  VOID           │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every document has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - `doc_no`: the supplier's printed number - optional, human-readable

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;
use crate::quantity::Quantity;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 700 bps = 7% (Thai VAT)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[serde(transparent)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Standard Thai VAT.
    pub const THAI_VAT: TaxRate = TaxRate(700);

    /// Upper bound: 100%.
    pub const MAX_BPS: u32 = 10_000;

    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac == 0 {
            write!(f, "{}%", whole)
        } else {
            write!(f, "{}.{:02}%", whole, frac)
        }
    }
}

// =============================================================================
// Document Kind
// =============================================================================

/// The two purchasing document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum DocumentKind {
    /// Goods received from a supplier.
    #[serde(rename = "DN")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "DN"))]
    DeliveryNote,
    /// The supplier's formal invoice.
    #[serde(rename = "TI")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "TI"))]
    TaxInvoice,
}

impl DocumentKind {
    /// Short code stored in the event outbox and stock movements.
    pub const fn code(&self) -> &'static str {
        match self {
            DocumentKind::DeliveryNote => "DN",
            DocumentKind::TaxInvoice => "TI",
        }
    }

    /// Header table name.
    pub const fn header_table(&self) -> &'static str {
        match self {
            DocumentKind::DeliveryNote => "purchase_dn",
            DocumentKind::TaxInvoice => "purchase_ti",
        }
    }

    /// Line table name.
    pub const fn line_table(&self) -> &'static str {
        match self {
            DocumentKind::DeliveryNote => "purchase_dn_line",
            DocumentKind::TaxInvoice => "purchase_ti_line",
        }
    }

    /// Column in the line table that references the header.
    pub const fn line_parent_column(&self) -> &'static str {
        match self {
            DocumentKind::DeliveryNote => "dn_id",
            DocumentKind::TaxInvoice => "ti_id",
        }
    }

    /// Denormalized list view.
    pub const fn list_view(&self) -> &'static str {
        match self {
            DocumentKind::DeliveryNote => "v_dn_list",
            DocumentKind::TaxInvoice => "v_ti_list",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::DeliveryNote => write!(f, "Delivery note"),
            DocumentKind::TaxInvoice => write!(f, "Tax invoice"),
        }
    }
}

// =============================================================================
// Document Status
// =============================================================================

/// Lifecycle status shared by DN and TI.
///
/// ## State Machine
/// ```text
///            post
///   DRAFT ─────────► POSTED   (terminal)
///     │
///     │ void
///     ▼
///   VOID                      (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum DocumentStatus {
    /// Editable, not yet posted.
    Draft,
    /// Finalized; inventory/financial effects applied.
    Posted,
    /// Cancelled before posting.
    Void,
}

impl DocumentStatus {
    /// Only drafts can be edited, posted, voided or have TI matches changed.
    #[inline]
    pub const fn is_editable(&self) -> bool {
        matches!(self, DocumentStatus::Draft)
    }

    #[inline]
    pub const fn is_terminal(&self) -> bool {
        !self.is_editable()
    }

    /// The transition table. Every allowed move starts at DRAFT.
    pub const fn can_transition_to(&self, next: DocumentStatus) -> bool {
        matches!(
            (self, next),
            (DocumentStatus::Draft, DocumentStatus::Posted)
                | (DocumentStatus::Draft, DocumentStatus::Void)
        )
    }

    /// Stored text form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "DRAFT",
            DocumentStatus::Posted => "POSTED",
            DocumentStatus::Void => "VOID",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Domain Hint
// =============================================================================

/// Pre-classification of received stock on a delivery note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum DomainHint {
    /// Stock bought with VAT.
    #[serde(rename = "TAXED")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "TAXED"))]
    Taxed,
    /// Stock bought without VAT.
    #[serde(rename = "NONTAX")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "NONTAX"))]
    NonTax,
}

impl fmt::Display for DomainHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainHint::Taxed => write!(f, "TAXED"),
            DomainHint::NonTax => write!(f, "NONTAX"),
        }
    }
}

// =============================================================================
// Delivery Note
// =============================================================================

/// A delivery note header.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DeliveryNote {
    /// Unique identifier (UUID v4).
    pub id: String,

    pub supplier_id: String,

    pub location_id: String,

    /// Supplier's printed document number.
    pub doc_no: Option<String>,

    #[ts(as = "String")]
    pub doc_date: NaiveDate,

    pub remark: Option<String>,

    pub status: DocumentStatus,

    pub domain_hint: DomainHint,

    #[ts(as = "Option<String>")]
    pub posted_at: Option<DateTime<Utc>>,

    pub posted_by: Option<String>,

    #[ts(as = "Option<String>")]
    pub voided_at: Option<DateTime<Utc>>,

    pub voided_by: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A delivery note line.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DeliveryNoteLine {
    pub id: String,

    pub dn_id: String,

    /// 1-based position within the document.
    pub line_no: u32,

    pub sku_id: String,

    pub quantity: Quantity,

    /// Expected cost until the tax invoice arrives.
    pub provisional_unit_cost: Option<Money>,
}

// =============================================================================
// Tax Invoice
// =============================================================================

/// A tax invoice header.
///
/// The three computed totals stay `None` until the invoice is posted.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TaxInvoice {
    pub id: String,

    pub supplier_id: String,

    pub location_id: String,

    pub doc_no: Option<String>,

    #[ts(as = "String")]
    pub doc_date: NaiveDate,

    pub remark: Option<String>,

    pub status: DocumentStatus,

    /// Header discount (satang).
    pub discount_amount: Money,

    pub freight_amount: Money,

    pub other_charge_amount: Money,

    pub subtotal_amount: Option<Money>,

    pub vat_amount: Option<Money>,

    pub grand_total_amount: Option<Money>,

    #[ts(as = "Option<String>")]
    pub posted_at: Option<DateTime<Utc>>,

    pub posted_by: Option<String>,

    #[ts(as = "Option<String>")]
    pub voided_at: Option<DateTime<Utc>>,

    pub voided_by: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A tax invoice line.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TaxInvoiceLine {
    pub id: String,

    pub ti_id: String,

    pub line_no: u32,

    pub sku_id: String,

    pub quantity: Quantity,

    pub unit_cost: Money,

    pub line_discount: Money,

    pub tax_rate: TaxRate,
}

// =============================================================================
// Match Record
// =============================================================================

/// A quantity link between a DN line and (optionally) a TI line.
///
/// `unit_cost_at_match` is a snapshot; later cost edits on either line
/// never change it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DnTiMatch {
    pub id: String,

    /// `None` models goods received but not yet invoiced.
    pub ti_line_id: Option<String>,

    pub dn_line_id: String,

    pub qty_matched: Quantity,

    pub unit_cost_at_match: Money,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Reference Data
// =============================================================================

/// A supplier (counterparty on DN and TI).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    pub code: String,
    pub name: String,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A stock location (warehouse, shop floor).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Location {
    pub id: String,
    pub code: String,
    pub name: String,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A stock keeping unit.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sku {
    pub id: String,
    pub code: String,
    pub name: String,
    /// Inactive SKUs cannot be posted.
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// One inventory effect written when a delivery note is posted.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub sku_id: String,
    pub location_id: String,
    pub domain: DomainHint,
    pub qty_delta: Quantity,
    pub unit_cost: Money,
    pub source_kind: DocumentKind,
    pub source_id: String,
    pub source_line_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Document Events
// =============================================================================

/// What happened to a document. Consumers use it to invalidate views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum DocumentEventType {
    DraftSaved,
    Posted,
    Voided,
    MatchAdded,
    MatchDeleted,
}

/// An entry in the document event outbox.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DocumentEvent {
    pub id: String,
    pub document_kind: DocumentKind,
    pub document_id: String,
    pub event_type: DocumentEventType,
    /// JSON body describing the change.
    pub payload: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub acknowledged_at: Option<DateTime<Utc>>,
}

// =============================================================================
// List Read Models
// =============================================================================

/// A row of the delivery note list screen (`v_dn_list`).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DnListRow {
    pub id: String,
    pub doc_no: Option<String>,
    #[ts(as = "String")]
    pub doc_date: NaiveDate,
    pub status: DocumentStatus,
    pub domain_hint: DomainHint,
    pub supplier_id: String,
    pub supplier_name: String,
    pub location_id: String,
    pub location_code: String,
    pub location_name: String,
    pub line_count: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A row of the tax invoice list screen (`v_ti_list`).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TiListRow {
    pub id: String,
    pub doc_no: Option<String>,
    #[ts(as = "String")]
    pub doc_date: NaiveDate,
    pub status: DocumentStatus,
    pub supplier_id: String,
    pub supplier_name: String,
    pub location_id: String,
    pub location_code: String,
    pub location_name: String,
    pub line_count: i64,
    /// Set once the invoice is posted.
    pub grand_total_amount: Option<Money>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        use DocumentStatus::*;
        assert!(Draft.can_transition_to(Posted));
        assert!(Draft.can_transition_to(Void));
        assert!(!Draft.can_transition_to(Draft));
        for terminal in [Posted, Void] {
            assert!(terminal.is_terminal());
            for next in [Draft, Posted, Void] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_status_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&DocumentStatus::Posted).unwrap(),
            "\"POSTED\""
        );
        let parsed: DocumentStatus = serde_json::from_str("\"VOID\"").unwrap();
        assert_eq!(parsed, DocumentStatus::Void);
    }

    #[test]
    fn test_domain_hint_wire_names() {
        assert_eq!(
            serde_json::to_string(&DomainHint::NonTax).unwrap(),
            "\"NONTAX\""
        );
        assert_eq!(DomainHint::Taxed.to_string(), "TAXED");
    }

    #[test]
    fn test_document_kind_tables() {
        assert_eq!(DocumentKind::DeliveryNote.header_table(), "purchase_dn");
        assert_eq!(DocumentKind::TaxInvoice.line_table(), "purchase_ti_line");
        assert_eq!(DocumentKind::TaxInvoice.list_view(), "v_ti_list");
        assert_eq!(
            serde_json::to_string(&DocumentKind::DeliveryNote).unwrap(),
            "\"DN\""
        );
    }

    #[test]
    fn test_tax_rate_display() {
        assert_eq!(TaxRate::THAI_VAT.to_string(), "7%");
        assert_eq!(TaxRate::from_bps(825).to_string(), "8.25%");
    }
}
