//! # Draft Payloads
//!
//! The header-plus-lines shape submitted by the DN and TI forms on every
//! save. The same payload serves create (no `id`) and update (`id` set).
//!
//! ## Save Cycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Form ──► DnDraftPayload ──► validate() ──► DraftStore.save_draft()     │
//! │                                  │                                      │
//! │                                  └── Err(ValidationError) naming the    │
//! │                                      field, e.g. lines[2].quantity.     │
//! │                                      Nothing has been written yet.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any `status` the client sends is accepted by deserialization and then
//! ignored: new documents are always DRAFT and updates never touch status.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::quantity::Quantity;
use crate::types::{DocumentStatus, DomainHint, TaxRate};
use crate::validation::{
    validate_idempotency_key, validate_line_sequence, validate_max_chars,
    validate_non_negative_money, validate_optional_uuid, validate_positive_quantity,
    validate_tax_rate, validate_uuid, ValidationResult,
};
use crate::{MAX_DOCUMENT_LINES, MAX_DOC_NO_LEN, MAX_REMARK_LEN};

// =============================================================================
// Delivery Note
// =============================================================================

/// A delivery note save request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DnDraftPayload {
    /// Existing document id for an update; `None` creates a new document.
    #[serde(default)]
    pub id: Option<String>,

    pub supplier_id: String,

    pub location_id: String,

    #[serde(default)]
    pub doc_no: Option<String>,

    #[ts(as = "String")]
    pub doc_date: NaiveDate,

    #[serde(default)]
    pub remark: Option<String>,

    pub domain_hint: DomainHint,

    /// Ignored. Present so forms that echo the loaded document deserialize.
    #[serde(default)]
    pub status: Option<DocumentStatus>,

    /// Deduplicates retried creates.
    #[serde(default)]
    pub idempotency_key: Option<String>,

    pub lines: Vec<DnLineInput>,
}

/// One delivery note line as entered on the form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DnLineInput {
    pub line_no: u32,

    pub sku_id: String,

    pub quantity: Quantity,

    #[serde(default)]
    pub provisional_unit_cost: Option<Money>,
}

impl DnDraftPayload {
    /// True when this save creates a new document.
    #[inline]
    pub fn is_create(&self) -> bool {
        self.id.is_none()
    }

    /// Validates the whole payload, stopping at the first failure.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_header(HeaderFields {
            id: self.id.as_deref(),
            supplier_id: &self.supplier_id,
            location_id: &self.location_id,
            doc_no: self.doc_no.as_deref(),
            remark: self.remark.as_deref(),
            idempotency_key: self.idempotency_key.as_deref(),
        })?;

        let line_nos: Vec<u32> = self.lines.iter().map(|l| l.line_no).collect();
        validate_lines_shape(&line_nos)?;

        for (idx, line) in self.lines.iter().enumerate() {
            validate_uuid(&line_field(idx, "sku_id"), &line.sku_id)?;
            validate_positive_quantity(&line_field(idx, "quantity"), line.quantity)?;
            if let Some(cost) = line.provisional_unit_cost {
                validate_non_negative_money(&line_field(idx, "provisional_unit_cost"), cost)?;
            }
        }

        Ok(())
    }
}

// =============================================================================
// Tax Invoice
// =============================================================================

/// A tax invoice save request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TiDraftPayload {
    #[serde(default)]
    pub id: Option<String>,

    pub supplier_id: String,

    pub location_id: String,

    #[serde(default)]
    pub doc_no: Option<String>,

    #[ts(as = "String")]
    pub doc_date: NaiveDate,

    #[serde(default)]
    pub remark: Option<String>,

    #[serde(default)]
    pub discount_amount: Money,

    #[serde(default)]
    pub freight_amount: Money,

    #[serde(default)]
    pub other_charge_amount: Money,

    /// Ignored, see module docs.
    #[serde(default)]
    pub status: Option<DocumentStatus>,

    #[serde(default)]
    pub idempotency_key: Option<String>,

    pub lines: Vec<TiLineInput>,
}

/// One tax invoice line as entered on the form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TiLineInput {
    pub line_no: u32,

    pub sku_id: String,

    pub quantity: Quantity,

    pub unit_cost: Money,

    #[serde(default)]
    pub line_discount: Money,

    pub tax_rate: TaxRate,
}

impl TiDraftPayload {
    #[inline]
    pub fn is_create(&self) -> bool {
        self.id.is_none()
    }

    /// Validates the whole payload, stopping at the first failure.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_header(HeaderFields {
            id: self.id.as_deref(),
            supplier_id: &self.supplier_id,
            location_id: &self.location_id,
            doc_no: self.doc_no.as_deref(),
            remark: self.remark.as_deref(),
            idempotency_key: self.idempotency_key.as_deref(),
        })?;

        validate_non_negative_money("discount_amount", self.discount_amount)?;
        validate_non_negative_money("freight_amount", self.freight_amount)?;
        validate_non_negative_money("other_charge_amount", self.other_charge_amount)?;

        let line_nos: Vec<u32> = self.lines.iter().map(|l| l.line_no).collect();
        validate_lines_shape(&line_nos)?;

        for (idx, line) in self.lines.iter().enumerate() {
            validate_uuid(&line_field(idx, "sku_id"), &line.sku_id)?;
            validate_positive_quantity(&line_field(idx, "quantity"), line.quantity)?;
            validate_non_negative_money(&line_field(idx, "unit_cost"), line.unit_cost)?;
            validate_non_negative_money(&line_field(idx, "line_discount"), line.line_discount)?;

            let gross = line.unit_cost.times_quantity(line.quantity);
            if line.line_discount > gross {
                return Err(ValidationError::OutOfRange {
                    field: line_field(idx, "line_discount"),
                    min: 0,
                    max: gross.satang(),
                });
            }

            validate_tax_rate(&line_field(idx, "tax_rate"), line.tax_rate)?;
        }

        Ok(())
    }
}

// =============================================================================
// Shared Rules
// =============================================================================

struct HeaderFields<'a> {
    id: Option<&'a str>,
    supplier_id: &'a str,
    location_id: &'a str,
    doc_no: Option<&'a str>,
    remark: Option<&'a str>,
    idempotency_key: Option<&'a str>,
}

fn validate_header(h: HeaderFields<'_>) -> ValidationResult<()> {
    validate_optional_uuid("id", h.id)?;
    validate_uuid("supplier_id", h.supplier_id)?;
    validate_uuid("location_id", h.location_id)?;
    validate_max_chars("doc_no", h.doc_no, MAX_DOC_NO_LEN)?;
    validate_max_chars("remark", h.remark, MAX_REMARK_LEN)?;
    validate_idempotency_key(h.idempotency_key)?;
    Ok(())
}

fn validate_lines_shape(line_nos: &[u32]) -> ValidationResult<()> {
    if line_nos.is_empty() {
        return Err(ValidationError::Empty {
            field: "lines".to_string(),
        });
    }
    if line_nos.len() > MAX_DOCUMENT_LINES {
        return Err(ValidationError::OutOfRange {
            field: "lines".to_string(),
            min: 1,
            max: MAX_DOCUMENT_LINES as i64,
        });
    }
    validate_line_sequence(line_nos)
}

fn line_field(idx: usize, name: &str) -> String {
    format!("lines[{}].{}", idx, name)
}

/// Trims optional text; blank becomes `None`.
pub fn trimmed_or_none(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// =============================================================================
// Unit Tests
// =============================================================================
