//! # Draft Editing State
//!
//! The DN or TI form currently being edited, before it is saved.
//!
//! ## Thread Safety
//! The draft is wrapped in `Arc<Mutex<T>>`: several commands touch it and
//! only one may change it at a time. Every operation holds the lock briefly
//! and never across an `.await`.
//!
//! ## Draft Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Draft State Operations                               │
//! │                                                                         │
//! │  Form Action              Command                 Draft Change          │
//! │  ───────────              ───────                 ────────────          │
//! │  New DN / New TI ────────► start_draft() ────────► fresh draft, new key │
//! │  Open document ──────────► open_dn/ti_draft() ───► header + lines       │
//! │  Edit header ────────────► set_draft_header() ───► header replaced      │
//! │  Add row ────────────────► add_draft_line() ─────► lines.push           │
//! │  Edit row ───────────────► update_draft_line() ──► lines[n-1] replaced  │
//! │  Delete row ─────────────► remove_draft_line() ──► remove + renumber    │
//! │  Save ───────────────────► submit_draft() ───────► payload → store      │
//! │                                                                         │
//! │  Line numbers always run 1..=n with no gaps.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use lanna_core::{
    DeliveryNote, DeliveryNoteLine, DnDraftPayload, DnLineInput, DocumentKind, DomainHint, Money,
    Quantity, TaxInvoice, TaxInvoiceLine, TaxRate, TiDraftPayload, TiLineInput,
};

/// Draft problems the form can fix.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DraftError {
    #[error("The open draft is a {actual}, not a {expected}")]
    WrongKind {
        expected: DocumentKind,
        actual: DocumentKind,
    },

    #[error("{0} is required")]
    MissingField(String),

    #[error("Draft has no line {0}")]
    NoSuchLine(u32),
}

impl DraftError {
    /// The form field to highlight, when there is one.
    pub fn field(&self) -> Option<&str> {
        match self {
            DraftError::MissingField(field) => Some(field),
            DraftError::NoSuchLine(_) => Some("line_no"),
            DraftError::WrongKind { .. } => None,
        }
    }
}

// =============================================================================
// Draft Types
// =============================================================================

/// Header fields as typed on the form.
///
/// DN forms ignore the three TI adjustments; TI forms ignore `domain_hint`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftHeader {
    #[serde(default)]
    pub supplier_id: String,

    #[serde(default)]
    pub location_id: String,

    #[serde(default)]
    pub doc_no: Option<String>,

    #[serde(default)]
    pub doc_date: Option<NaiveDate>,

    #[serde(default)]
    pub remark: Option<String>,

    #[serde(default = "default_domain_hint")]
    pub domain_hint: DomainHint,

    #[serde(default)]
    pub discount_amount: Money,

    #[serde(default)]
    pub freight_amount: Money,

    #[serde(default)]
    pub other_charge_amount: Money,
}

fn default_domain_hint() -> DomainHint {
    DomainHint::Taxed
}

impl Default for DraftHeader {
    fn default() -> Self {
        DraftHeader {
            supplier_id: String::new(),
            location_id: String::new(),
            doc_no: None,
            doc_date: None,
            remark: None,
            domain_hint: default_domain_hint(),
            discount_amount: Money::zero(),
            freight_amount: Money::zero(),
            other_charge_amount: Money::zero(),
        }
    }
}

/// One form row. `line_no` is owned by the draft and reassigned on removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftLine {
    #[serde(default)]
    pub line_no: u32,

    pub sku_id: String,

    pub quantity: Quantity,

    /// Provisional cost on a DN, required unit cost on a TI.
    #[serde(default)]
    pub unit_cost: Option<Money>,

    #[serde(default)]
    pub line_discount: Money,

    #[serde(default)]
    pub tax_rate: TaxRate,
}

/// The document being edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDraft {
    pub kind: DocumentKind,

    /// `None` until the first successful save.
    pub id: Option<String>,

    pub header: DraftHeader,

    pub lines: Vec<DraftLine>,

    /// Sent with the first save so a retried create does not duplicate.
    pub idempotency_key: Option<String>,

    /// Changed since the last load or save.
    pub dirty: bool,
}

impl DocumentDraft {
    /// Creates an empty draft with a fresh idempotency key.
    pub fn new(kind: DocumentKind) -> Self {
        DocumentDraft {
            kind,
            id: None,
            header: DraftHeader::default(),
            lines: Vec::new(),
            idempotency_key: Some(Uuid::new_v4().to_string()),
            dirty: false,
        }
    }

    /// Builds a draft from a stored delivery note.
    pub fn from_delivery_note(dn: &DeliveryNote, lines: &[DeliveryNoteLine]) -> Self {
        DocumentDraft {
            kind: DocumentKind::DeliveryNote,
            id: Some(dn.id.clone()),
            header: DraftHeader {
                supplier_id: dn.supplier_id.clone(),
                location_id: dn.location_id.clone(),
                doc_no: dn.doc_no.clone(),
                doc_date: Some(dn.doc_date),
                remark: dn.remark.clone(),
                domain_hint: dn.domain_hint,
                ..DraftHeader::default()
            },
            lines: lines
                .iter()
                .map(|l| DraftLine {
                    line_no: l.line_no,
                    sku_id: l.sku_id.clone(),
                    quantity: l.quantity,
                    unit_cost: l.provisional_unit_cost,
                    line_discount: Money::zero(),
                    tax_rate: TaxRate::zero(),
                })
                .collect(),
            idempotency_key: None,
            dirty: false,
        }
    }

    /// Builds a draft from a stored tax invoice.
    pub fn from_tax_invoice(ti: &TaxInvoice, lines: &[TaxInvoiceLine]) -> Self {
        DocumentDraft {
            kind: DocumentKind::TaxInvoice,
            id: Some(ti.id.clone()),
            header: DraftHeader {
                supplier_id: ti.supplier_id.clone(),
                location_id: ti.location_id.clone(),
                doc_no: ti.doc_no.clone(),
                doc_date: Some(ti.doc_date),
                remark: ti.remark.clone(),
                discount_amount: ti.discount_amount,
                freight_amount: ti.freight_amount,
                other_charge_amount: ti.other_charge_amount,
                ..DraftHeader::default()
            },
            lines: lines
                .iter()
                .map(|l| DraftLine {
                    line_no: l.line_no,
                    sku_id: l.sku_id.clone(),
                    quantity: l.quantity,
                    unit_cost: Some(l.unit_cost),
                    line_discount: l.line_discount,
                    tax_rate: l.tax_rate,
                })
                .collect(),
            idempotency_key: None,
            dirty: false,
        }
    }

    pub fn set_header(&mut self, header: DraftHeader) {
        self.header = header;
        self.dirty = true;
    }

    /// Appends a line and returns its number.
    pub fn add_line(&mut self, mut line: DraftLine) -> u32 {
        let line_no = self.lines.len() as u32 + 1;
        line.line_no = line_no;
        self.lines.push(line);
        self.dirty = true;
        line_no
    }

    /// Replaces line `line_no`, keeping its position.
    pub fn update_line(&mut self, line_no: u32, mut line: DraftLine) -> Result<(), DraftError> {
        let slot = self.slot(line_no)?;
        line.line_no = line_no;
        self.lines[slot] = line;
        self.dirty = true;
        Ok(())
    }

    /// Removes line `line_no`; the lines after it move up by one.
    pub fn remove_line(&mut self, line_no: u32) -> Result<(), DraftError> {
        let slot = self.slot(line_no)?;
        self.lines.remove(slot);
        self.renumber();
        self.dirty = true;
        Ok(())
    }

    /// Drops all lines and header input, keeping the kind.
    pub fn clear(&mut self) {
        *self = DocumentDraft::new(self.kind);
    }

    /// Records a successful save.
    pub fn mark_saved(&mut self, id: String) {
        self.id = Some(id);
        self.idempotency_key = None;
        self.dirty = false;
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// The delivery note save request for this draft.
    pub fn to_dn_payload(&self) -> Result<DnDraftPayload, DraftError> {
        self.expect_kind(DocumentKind::DeliveryNote)?;
        Ok(DnDraftPayload {
            id: self.id.clone(),
            supplier_id: self.header.supplier_id.clone(),
            location_id: self.header.location_id.clone(),
            doc_no: self.header.doc_no.clone(),
            doc_date: self.doc_date()?,
            remark: self.header.remark.clone(),
            domain_hint: self.header.domain_hint,
            status: None,
            idempotency_key: self.create_key(),
            lines: self
                .lines
                .iter()
                .map(|l| DnLineInput {
                    line_no: l.line_no,
                    sku_id: l.sku_id.clone(),
                    quantity: l.quantity,
                    provisional_unit_cost: l.unit_cost,
                })
                .collect(),
        })
    }

    /// The tax invoice save request for this draft.
    pub fn to_ti_payload(&self) -> Result<TiDraftPayload, DraftError> {
        self.expect_kind(DocumentKind::TaxInvoice)?;
        let lines = self
            .lines
            .iter()
            .enumerate()
            .map(|(idx, l)| {
                let unit_cost = l
                    .unit_cost
                    .ok_or_else(|| DraftError::MissingField(format!("lines[{}].unit_cost", idx)))?;
                Ok(TiLineInput {
                    line_no: l.line_no,
                    sku_id: l.sku_id.clone(),
                    quantity: l.quantity,
                    unit_cost,
                    line_discount: l.line_discount,
                    tax_rate: l.tax_rate,
                })
            })
            .collect::<Result<Vec<_>, DraftError>>()?;

        Ok(TiDraftPayload {
            id: self.id.clone(),
            supplier_id: self.header.supplier_id.clone(),
            location_id: self.header.location_id.clone(),
            doc_no: self.header.doc_no.clone(),
            doc_date: self.doc_date()?,
            remark: self.header.remark.clone(),
            discount_amount: self.header.discount_amount,
            freight_amount: self.header.freight_amount,
            other_charge_amount: self.header.other_charge_amount,
            status: None,
            idempotency_key: self.create_key(),
            lines,
        })
    }

    fn expect_kind(&self, expected: DocumentKind) -> Result<(), DraftError> {
        if self.kind != expected {
            return Err(DraftError::WrongKind {
                expected,
                actual: self.kind,
            });
        }
        Ok(())
    }

    fn doc_date(&self) -> Result<NaiveDate, DraftError> {
        self.header
            .doc_date
            .ok_or_else(|| DraftError::MissingField("doc_date".to_string()))
    }

    // Updates never carry the key.
    fn create_key(&self) -> Option<String> {
        if self.id.is_none() {
            self.idempotency_key.clone()
        } else {
            None
        }
    }

    fn slot(&self, line_no: u32) -> Result<usize, DraftError> {
        if line_no == 0 || line_no as usize > self.lines.len() {
            return Err(DraftError::NoSuchLine(line_no));
        }
        Ok(line_no as usize - 1)
    }

    fn renumber(&mut self) {
        for (idx, line) in self.lines.iter_mut().enumerate() {
            line.line_no = idx as u32 + 1;
        }
    }
}

impl Default for DocumentDraft {
    fn default() -> Self {
        DocumentDraft::new(DocumentKind::DeliveryNote)
    }
}

// =============================================================================
// DraftState
// =============================================================================

/// Shared handle to the draft being edited.
///
/// Constructed once by the host and passed to the draft commands.
#[derive(Debug, Clone, Default)]
pub struct DraftState {
    draft: Arc<Mutex<DocumentDraft>>,
}

impl DraftState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` with read access to the draft.
    pub fn with_draft<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&DocumentDraft) -> R,
    {
        let draft = self.draft.lock().unwrap_or_else(PoisonError::into_inner);
        f(&draft)
    }

    /// Runs `f` with write access to the draft.
    pub fn with_draft_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut DocumentDraft) -> R,
    {
        let mut draft = self.draft.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut draft)
    }

    /// A copy of the current draft for display.
    pub fn snapshot(&self) -> DocumentDraft {
        self.with_draft(DocumentDraft::clone)
    }

    /// Replaces the draft with a fresh one of `kind`.
    pub fn start_new(&self, kind: DocumentKind) -> DocumentDraft {
        self.with_draft_mut(|d| {
            *d = DocumentDraft::new(kind);
            d.clone()
        })
    }

    /// Replaces the draft with a loaded document.
    pub fn load(&self, draft: DocumentDraft) {
        self.with_draft_mut(|d| *d = draft);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(sku: &str, units: i64) -> DraftLine {
        DraftLine {
            line_no: 0,
            sku_id: sku.to_string(),
            quantity: Quantity::from_units(units),
            unit_cost: Some(Money::from_satang(1000)),
            line_discount: Money::zero(),
            tax_rate: TaxRate::THAI_VAT,
        }
    }

    fn header() -> DraftHeader {
        DraftHeader {
            supplier_id: Uuid::new_v4().to_string(),
            location_id: Uuid::new_v4().to_string(),
            doc_date: NaiveDate::from_ymd_opt(2025, 1, 10),
            ..DraftHeader::default()
        }
    }

    #[test]
    fn test_remove_line_renumbers() {
        let mut draft = DocumentDraft::new(DocumentKind::DeliveryNote);
        draft.add_line(line("a", 1));
        draft.add_line(line("b", 2));
        draft.add_line(line("c", 3));

        draft.remove_line(2).unwrap();

        let numbered: Vec<(u32, &str)> = draft
            .lines
            .iter()
            .map(|l| (l.line_no, l.sku_id.as_str()))
            .collect();
        assert_eq!(numbered, vec![(1, "a"), (2, "c")]);
        assert!(draft.dirty);
    }

    #[test]
    fn test_update_missing_line() {
        let mut draft = DocumentDraft::new(DocumentKind::TaxInvoice);
        draft.add_line(line("a", 1));

        assert_eq!(draft.update_line(0, line("x", 1)), Err(DraftError::NoSuchLine(0)));
        assert_eq!(draft.update_line(2, line("x", 1)), Err(DraftError::NoSuchLine(2)));
        draft.update_line(1, line("x", 4)).unwrap();
        assert_eq!(draft.lines[0].sku_id, "x");
        assert_eq!(draft.lines[0].line_no, 1);
    }

    #[test]
    fn test_payload_kind_must_match() {
        let draft = DocumentDraft::new(DocumentKind::DeliveryNote);
        assert!(matches!(
            draft.to_ti_payload(),
            Err(DraftError::WrongKind { .. })
        ));
    }

    #[test]
    fn test_payload_requires_doc_date() {
        let mut draft = DocumentDraft::new(DocumentKind::DeliveryNote);
        draft.add_line(line("a", 1));
        let err = draft.to_dn_payload().unwrap_err();
        assert_eq!(err.field(), Some("doc_date"));
    }

    #[test]
    fn test_ti_payload_requires_unit_cost() {
        let mut draft = DocumentDraft::new(DocumentKind::TaxInvoice);
        draft.set_header(header());
        draft.add_line(line("a", 1));
        draft.add_line(DraftLine {
            unit_cost: None,
            ..line("b", 1)
        });

        let err = draft.to_ti_payload().unwrap_err();
        assert_eq!(err.field(), Some("lines[1].unit_cost"));
    }

    #[test]
    fn test_idempotency_key_only_on_create() {
        let mut draft = DocumentDraft::new(DocumentKind::DeliveryNote);
        draft.set_header(header());
        draft.add_line(line("a", 1));

        let first = draft.to_dn_payload().unwrap();
        assert!(first.idempotency_key.is_some());
        assert!(first.is_create());

        draft.mark_saved("dn-1".to_string());
        let second = draft.to_dn_payload().unwrap();
        assert_eq!(second.id.as_deref(), Some("dn-1"));
        assert!(second.idempotency_key.is_none());
        assert!(!draft.dirty);
    }

    #[test]
    fn test_state_is_shared_between_clones() {
        let state = DraftState::new();
        let handle = state.clone();

        state.start_new(DocumentKind::TaxInvoice);
        handle.with_draft_mut(|d| d.add_line(line("a", 1)));

        let snapshot = state.snapshot();
        assert_eq!(snapshot.kind, DocumentKind::TaxInvoice);
        assert_eq!(snapshot.line_count(), 1);
    }
}
