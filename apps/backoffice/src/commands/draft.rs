//! # Draft Commands
//!
//! Edit the open DN / TI form and submit it to the draft store.
//!
//! Every command returns the whole draft so the form re-renders from one
//! source of truth.

use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::state::{DbState, DocumentDraft, DraftHeader, DraftLine, DraftState};
use lanna_core::{CoreError, DocumentKind, DocumentStatus};

/// Starts an empty draft of `kind`, discarding the current one.
pub fn start_draft(drafts: &DraftState, kind: DocumentKind) -> DocumentDraft {
    debug!(kind = kind.code(), "start_draft command");
    drafts.start_new(kind)
}

pub fn get_draft(drafts: &DraftState) -> DocumentDraft {
    drafts.snapshot()
}

/// Loads a stored delivery note into the editor.
///
/// Only DRAFT documents can be opened for editing.
pub async fn open_dn_draft(db: &DbState, drafts: &DraftState, id: &str) -> ApiResult<DocumentDraft> {
    let repo = db.inner().delivery_notes();
    let dn = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Delivery note", id))?;
    ensure_editable(DocumentKind::DeliveryNote, id, dn.status)?;

    let lines = repo.get_lines(id).await?;
    let draft = DocumentDraft::from_delivery_note(&dn, &lines);
    drafts.load(draft.clone());
    Ok(draft)
}

/// Loads a stored tax invoice into the editor.
pub async fn open_ti_draft(db: &DbState, drafts: &DraftState, id: &str) -> ApiResult<DocumentDraft> {
    let repo = db.inner().tax_invoices();
    let ti = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Tax invoice", id))?;
    ensure_editable(DocumentKind::TaxInvoice, id, ti.status)?;

    let lines = repo.get_lines(id).await?;
    let draft = DocumentDraft::from_tax_invoice(&ti, &lines);
    drafts.load(draft.clone());
    Ok(draft)
}

pub fn set_draft_header(drafts: &DraftState, header: DraftHeader) -> DocumentDraft {
    drafts.with_draft_mut(|d| {
        d.set_header(header);
        d.clone()
    })
}

/// Appends a line; its `line_no` is assigned by the draft.
pub fn add_draft_line(drafts: &DraftState, line: DraftLine) -> DocumentDraft {
    drafts.with_draft_mut(|d| {
        d.add_line(line);
        d.clone()
    })
}

pub fn update_draft_line(
    drafts: &DraftState,
    line_no: u32,
    line: DraftLine,
) -> ApiResult<DocumentDraft> {
    drafts.with_draft_mut(|d| -> ApiResult<DocumentDraft> {
        d.update_line(line_no, line)?;
        Ok(d.clone())
    })
}

/// Removes a line; the lines after it are renumbered.
pub fn remove_draft_line(drafts: &DraftState, line_no: u32) -> ApiResult<DocumentDraft> {
    drafts.with_draft_mut(|d| -> ApiResult<DocumentDraft> {
        d.remove_line(line_no)?;
        Ok(d.clone())
    })
}

pub fn clear_draft(drafts: &DraftState) -> DocumentDraft {
    drafts.with_draft_mut(|d| {
        d.clear();
        d.clone()
    })
}

/// Saves the open draft through the draft store.
///
/// ## Flow
/// ```text
/// lock ─► build payload ─► unlock ─► save_draft (await) ─► lock ─► mark_saved
/// ```
/// The lock is never held across the save. If the form switched to another
/// document meanwhile, the saved id is not written back.
pub async fn submit_draft(db: &DbState, drafts: &DraftState) -> ApiResult<DocumentDraft> {
    let (kind, previous_id) = drafts.with_draft(|d| (d.kind, d.id.clone()));

    let id = match kind {
        DocumentKind::DeliveryNote => {
            let payload = drafts.with_draft(DocumentDraft::to_dn_payload)?;
            db.inner().delivery_notes().save_draft(&payload).await?
        }
        DocumentKind::TaxInvoice => {
            let payload = drafts.with_draft(DocumentDraft::to_ti_payload)?;
            db.inner().tax_invoices().save_draft(&payload).await?
        }
    };

    info!(kind = kind.code(), id = %id, "Draft submitted");

    Ok(drafts.with_draft_mut(|d| {
        if d.kind == kind && d.id == previous_id {
            d.mark_saved(id);
        }
        d.clone()
    }))
}

fn ensure_editable(kind: DocumentKind, id: &str, status: DocumentStatus) -> ApiResult<()> {
    if !status.is_editable() {
        return Err(CoreError::NotEditable {
            kind,
            id: id.to_string(),
            status,
        }
        .into());
    }
    Ok(())
}
