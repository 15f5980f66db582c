//! # Matching Commands
//!
//! Links received DN quantities to invoiced TI quantities.
//!
//! ```text
//! DN line 1 (qty 10) ──┬── match 6 ──► TI line 1
//!                      └── match 4 ──► (no TI line yet)
//! ```
//!
//! A line can never be matched past its own quantity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::state::DbState;
use lanna_core::{DnTiMatch, MatchSummaryLine, Money, NewMatch, Quantity};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDto {
    pub id: String,
    pub ti_line_id: Option<String>,
    pub dn_line_id: String,
    pub qty_matched: Quantity,
    pub unit_cost_at_match: Money,
    pub created_at: DateTime<Utc>,
}

impl From<DnTiMatch> for MatchDto {
    fn from(m: DnTiMatch) -> Self {
        MatchDto {
            id: m.id,
            ti_line_id: m.ti_line_id,
            dn_line_id: m.dn_line_id,
            qty_matched: m.qty_matched,
            unit_cost_at_match: m.unit_cost_at_match,
            created_at: m.created_at,
        }
    }
}

/// Records a match and returns it.
///
/// ## Errors
/// - `VALIDATION_ERROR` for bad input or when a line would be over-allocated
/// - `NOT_FOUND` when the DN or TI line does not exist
/// - `STATE_CONFLICT` when the DN is void or the TI is no longer a draft
pub async fn add_match(db: &DbState, input: NewMatch) -> ApiResult<MatchDto> {
    debug!(
        dn_line_id = %input.dn_line_id,
        ti_line_id = ?input.ti_line_id,
        qty = %input.qty_matched,
        "add_match command"
    );

    let repo = db.inner().matches();
    let id = repo.add_match(&input).await?;
    let stored = repo
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::internal(format!("Match {} vanished after insert", id)))?;

    Ok(MatchDto::from(stored))
}

/// Deletes exactly one match.
pub async fn delete_match(db: &DbState, match_id: &str) -> ApiResult<()> {
    debug!(match_id = %match_id, "delete_match command");
    db.inner().matches().delete_match(match_id).await?;
    Ok(())
}

pub async fn list_matches_for_ti(db: &DbState, ti_id: &str) -> ApiResult<Vec<MatchDto>> {
    let matches = db.inner().matches().list_for_ti(ti_id).await?;
    Ok(matches.into_iter().map(MatchDto::from).collect())
}

pub async fn list_matches_for_dn_line(
    db: &DbState,
    dn_line_id: &str,
) -> ApiResult<Vec<MatchDto>> {
    let matches = db.inner().matches().list_for_dn_line(dn_line_id).await?;
    Ok(matches.into_iter().map(MatchDto::from).collect())
}

/// Matched and remaining quantity per line of a delivery note.
pub async fn dn_match_summary(db: &DbState, dn_id: &str) -> ApiResult<Vec<MatchSummaryLine>> {
    if db.inner().delivery_notes().get_by_id(dn_id).await?.is_none() {
        return Err(ApiError::not_found("Delivery note", dn_id));
    }
    Ok(db.inner().matches().dn_match_summary(dn_id).await?)
}
