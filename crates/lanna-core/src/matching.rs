//! # Matching Rules
//!
//! Input and allocation rules for linking DN lines to TI lines.
//!
//! ## Allocation
//! ```text
//! DN line 1: qty 10
//! ├── match A: 6  (TI-001 line 1)
//! ├── match B: 3  (not yet invoiced)
//! └── match C: 2  ✗ rejected: 6 + 3 + 2 = 11 > 10
//! ```
//!
//! The same ceiling applies to a TI line when the match names one.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::quantity::Quantity;
use crate::validation::{
    validate_idempotency_key, validate_non_negative_money, validate_optional_uuid,
    validate_positive_quantity, validate_uuid, ValidationResult,
};

/// A request to record one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewMatch {
    /// `None` records a receipt awaiting its invoice.
    #[serde(default)]
    pub ti_line_id: Option<String>,

    pub dn_line_id: String,

    pub qty_matched: Quantity,

    /// Cost in effect at the moment of matching. Stored as given.
    pub unit_cost_at_match: Money,

    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl NewMatch {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_uuid("dn_line_id", &self.dn_line_id)?;
        validate_optional_uuid("ti_line_id", self.ti_line_id.as_deref())?;
        validate_positive_quantity("qty_matched", self.qty_matched)?;
        validate_non_negative_money("unit_cost_at_match", self.unit_cost_at_match)?;
        validate_idempotency_key(self.idempotency_key.as_deref())?;
        Ok(())
    }
}

/// Checks that `requested` more can be matched against a line.
///
/// ## Arguments
/// * `line` - label used in the error, e.g. "DN line 3"
/// * `quantity` - the line's own quantity
/// * `matched` - sum of existing matches on the line
/// * `requested` - quantity of the new match
pub fn check_allocation(
    line: &str,
    quantity: Quantity,
    matched: Quantity,
    requested: Quantity,
) -> CoreResult<()> {
    if matched + requested > quantity {
        return Err(CoreError::OverAllocated {
            line: line.to_string(),
            quantity,
            matched,
            requested,
        });
    }
    Ok(())
}

/// Matching progress of one DN line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MatchSummaryLine {
    pub dn_line_id: String,
    pub line_no: u32,
    pub sku_id: String,
    pub quantity: Quantity,
    pub matched: Quantity,
    pub remaining: Quantity,
}

impl MatchSummaryLine {
    pub fn new(
        dn_line_id: String,
        line_no: u32,
        sku_id: String,
        quantity: Quantity,
        matched: Quantity,
    ) -> Self {
        MatchSummaryLine {
            dn_line_id,
            line_no,
            sku_id,
            quantity,
            matched,
            remaining: quantity.saturating_remaining(matched),
        }
    }

    #[inline]
    pub fn is_fully_matched(&self) -> bool {
        self.remaining.is_zero()
    }
}
