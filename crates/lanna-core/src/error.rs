//! # Error Types
//!
//! Domain-specific error types for lanna-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  lanna-core errors (this file)                                         │
//! │  ├── CoreError        - Domain rule failures (state, allocation)       │
//! │  └── ValidationError  - Input validation failures (field-named)        │
//! │                                                                         │
//! │  lanna-db errors (separate crate)                                      │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── PostingError     - Posting engine outcomes                        │
//! │                                                                         │
//! │  backoffice errors (app)                                               │
//! │  └── ApiError         - What the UI sees (code + message)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → UI           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (field, document id, status)
//! 3. Errors are enum variants, never String
//! 4. Every message is fit for direct display

use thiserror::Error;

use crate::quantity::Quantity;
use crate::types::{DocumentKind, DocumentStatus};

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The document is not in DRAFT and cannot be changed.
    ///
    /// ## User Workflow
    /// ```text
    /// Post DN (status: POSTED)
    ///      │
    ///      ▼
    /// NotEditable { kind: DN, status: POSTED }
    ///      │
    ///      ▼
    /// UI shows: "Delivery note ... is POSTED and can no longer be changed"
    /// ```
    #[error("{kind} {id} is {status} and can no longer be changed")]
    NotEditable {
        kind: DocumentKind,
        id: String,
        status: DocumentStatus,
    },

    /// Requested status change is not in the transition table.
    #[error("Cannot change status from {from} to {to}")]
    InvalidTransition {
        from: DocumentStatus,
        to: DocumentStatus,
    },

    /// The document's lines are referenced by match records.
    #[error("{kind} {id} has matched lines; remove its matches first")]
    DocumentHasMatches { kind: DocumentKind, id: String },

    /// A match would push a line's cumulative matched quantity past the
    /// line quantity.
    #[error(
        "{line} has quantity {quantity}, {matched} already matched; cannot match {requested} more"
    )]
    OverAllocated {
        line: String,
        quantity: Quantity,
        matched: Quantity,
        requested: Quantity,
    },

    /// A posting business rule was violated (totals, adjustments, SKUs).
    #[error("{0}")]
    PostingRule(String),

    /// Validation error (wraps ValidationError).
    #[error("{0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// True for the "someone else changed this / no longer editable" class.
    pub fn is_state_conflict(&self) -> bool {
        matches!(
            self,
            CoreError::NotEditable { .. }
                | CoreError::InvalidTransition { .. }
                | CoreError::DocumentHasMatches { .. }
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Every variant names the offending field. Line fields use an indexed path
/// such as `lines[2].quantity`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// A collection that must have entries is empty.
    #[error("{field} must not be empty")]
    Empty { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or more.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid decimal).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., duplicate line number).
    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },

    /// Line numbers must run 1, 2, 3, ... without gaps.
    #[error("{field} must be numbered from 1 without gaps: expected {expected}, found {found}")]
    NotContiguous {
        field: String,
        expected: u32,
        found: u32,
    },
}

impl ValidationError {
    /// The field path this error refers to.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::Empty { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::MustNotBeNegative { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. }
            | ValidationError::Duplicate { field, .. }
            | ValidationError::NotContiguous { field, .. } => field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_editable_message() {
        let err = CoreError::NotEditable {
            kind: DocumentKind::DeliveryNote,
            id: "dn-1".to_string(),
            status: DocumentStatus::Posted,
        };
        assert_eq!(
            err.to_string(),
            "Delivery note dn-1 is POSTED and can no longer be changed"
        );
        assert!(err.is_state_conflict());
    }

    #[test]
    fn test_over_allocated_message() {
        let err = CoreError::OverAllocated {
            line: "DN line 1".to_string(),
            quantity: Quantity::from_units(10),
            matched: Quantity::from_units(8),
            requested: Quantity::from_milli(2_500),
        };
        assert_eq!(
            err.to_string(),
            "DN line 1 has quantity 10, 8 already matched; cannot match 2.5 more"
        );
        assert!(!err.is_state_conflict());
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::MustBePositive {
            field: "lines[2].quantity".to_string(),
        };
        assert_eq!(err.to_string(), "lines[2].quantity must be positive");
        assert_eq!(err.field(), "lines[2].quantity");

        let err = ValidationError::NotContiguous {
            field: "lines[1].line_no".to_string(),
            expected: 2,
            found: 3,
        };
        assert_eq!(
            err.to_string(),
            "lines[1].line_no must be numbered from 1 without gaps: expected 2, found 3"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "sku_id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.to_string(), "sku_id is required");
    }
}
