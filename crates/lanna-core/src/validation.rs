//! # Validation Module
//!
//! Field validators shared by the draft payloads, match input and list
//! queries.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Web form (TypeScript)                                        │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Payload validate() (Rust)                                    │
//! │  ├── Shape: required ids, dates, non-empty lines                       │
//! │  └── THIS MODULE: per-field rules, fail-fast, field-named errors       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK / NOT NULL / UNIQUE(header_id, line_no)                     │
//! │  └── Foreign keys (suppliers, locations, skus, lines)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every validator takes the field path to report, so the same rule can
//! name `quantity` on a match and `lines[3].quantity` on a draft.
//!
//! ```rust
//! use lanna_core::validation::{validate_uuid, validate_positive_quantity};
//! use lanna_core::Quantity;
//!
//! assert!(validate_uuid("supplier_id", "not-a-uuid").is_err());
//! let err = validate_positive_quantity("lines[2].quantity", Quantity::zero()).unwrap_err();
//! assert_eq!(err.to_string(), "lines[2].quantity must be positive");
//! ```

use uuid::Uuid;

use crate::error::ValidationError;
use crate::money::Money;
use crate::quantity::{Quantity, MILLI_PER_UNIT};
use crate::types::TaxRate;
use crate::{MAX_LINE_QUANTITY_UNITS, MAX_UNIT_COST_SATANG};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Identity Validators
// =============================================================================

/// Validates a required UUID reference.
pub fn validate_uuid(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    Uuid::parse_str(value).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a UUID".to_string(),
    })?;

    Ok(())
}

/// Validates an optional UUID reference; `None` passes.
pub fn validate_optional_uuid(field: &str, value: Option<&str>) -> ValidationResult<()> {
    match value {
        Some(v) => validate_uuid(field, v),
        None => Ok(()),
    }
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates an optional free-text field against a character limit.
///
/// Counts characters, not bytes: Thai text is three bytes per character in
/// UTF-8.
pub fn validate_max_chars(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    if let Some(v) = value {
        if v.chars().count() > max {
            return Err(ValidationError::TooLong {
                field: field.to_string(),
                max,
            });
        }
    }
    Ok(())
}

/// Validates an idempotency key: non-blank, at most 100 characters.
pub fn validate_idempotency_key(value: Option<&str>) -> ValidationResult<()> {
    if let Some(v) = value {
        if v.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "idempotency_key".to_string(),
            });
        }
        validate_max_chars("idempotency_key", Some(v), 100)?;
    }
    Ok(())
}

/// Validates a search term.
///
/// ## Returns
/// The trimmed term, or `None` when nothing is left after trimming.
pub fn validate_search_term(term: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(term) = term.map(str::trim) else {
        return Ok(None);
    };

    if term.is_empty() {
        return Ok(None);
    }

    if term.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "search".to_string(),
            max: 100,
        });
    }

    Ok(Some(term.to_string()))
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line or match quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY_UNITS
pub fn validate_positive_quantity(field: &str, qty: Quantity) -> ValidationResult<()> {
    if !qty.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if qty.milli() > MAX_LINE_QUANTITY_UNITS * MILLI_PER_UNIT {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_LINE_QUANTITY_UNITS,
        });
    }

    Ok(())
}

/// Validates a money amount that may be zero but not negative
/// (unit costs, discounts, freight).
///
/// ## Rules
/// - Must not be negative
/// - Must not exceed MAX_UNIT_COST_SATANG
pub fn validate_non_negative_money(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    if amount.satang() > MAX_UNIT_COST_SATANG {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_UNIT_COST_SATANG,
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points.
///
/// ## Rules
/// - Must be between 0 and 10000 (0% to 100%)
pub fn validate_tax_rate(field: &str, rate: TaxRate) -> ValidationResult<()> {
    if rate.bps() > TaxRate::MAX_BPS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: TaxRate::MAX_BPS as i64,
        });
    }
    Ok(())
}

// =============================================================================
// Line Sequence Validator
// =============================================================================

/// Validates that line numbers are unique and run 1, 2, 3, ... in order.
///
/// ## Rules
/// - First line is 1
/// - Each following line is exactly one more than the previous
/// - A repeated number is reported as a duplicate, a jump as a gap
pub fn validate_line_sequence(line_nos: &[u32]) -> ValidationResult<()> {
    let mut seen = std::collections::HashSet::with_capacity(line_nos.len());

    for (idx, &line_no) in line_nos.iter().enumerate() {
        let field = format!("lines[{}].line_no", idx);

        if line_no == 0 {
            return Err(ValidationError::MustBePositive { field });
        }

        if !seen.insert(line_no) {
            return Err(ValidationError::Duplicate {
                field,
                value: line_no.to_string(),
            });
        }

        let expected = idx as u32 + 1;
        if line_no != expected {
            return Err(ValidationError::NotContiguous {
                field,
                expected,
                found: line_no,
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
