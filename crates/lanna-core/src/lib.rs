//! # lanna-core: Pure Business Logic for the Purchasing Back-Office
//!
//! This crate holds the rules of the purchasing document workflow as pure
//! functions and plain types. It never touches the database.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Lanna Back-Office Architecture                      │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Web UI (Thai back-office)                    │   │
//! │  │    DN form ──► TI form ──► Matching screen ──► List screens     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ in-process calls                       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 apps/backoffice (commands)                      │   │
//! │  │    save_dn_draft, post_ti, add_match, list_dns, ...             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ lanna-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   types     money/quantity   draft     matching   query  totals │   │
//! │  │   status    satang, milli    payload   allocation paging  VAT   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    lanna-db (Database Layer)                    │   │
//! │  │      SQLite repositories, posting engine, event outbox          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Documents, lines, matches, statuses, reference data
//! - [`money`] - Money in satang (integer, no floating point)
//! - [`quantity`] - Fixed-point quantities in thousandths
//! - [`draft`] - Draft payloads submitted by the DN / TI forms
//! - [`matching`] - Match input and over-allocation rules
//! - [`query`] - List filters, sort allow-list and paging
//! - [`totals`] - Tax invoice totals used when posting
//! - [`validation`] - Field validators
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use lanna_core::{Money, Quantity, TaxRate};
//!
//! let unit_cost = Money::from_satang(1250); // ฿12.50
//! let qty: Quantity = "2.5".parse().unwrap();
//!
//! let line = unit_cost.times_quantity(qty);
//! assert_eq!(line.satang(), 3125);
//!
//! let vat = line.calculate_tax(TaxRate::THAI_VAT);
//! assert_eq!(vat.satang(), 219);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod draft;
pub mod error;
pub mod matching;
pub mod money;
pub mod quantity;
pub mod query;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use draft::{DnDraftPayload, DnLineInput, TiDraftPayload, TiLineInput};
pub use error::{CoreError, CoreResult, ValidationError};
pub use matching::{MatchSummaryLine, NewMatch};
pub use money::Money;
pub use quantity::Quantity;
pub use query::{ListFilter, ListQuery, Page, PageSize, SortColumn, SortDirection, SortSpec};
pub use totals::{HeaderAdjustments, TiLineAmounts, TiTotals};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines accepted in a single DN or TI save.
///
/// ## Business Reason
/// Purchasing documents from suppliers rarely exceed a few dozen lines.
/// The cap keeps a runaway form from producing an unbounded insert batch.
pub const MAX_DOCUMENT_LINES: usize = 500;

/// Maximum quantity on a single line, in whole units.
pub const MAX_LINE_QUANTITY_UNITS: i64 = 10_000_000;

/// Maximum unit cost, line discount or header adjustment, in satang (฿1,000,000,000).
///
/// With MAX_LINE_QUANTITY_UNITS this keeps every single line amount inside
/// `i64`; document totals are still summed with checked arithmetic.
pub const MAX_UNIT_COST_SATANG: i64 = 100_000_000_000;

/// Maximum length of a human-readable document number.
pub const MAX_DOC_NO_LEN: usize = 50;

/// Maximum length of a free-text remark.
pub const MAX_REMARK_LEN: usize = 1000;
