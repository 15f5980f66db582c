//! # lanna-db: Database Layer for the Lanna Back-Office
//!
//! SQLite persistence for purchasing documents, via sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Purchasing Data Flow                                │
//! │                                                                         │
//! │  Back-office command (save_dn_draft, post_document, add_match, ...)    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     lanna-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌────────────┐  ┌──────────────────┐  ┌──────────────────┐   │   │
//! │  │   │  Database  │  │   Repositories   │  │  StatusGate      │   │   │
//! │  │   │  (pool.rs) │  │                  │  │    │             │   │   │
//! │  │   │            │◄─│ DeliveryNoteRepo │  │    ▼             │   │   │
//! │  │   │ SqlitePool │  │ TaxInvoiceRepo   │  │  PostingEngine   │   │   │
//! │  │   │ Migrations │  │ MatchRepo        │  │  (stock, totals) │   │   │
//! │  │   │            │  │ DocumentListRepo │  │                  │   │   │
//! │  │   └────────────┘  └──────────────────┘  └──────────────────┘   │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL, foreign keys on)                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool and repository accessors
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Draft stores, matching, list queries, reference data
//! - [`posting`] - Posting engine trait and SQLite implementation
//! - [`gate`] - Status gate for post and void
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lanna_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/lanna.db")).await?;
//! let id = db.delivery_notes().save_draft(&payload).await?;
//! db.status_gate().post(DocumentKind::DeliveryNote, &id, "somchai").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod gate;
pub mod migrations;
pub mod pool;
pub mod posting;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use gate::StatusGate;
pub use pool::{Database, DbConfig};
pub use posting::{PostingEngine, PostingError, PostingResult, SqlitePostingEngine};

pub use repository::delivery_note::DeliveryNoteRepository;
pub use repository::events::DocumentEventRepository;
pub use repository::listing::DocumentListRepository;
pub use repository::matching::MatchRepository;
pub use repository::reference::{LocationRepository, SkuRepository, SupplierRepository};
pub use repository::stock::StockMovementRepository;
pub use repository::tax_invoice::TaxInvoiceRepository;
