//! # State Module
//!
//! State objects the host constructs once and passes to each command.
//! There is no global: a command names exactly the state it reads.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────────┐  ┌──────────────────────┐      │
//! │  │   DbState    │  │   DraftState     │  │  BackofficeConfig    │      │
//! │  │              │  │                  │  │  (crate::config)     │      │
//! │  │  Database    │  │  Arc<Mutex<      │  │  page size, log      │      │
//! │  │  (SQLite     │  │   DocumentDraft  │  │  filter, retention   │      │
//! │  │   pool)      │  │  >>              │  │                      │      │
//! │  └──────────────┘  └──────────────────┘  └──────────────────────┘      │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • DbState: the pool is thread-safe                                    │
//! │  • DraftState: one writer at a time through the Mutex                  │
//! │  • BackofficeConfig: read-only after startup                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod db;
mod draft;

pub use db::DbState;
pub use draft::{DocumentDraft, DraftError, DraftHeader, DraftLine, DraftState};
