//! # Commands Module
//!
//! Async functions the web UI host calls in-process.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs         ◄─── You are here (exports)
//! ├── purchasing.rs  ◄─── save / get / post / void DN and TI
//! ├── matching.rs    ◄─── add / delete / list matches
//! ├── listing.rs     ◄─── DN and TI list screens
//! ├── draft.rs       ◄─── draft editing and submit
//! └── events.rs      ◄─── document event outbox
//! ```
//!
//! ## State Injection
//! Each command takes only the state it needs:
//! ```rust,ignore
//! // Only needs database
//! purchasing::get_dn(&db, &id).await?;
//!
//! // Database plus config (default page size)
//! listing::list_dns(&db, &config, request).await?;
//!
//! // Database plus the open draft
//! draft::submit_draft(&db, &drafts).await?;
//! ```
//!
//! Every command returns `ApiResult<T>`; the error serializes as
//! `{ code, message, field? }`.

pub mod draft;
pub mod events;
pub mod listing;
pub mod matching;
pub mod purchasing;
