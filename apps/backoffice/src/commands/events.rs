//! # Document Event Commands
//!
//! The UI polls `pending_events` and refreshes any open view whose document
//! changed, then acknowledges what it handled.

use tracing::{debug, info};

use crate::config::BackofficeConfig;
use crate::error::ApiResult;
use crate::state::DbState;
use lanna_core::DocumentEvent;

const DEFAULT_EVENT_BATCH: u32 = 100;

/// Unacknowledged events, oldest first.
pub async fn pending_events(db: &DbState, limit: Option<u32>) -> ApiResult<Vec<DocumentEvent>> {
    let limit = limit.unwrap_or(DEFAULT_EVENT_BATCH).clamp(1, 1000);
    let events = db.inner().document_events().pending(limit).await?;
    debug!(count = events.len(), "pending_events command");
    Ok(events)
}

pub async fn acknowledge_event(db: &DbState, event_id: &str) -> ApiResult<()> {
    db.inner().document_events().acknowledge(event_id).await?;
    Ok(())
}

/// Full event history of one document.
pub async fn document_history(db: &DbState, document_id: &str) -> ApiResult<Vec<DocumentEvent>> {
    Ok(db.inner().document_events().for_document(document_id).await?)
}

/// Deletes acknowledged events older than `events.retention_days`.
pub async fn purge_acknowledged_events(db: &DbState, config: &BackofficeConfig) -> ApiResult<u64> {
    let removed = db
        .inner()
        .document_events()
        .cleanup_acknowledged(config.events.retention_days)
        .await?;
    info!(removed, retention_days = config.events.retention_days, "Purged acknowledged events");
    Ok(removed)
}
