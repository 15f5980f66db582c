//! # Document Event Outbox
//!
//! Records every document mutation so the UI can invalidate cached views.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Outbox Pattern Implementation                        │
//! │                                                                         │
//! │  MUTATION (e.g., add_match)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │                                                                 │   │
//! │  │  1. INSERT INTO dn_ti_match (...)                               │   │
//! │  │                                                                 │   │
//! │  │  2. INSERT INTO document_events (document_kind, document_id,    │   │
//! │  │     event_type, payload) VALUES ('TI', ?, 'match_added', ?)     │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← Both succeed or both fail                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UI polls pending() → refetches the document → acknowledge(id)         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Duration, Utc};
use serde_json::Value;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use lanna_core::{DocumentEvent, DocumentEventType, DocumentKind};

/// Appends an event inside the caller's transaction.
pub(crate) async fn record_event(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    document_id: &str,
    event_type: DocumentEventType,
    payload: &Value,
) -> DbResult<()> {
    let id = Uuid::new_v4().to_string();
    let body = serde_json::to_string(payload)?;

    debug!(
        document_kind = kind.code(),
        document_id = %document_id,
        event_type = ?event_type,
        "Recording document event"
    );

    sqlx::query(
        r#"
        INSERT INTO document_events (
            id, document_kind, document_id, event_type, payload, created_at, acknowledged_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL)
        "#,
    )
    .bind(&id)
    .bind(kind)
    .bind(document_id)
    .bind(event_type)
    .bind(&body)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Repository for reading and acknowledging document events.
#[derive(Debug, Clone)]
pub struct DocumentEventRepository {
    pool: SqlitePool,
}

impl DocumentEventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DocumentEventRepository { pool }
    }

    /// Unacknowledged events, oldest first.
    ///
    /// ## Arguments
    /// * `limit` - Maximum entries to return
    pub async fn pending(&self, limit: u32) -> DbResult<Vec<DocumentEvent>> {
        let events = sqlx::query_as::<_, DocumentEvent>(
            r#"
            SELECT id, document_kind, document_id, event_type, payload,
                   created_at, acknowledged_at
            FROM document_events
            WHERE acknowledged_at IS NULL
            ORDER BY created_at ASC, id ASC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// All events of one document, oldest first.
    pub async fn for_document(&self, document_id: &str) -> DbResult<Vec<DocumentEvent>> {
        let events = sqlx::query_as::<_, DocumentEvent>(
            r#"
            SELECT id, document_kind, document_id, event_type, payload,
                   created_at, acknowledged_at
            FROM document_events
            WHERE document_id = ?1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Marks an event as consumed.
    pub async fn acknowledge(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE document_events SET acknowledged_at = ?2
            WHERE id = ?1 AND acknowledged_at IS NULL
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Pending document event", id));
        }
        Ok(())
    }

    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM document_events WHERE acknowledged_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Deletes events acknowledged more than `days_old` days ago.
    ///
    /// ## Returns
    /// Number of deleted entries.
    pub async fn cleanup_acknowledged(&self, days_old: u32) -> DbResult<u64> {
        let cutoff = Utc::now() - Duration::days(days_old as i64);

        let result = sqlx::query(
            r#"
            DELETE FROM document_events
            WHERE acknowledged_at IS NOT NULL
            AND acknowledged_at < ?1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use serde_json::json;

    #[tokio::test]
    async fn test_record_acknowledge_cleanup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        record_event(
            &mut conn,
            DocumentKind::TaxInvoice,
            "ti-1",
            DocumentEventType::MatchAdded,
            &json!({ "match_id": "m-1" }),
        )
        .await
        .unwrap();
        drop(conn);

        let events = db.document_events();
        assert_eq!(events.count_pending().await.unwrap(), 1);

        let pending = events.pending(10).await.unwrap();
        assert_eq!(pending[0].document_kind, DocumentKind::TaxInvoice);
        assert_eq!(pending[0].event_type, DocumentEventType::MatchAdded);
        assert!(pending[0].payload.contains("m-1"));

        events.acknowledge(&pending[0].id).await.unwrap();
        assert_eq!(events.count_pending().await.unwrap(), 0);
        assert!(events.acknowledge(&pending[0].id).await.is_err());

        // Acknowledged just now: nothing older than a day.
        assert_eq!(events.cleanup_acknowledged(1).await.unwrap(), 0);
        assert_eq!(events.for_document("ti-1").await.unwrap().len(), 1);
    }
}
