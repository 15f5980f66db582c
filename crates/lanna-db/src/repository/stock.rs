//! # Stock Movement Repository
//!
//! Read access to the inventory effects written by posting. Rows are only
//! ever inserted by the posting engine; nothing here mutates them.

use sqlx::SqlitePool;

use crate::error::DbResult;
use lanna_core::{Quantity, StockMovement};

/// Repository for stock movement rows.
#[derive(Debug, Clone)]
pub struct StockMovementRepository {
    pool: SqlitePool,
}

impl StockMovementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockMovementRepository { pool }
    }

    /// Movements written for one source document.
    pub async fn list_for_document(&self, source_id: &str) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, sku_id, location_id, domain, qty_delta, unit_cost,
                   source_kind, source_id, source_line_id, created_at
            FROM stock_movements
            WHERE source_id = ?1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(source_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Net quantity of a SKU at a location across both domains.
    pub async fn on_hand(&self, sku_id: &str, location_id: &str) -> DbResult<Quantity> {
        let milli: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(qty_delta), 0)
            FROM stock_movements
            WHERE sku_id = ?1 AND location_id = ?2
            "#,
        )
        .bind(sku_id)
        .bind(location_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Quantity::from_milli(milli))
    }
}
