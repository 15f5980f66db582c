//! # Reference Data Repositories
//!
//! Suppliers, locations and SKUs. Purchasing documents reference them by id;
//! the list views read their names and codes; posting checks that SKUs are
//! active.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use lanna_core::{Location, Sku, Supplier};

// =============================================================================
// Suppliers
// =============================================================================

/// Repository for supplier rows.
#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    /// Inserts an active supplier.
    pub async fn insert(&self, code: &str, name: &str) -> DbResult<Supplier> {
        let supplier = Supplier {
            id: Uuid::new_v4().to_string(),
            code: code.trim().to_string(),
            name: name.trim().to_string(),
            is_active: true,
            created_at: Utc::now(),
        };

        debug!(id = %supplier.id, code = %supplier.code, "Inserting supplier");

        sqlx::query(
            r#"
            INSERT INTO suppliers (id, code, name, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&supplier.id)
        .bind(&supplier.code)
        .bind(&supplier.name)
        .bind(supplier.is_active)
        .bind(supplier.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("supplier code", code),
            other => other,
        })?;

        Ok(supplier)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>(
            "SELECT id, code, name, is_active, created_at FROM suppliers WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(supplier)
    }

    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>(
            "SELECT id, code, name, is_active, created_at FROM suppliers WHERE code = ?1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(supplier)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM suppliers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Locations
// =============================================================================

/// Repository for stock locations.
#[derive(Debug, Clone)]
pub struct LocationRepository {
    pool: SqlitePool,
}

impl LocationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LocationRepository { pool }
    }

    pub async fn insert(&self, code: &str, name: &str) -> DbResult<Location> {
        let location = Location {
            id: Uuid::new_v4().to_string(),
            code: code.trim().to_string(),
            name: name.trim().to_string(),
            is_active: true,
            created_at: Utc::now(),
        };

        debug!(id = %location.id, code = %location.code, "Inserting location");

        sqlx::query(
            r#"
            INSERT INTO locations (id, code, name, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&location.id)
        .bind(&location.code)
        .bind(&location.name)
        .bind(location.is_active)
        .bind(location.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("location code", code),
            other => other,
        })?;

        Ok(location)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Location>> {
        let location = sqlx::query_as::<_, Location>(
            "SELECT id, code, name, is_active, created_at FROM locations WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(location)
    }

    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Location>> {
        let location = sqlx::query_as::<_, Location>(
            "SELECT id, code, name, is_active, created_at FROM locations WHERE code = ?1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(location)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM locations")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// SKUs
// =============================================================================

/// Repository for stock keeping units.
#[derive(Debug, Clone)]
pub struct SkuRepository {
    pool: SqlitePool,
}

impl SkuRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SkuRepository { pool }
    }

    pub async fn insert(&self, code: &str, name: &str) -> DbResult<Sku> {
        let sku = Sku {
            id: Uuid::new_v4().to_string(),
            code: code.trim().to_string(),
            name: name.trim().to_string(),
            is_active: true,
            created_at: Utc::now(),
        };

        debug!(id = %sku.id, code = %sku.code, "Inserting SKU");

        sqlx::query(
            r#"
            INSERT INTO skus (id, code, name, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&sku.id)
        .bind(&sku.code)
        .bind(&sku.name)
        .bind(sku.is_active)
        .bind(sku.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("SKU code", code),
            other => other,
        })?;

        Ok(sku)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sku>> {
        let sku = sqlx::query_as::<_, Sku>(
            "SELECT id, code, name, is_active, created_at FROM skus WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(sku)
    }

    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Sku>> {
        let sku = sqlx::query_as::<_, Sku>(
            "SELECT id, code, name, is_active, created_at FROM skus WHERE code = ?1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(sku)
    }

    /// Activates or retires a SKU. Retired SKUs block posting.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        debug!(id = %id, active, "Setting SKU active flag");

        let result = sqlx::query("UPDATE skus SET is_active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("SKU", id));
        }
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM skus")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
