//! # Document List Repository
//!
//! Paginated list screens over the `v_dn_list` and `v_ti_list` read models.
//!
//! ## Query Shape
//! ```text
//! SELECT COUNT(*) FROM v_xx_list WHERE <predicate>           → total
//! SELECT *        FROM v_xx_list WHERE <predicate>
//!     ORDER BY <allow-listed column> <dir>, id ASC
//!     LIMIT ? OFFSET ?                                        → items
//!
//! <predicate> = 1=1
//!     [AND (doc_no LIKE ? OR supplier_name LIKE ? OR location_code LIKE ?
//!           OR location_name LIKE ? OR status LIKE ?)]         search
//!     [AND status = ?]
//!     [AND doc_date >= ?] [AND doc_date <= ?]
//! ```
//!
//! Every value is a bound parameter. The only interpolated SQL is the view
//! name and the ORDER BY clause, both produced from closed enums.

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use lanna_core::{DnListRow, DocumentKind, ListFilter, ListQuery, Page, TiListRow};

/// Text columns matched by the free-text search.
const SEARCH_COLUMNS: [&str; 5] = [
    "COALESCE(doc_no, '')",
    "supplier_name",
    "location_code",
    "location_name",
    "status",
];

/// Repository for the DN and TI list screens.
#[derive(Debug, Clone)]
pub struct DocumentListRepository {
    pool: SqlitePool,
}

impl DocumentListRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DocumentListRepository { pool }
    }

    /// One page of the delivery note list.
    pub async fn list_dns(&self, query: &ListQuery) -> DbResult<Page<DnListRow>> {
        self.list_view(DocumentKind::DeliveryNote, query).await
    }

    /// One page of the tax invoice list.
    pub async fn list_tis(&self, query: &ListQuery) -> DbResult<Page<TiListRow>> {
        self.list_view(DocumentKind::TaxInvoice, query).await
    }

    async fn list_view<T>(&self, kind: DocumentKind, query: &ListQuery) -> DbResult<Page<T>>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        query.validate()?;

        if query.filter.is_empty_range() {
            debug!(view = kind.list_view(), "Empty date range, skipping query");
            return Ok(Page::empty(query));
        }

        let pattern = query.filter.search_pattern();

        let mut count = QueryBuilder::<Sqlite>::new(format!(
            "SELECT COUNT(*) FROM {}",
            kind.list_view()
        ));
        push_predicate(&mut count, &query.filter, pattern.as_deref());
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut rows = QueryBuilder::<Sqlite>::new(format!("SELECT * FROM {}", kind.list_view()));
        push_predicate(&mut rows, &query.filter, pattern.as_deref());
        rows.push(" ORDER BY ");
        rows.push(query.sort.order_by());
        rows.push(" LIMIT ");
        rows.push_bind(query.limit());
        rows.push(" OFFSET ");
        rows.push_bind(query.offset());

        let items = rows.build_query_as::<T>().fetch_all(&self.pool).await?;

        debug!(
            view = kind.list_view(),
            page = query.page,
            page_size = query.page_size.get(),
            total,
            returned = items.len(),
            "Listed documents"
        );

        Ok(Page::new(items, total, query))
    }
}

/// Appends the WHERE clause shared by the count and row queries.
fn push_predicate(qb: &mut QueryBuilder<'_, Sqlite>, filter: &ListFilter, pattern: Option<&str>) {
    qb.push(" WHERE 1=1");

    if let Some(pattern) = pattern {
        qb.push(" AND (");
        for (i, column) in SEARCH_COLUMNS.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push(format!("LOWER({}) LIKE ", column));
            qb.push_bind(pattern.to_string());
            qb.push(r" ESCAPE '\'");
        }
        qb.push(")");
    }

    if let Some(status) = filter.status {
        qb.push(" AND status = ");
        qb.push_bind(status);
    }
    if let Some(from) = filter.date_from {
        qb.push(" AND doc_date >= ");
        qb.push_bind(from);
    }
    if let Some(to) = filter.date_to {
        qb.push(" AND doc_date <= ");
        qb.push_bind(to);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
