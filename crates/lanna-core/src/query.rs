//! # List Query Model
//!
//! Filters, sort and paging for the DN and TI list screens.
//!
//! ## Predicate Shape
//! ```text
//! WHERE ( LOWER(doc_no)        LIKE :pattern     ┐
//!      OR LOWER(supplier_name) LIKE :pattern     │ search (OR)
//!      OR LOWER(location_code) LIKE :pattern     │
//!      OR LOWER(location_name) LIKE :pattern     │
//!      OR LOWER(status)        LIKE :pattern )   ┘
//!   AND status = :status                           status filter
//!   AND doc_date >= :date_from                     date range,
//!   AND doc_date <= :date_to                       inclusive
//! ORDER BY <allow-listed column> <dir>, id ASC
//! LIMIT :page_size OFFSET (:page - 1) * :page_size
//! ```
//!
//! Sort columns come from [`SortColumn`], never from caller text, and every
//! ordering ends with `id ASC` so pages never overlap when sort values tie.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::DocumentStatus;
use crate::validation::{validate_search_term, ValidationResult};

// =============================================================================
// Sorting
// =============================================================================

/// Sortable list columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SortColumn {
    DocNo,
    DocDate,
    SupplierName,
    LocationCode,
    Status,
    LineCount,
    CreatedAt,
}

impl SortColumn {
    /// The view column this sorts by.
    pub const fn column(&self) -> &'static str {
        match self {
            SortColumn::DocNo => "doc_no",
            SortColumn::DocDate => "doc_date",
            SortColumn::SupplierName => "supplier_name",
            SortColumn::LocationCode => "location_code",
            SortColumn::Status => "status",
            SortColumn::LineCount => "line_count",
            SortColumn::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Single-column sort. Defaults to newest document date first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SortSpec {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl SortSpec {
    /// `ORDER BY` body, including the id tie-break.
    pub fn order_by(&self) -> String {
        format!("{} {}, id ASC", self.column.column(), self.direction.sql())
    }
}

impl Default for SortSpec {
    fn default() -> Self {
        SortSpec {
            column: SortColumn::DocDate,
            direction: SortDirection::Desc,
        }
    }
}

// =============================================================================
// Paging
// =============================================================================

/// A page size from the fixed set offered by the list screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PageSize(u32);

impl PageSize {
    pub const ALLOWED: [u32; 4] = [10, 20, 50, 100];

    #[inline]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize(20)
    }
}

impl TryFrom<u32> for PageSize {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if PageSize::ALLOWED.contains(&value) {
            Ok(PageSize(value))
        } else {
            Err(ValidationError::NotAllowed {
                field: "page_size".to_string(),
                allowed: PageSize::ALLOWED.iter().map(|v| v.to_string()).collect(),
            })
        }
    }
}

impl From<PageSize> for u32 {
    fn from(size: PageSize) -> u32 {
        size.0
    }
}

// =============================================================================
// Filters
// =============================================================================

/// Filters combined with AND; `search` expands to an OR over text columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ListFilter {
    #[serde(default)]
    pub search: Option<String>,

    #[serde(default)]
    pub status: Option<DocumentStatus>,

    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub date_from: Option<NaiveDate>,

    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub date_to: Option<NaiveDate>,
}

impl ListFilter {
    /// True when both bounds are set and `from > to`: nothing can match.
    pub fn is_empty_range(&self) -> bool {
        matches!((self.date_from, self.date_to), (Some(from), Some(to)) if from > to)
    }

    /// The LIKE pattern for `search`, ASCII-lowercased, with `\`, `%` and `_`
    /// escaped (pair with `ESCAPE '\'`).
    ///
    /// Only ASCII letters are folded, the same as SQLite's `LOWER()` applied
    /// to the searched columns. Other letters compare exactly.
    pub fn search_pattern(&self) -> Option<String> {
        let term = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
        let mut pattern = String::with_capacity(term.len() + 2);
        pattern.push('%');
        for c in term.to_ascii_lowercase().chars() {
            if matches!(c, '\\' | '%' | '_') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        Some(pattern)
    }
}

// =============================================================================
// List Query
// =============================================================================

/// A complete list request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ListQuery {
    #[serde(default)]
    pub filter: ListFilter,

    #[serde(default)]
    pub sort: SortSpec,

    /// 1-based.
    #[serde(default = "first_page")]
    pub page: u32,

    #[serde(default)]
    #[ts(as = "u32")]
    pub page_size: PageSize,
}

fn first_page() -> u32 {
    1
}

impl Default for ListQuery {
    fn default() -> Self {
        ListQuery {
            filter: ListFilter::default(),
            sort: SortSpec::default(),
            page: 1,
            page_size: PageSize::default(),
        }
    }
}

impl ListQuery {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.page == 0 {
            return Err(ValidationError::MustBePositive {
                field: "page".to_string(),
            });
        }
        validate_search_term(self.filter.search.as_deref())?;
        Ok(())
    }

    #[inline]
    pub fn limit(&self) -> i64 {
        self.page_size.get() as i64
    }

    #[inline]
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.limit()
    }
}

/// One page of list rows plus the totals from the count query.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub page_count: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, query: &ListQuery) -> Self {
        let size = query.page_size.get() as i64;
        let page_count = if total <= 0 { 0 } else { (total + size - 1) / size };
        Page {
            items,
            total: total.max(0),
            page: query.page,
            page_size: query.page_size.get(),
            page_count: page_count as u32,
        }
    }

    /// A page with no rows and a zero total.
    pub fn empty(query: &ListQuery) -> Self {
        Page::new(Vec::new(), 0, query)
    }
}
