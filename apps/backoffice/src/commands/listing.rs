//! # List Commands
//!
//! Paged, filtered and sorted DN / TI lists.
//!
//! ## Request Shape
//! ```json
//! {
//!   "filter": { "search": "สยาม", "status": "DRAFT",
//!               "date_from": "2025-01-01", "date_to": "2025-01-31" },
//!   "sort": { "column": "doc_date", "direction": "desc" },
//!   "page": 1,
//!   "pageSize": 50
//! }
//! ```
//! Every field is optional. A missing page size uses
//! `lists.default_page_size` from the config.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::config::BackofficeConfig;
use crate::error::ApiResult;
use crate::state::DbState;
use lanna_core::{DnListRow, ListFilter, ListQuery, Page, PageSize, SortSpec, TiListRow};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest {
    #[serde(default)]
    pub filter: ListFilter,

    #[serde(default)]
    pub sort: SortSpec,

    /// 1-based; defaults to the first page.
    #[serde(default)]
    pub page: Option<u32>,

    #[serde(default)]
    pub page_size: Option<u32>,
}

impl ListRequest {
    /// Resolves defaults and checks the page size against the allow-list.
    pub fn into_query(self, config: &BackofficeConfig) -> ApiResult<ListQuery> {
        let page_size = match self.page_size {
            Some(size) => PageSize::try_from(size)?,
            None => config.default_page_size(),
        };

        let query = ListQuery {
            filter: self.filter,
            sort: self.sort,
            page: self.page.unwrap_or(1),
            page_size,
        };
        query.validate()?;
        Ok(query)
    }
}

pub async fn list_dns(
    db: &DbState,
    config: &BackofficeConfig,
    request: ListRequest,
) -> ApiResult<Page<DnListRow>> {
    let query = request.into_query(config)?;
    let start = Instant::now();

    let page = db.inner().document_lists().list_dns(&query).await?;

    debug!(
        total = page.total,
        rows = page.items.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "list_dns command"
    );
    Ok(page)
}

pub async fn list_tis(
    db: &DbState,
    config: &BackofficeConfig,
    request: ListRequest,
) -> ApiResult<Page<TiListRow>> {
    let query = request.into_query(config)?;
    let start = Instant::now();

    let page = db.inner().document_lists().list_tis(&query).await?;

    debug!(
        total = page.total,
        rows = page.items.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "list_tis command"
    );
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_missing_page_size_uses_config() {
        let mut config = BackofficeConfig::default();
        config.lists.default_page_size = 50;

        let query = ListRequest::default().into_query(&config).unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size.get(), 50);
    }

    #[test]
    fn test_page_size_outside_allow_list() {
        let request = ListRequest {
            page_size: Some(30),
            ..ListRequest::default()
        };
        let err = request
            .into_query(&BackofficeConfig::default())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.field.as_deref(), Some("page_size"));
    }

    #[test]
    fn test_page_zero_rejected() {
        let request = ListRequest {
            page: Some(0),
            ..ListRequest::default()
        };
        assert!(request.into_query(&BackofficeConfig::default()).is_err());
    }
}
