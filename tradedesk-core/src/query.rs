//! List queries, filters and pagination

use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PER_PAGE: u32 = 10;
pub const DEFAULT_SORT_FIELD: &str = "created_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Active list filters of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub page: u32,
    pub per_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub sort_by: String,
    pub sort_order: SortOrder,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
            search: None,
            status: None,
            sort_by: DEFAULT_SORT_FIELD.to_string(),
            sort_order: SortOrder::Desc,
        }
    }
}

impl ListQuery {
    /// Query-string pairs in a stable order. Empty search text is dropped.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("per_page", self.per_page.to_string()),
        ];
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        if let Some(status) = &self.status {
            pairs.push(("status", status.clone()));
        }
        pairs.push(("sort_by", self.sort_by.clone()));
        pairs.push(("sort_order", self.sort_order.to_string()));
        pairs
    }

    /// Newest-first ordering: freshly created entities belong at the top.
    pub fn is_newest_first(&self) -> bool {
        self.sort_by == DEFAULT_SORT_FIELD && self.sort_order == SortOrder::Desc
    }
}

/// Partial filter update; only `Some` fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPatch {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
}

impl FilterPatch {
    pub fn page(page: u32) -> Self {
        Self {
            page: Some(page),
            ..Self::default()
        }
    }

    pub fn search(text: impl Into<String>) -> Self {
        Self {
            search: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Self::default()
        }
    }

    pub fn merge_into(&self, query: &mut ListQuery) {
        if let Some(page) = self.page {
            query.page = page;
        }
        if let Some(per_page) = self.per_page {
            query.per_page = per_page;
        }
        if let Some(search) = &self.search {
            query.search = Some(search.clone());
        }
        if let Some(status) = &self.status {
            query.status = Some(status.clone());
        }
        if let Some(sort_by) = &self.sort_by {
            query.sort_by = sort_by.clone();
        }
        if let Some(sort_order) = self.sort_order {
            query.sort_order = sort_order;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_count: u64,
    pub per_page: u32,
}

impl Default for PaginationMeta {
    fn default() -> Self {
        Self {
            current_page: DEFAULT_PAGE,
            total_pages: 1,
            total_count: 0,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// One page of a list response.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<E> {
    pub data: Vec<E>,
    pub pagination: PaginationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_sort_newest_first() {
        let query = ListQuery::default();
        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, 10);
        assert!(query.is_newest_first());
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let mut query = ListQuery::default();
        FilterPatch {
            status: Some("sent".to_string()),
            sort_order: Some(SortOrder::Asc),
            ..FilterPatch::default()
        }
        .merge_into(&mut query);

        assert_eq!(query.status.as_deref(), Some("sent"));
        assert_eq!(query.sort_order, SortOrder::Asc);
        assert_eq!(query.page, 1);
        assert!(!query.is_newest_first());
    }

    #[test]
    fn query_pairs_skip_blank_search() {
        let query = ListQuery {
            search: Some("  ".to_string()),
            ..ListQuery::default()
        };
        let keys: Vec<_> = query.to_pairs().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["page", "per_page", "sort_by", "sort_order"]);
    }

    #[test]
    fn persisted_filters_tolerate_missing_fields() {
        let query: ListQuery = serde_json::from_str(r#"{"status":"draft"}"#).unwrap();
        assert_eq!(query.status.as_deref(), Some("draft"));
        assert_eq!(query.per_page, DEFAULT_PER_PAGE);
    }
}
