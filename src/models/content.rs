//! Content request and response types

use crate::content::BulkAction;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;
pub const MAX_PAGE: i64 = 100_000;

/// Query string accepted by list endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub featured: Option<bool>,
    pub parent_id: Option<i32>,
    pub category: Option<String>,
    pub platform: Option<String>,
}

impl ListQuery {
    /// Page number and size after clamping
    pub fn pagination(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).clamp(1, MAX_PAGE);
        let per_page = self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
        (page, per_page)
    }

    /// Row offset of the clamped page
    pub fn offset(&self) -> i64 {
        let (page, per_page) = self.pagination();
        (page - 1) * per_page
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Query string for single-item reads
#[derive(Debug, Default, Deserialize)]
pub struct ItemQuery {
    pub include: Option<String>,
}

impl ItemQuery {
    pub fn include_children(&self) -> bool {
        self.include
            .as_deref()
            .map(|v| v.split(',').any(|part| part.trim() == "children"))
            .unwrap_or(false)
    }
}

/// One page of results
#[derive(Debug, Serialize)]
pub struct Page<T: Serialize> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl<T: Serialize> Page<T> {
    pub fn new(items: Vec<T>, total: i64, page: i64, per_page: i64) -> Self {
        let total_pages = if total == 0 { 0 } else { (total + per_page - 1) / per_page };
        Self {
            items,
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

/// Body of a bulk action request
#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub action: BulkAction,
    pub ids: Vec<i32>,
}

/// Summary of a deleted row
#[derive(Debug, Clone, Serialize)]
pub struct DeletedSummary {
    pub id: i32,
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub descendants_deleted: u64,
}

#[derive(Debug, Deserialize)]
pub struct SlugCheckQuery {
    pub slug: String,
    pub exclude_id: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct SlugCheckResponse {
    pub slug: String,
    pub available: bool,
    pub suggestion: String,
}

/// Per-resource totals for the admin dashboard
#[derive(Debug, Serialize)]
pub struct ResourceStats {
    pub resource: &'static str,
    pub label: &'static str,
    pub total: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<i64>,
}

/// Category with item count for the commands library
#[derive(Debug, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_clamps() {
        let query = ListQuery { page: Some(0), per_page: Some(1000), ..Default::default() };
        assert_eq!(query.pagination(), (1, MAX_PER_PAGE));
        assert_eq!(ListQuery::default().pagination(), (1, DEFAULT_PER_PAGE));
    }

    #[test]
    fn test_huge_page_is_clamped() {
        let query = ListQuery { page: Some(i64::MAX), per_page: Some(100), ..Default::default() };
        assert_eq!(query.pagination(), (MAX_PAGE, 100));
        assert_eq!(query.offset(), (MAX_PAGE - 1) * 100);

        let query = ListQuery { page: Some(i64::MIN), per_page: Some(i64::MIN), ..Default::default() };
        assert_eq!(query.offset(), 0);
        assert_eq!(ListQuery { page: Some(3), ..Default::default() }.offset(), 40);
    }

    #[test]
    fn test_page_counts() {
        let page: Page<i32> = Page::new(vec![1, 2], 41, 1, 20);
        assert_eq!(page.total_pages, 3);
        let empty: Page<i32> = Page::new(vec![], 0, 1, 20);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn test_include_children() {
        let query = ItemQuery { include: Some("author, children".into()) };
        assert!(query.include_children());
        assert!(!ItemQuery::default().include_children());
    }

    #[test]
    fn test_search_term_ignores_blank() {
        let query = ListQuery { search: Some("   ".into()), ..Default::default() };
        assert_eq!(query.search_term(), None);
    }
}
