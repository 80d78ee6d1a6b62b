//! Pagination utilities
//!
//! Pages are 1-indexed and never clamped: a page past the end yields an
//! empty result with the requested page number and the real total.

use serde::Serialize;

/// Default page size when `page_size` is omitted
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Validated page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    /// Rows to skip before this page, saturating for pages far past any catalog
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

/// Pagination metadata returned alongside a page of results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub total_pages: i64,
}

/// Build pagination metadata for a page of `total` results
///
/// # Examples
/// ```
/// use songs_api::pagination::{calculate_pagination, PageRequest};
///
/// let p = calculate_pagination(PageRequest { page: 2, page_size: 20 }, 45);
/// assert_eq!(p.total_pages, 3);
///
/// // Out-of-range pages are reported as requested
/// let p = calculate_pagination(PageRequest { page: 9, page_size: 20 }, 45);
/// assert_eq!(p.page, 9);
/// ```
pub fn calculate_pagination(request: PageRequest, total: i64) -> Pagination {
    let total_pages = if total > 0 {
        (total + request.page_size - 1) / request.page_size
    } else {
        0
    };

    Pagination {
        page: request.page,
        page_size: request.page_size,
        total,
        total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(page: i64, page_size: i64) -> PageRequest {
        PageRequest { page, page_size }
    }

    #[test]
    fn test_offset() {
        assert_eq!(request(1, 20).offset(), 0);
        assert_eq!(request(3, 20).offset(), 40);
    }

    #[test]
    fn test_offset_saturates_for_huge_page() {
        assert_eq!(request(1_000_000_000_000_000_000, 100).offset(), i64::MAX);
        assert_eq!(request(i64::MAX, 100).offset(), i64::MAX);
    }

    #[test]
    fn test_pagination_normal() {
        let p = calculate_pagination(request(2, 100), 250);
        assert_eq!(p.page, 2);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.total, 250);
    }

    #[test]
    fn test_pagination_exact_page_boundary() {
        let p = calculate_pagination(request(2, 100), 200);
        assert_eq!(p.total_pages, 2);
    }

    #[test]
    fn test_pagination_beyond_last_page_is_not_clamped() {
        let p = calculate_pagination(request(999, 20), 3);
        assert_eq!(p.page, 999);
        assert_eq!(p.total_pages, 1);
    }

    #[test]
    fn test_pagination_empty() {
        let p = calculate_pagination(request(1, 20), 0);
        assert_eq!(p.page, 1);
        assert_eq!(p.total_pages, 0);
    }
}
