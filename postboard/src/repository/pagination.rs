//! Pagination types for repository queries
//!
//! [`PageRequest`] is what a caller asks for, [`Pagination`] is the row window
//! handed to the store, and [`Paginator`] describes the page that came back.
//!
//! # Example
//!
//! ```rust
//! use postboard::repository::{PageRequest, Paginator};
//!
//! let request = PageRequest::clamped(3, 20);
//! assert_eq!(request.window().offset, 40);
//!
//! let paginator = Paginator::new(3, 20, 45);
//! assert_eq!(paginator.total_pages, 3);
//! assert!(!paginator.has_next());
//! ```

use serde::{Deserialize, Serialize};

/// Row window for a bounded fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Number of results to skip
    pub offset: u64,
    /// Maximum number of results to return
    pub limit: u64,
}

impl Pagination {
    #[must_use]
    pub const fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// Window for a 1-indexed page number
    ///
    /// ```rust
    /// use postboard::repository::Pagination;
    ///
    /// let page3 = Pagination::page(3, 20);
    /// assert_eq!(page3.offset, 40);
    /// assert_eq!(page3.limit, 20);
    /// ```
    #[must_use]
    pub const fn page(page_number: u64, page_size: u64) -> Self {
        let offset = page_number.saturating_sub(1).saturating_mul(page_size);
        Self {
            offset,
            limit: page_size,
        }
    }
}

/// A validated page request
///
/// Page numbers and sizes below 1 are clamped to 1 rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    #[must_use]
    pub fn clamped(page: i64, per_page: i64) -> Self {
        Self {
            page: page.max(1).unsigned_abs(),
            per_page: per_page.max(1).unsigned_abs(),
        }
    }

    #[must_use]
    pub const fn window(&self) -> Pagination {
        Pagination::page(self.page, self.per_page)
    }

    /// Describe this page of a result set with `total_rows` matches
    #[must_use]
    pub fn paginator(&self, total_rows: u64) -> Paginator {
        Paginator::new(self.page, self.per_page, total_rows)
    }
}

/// One page of a result set
///
/// `total_pages` is derived once, at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginator {
    pub current_page: u64,
    pub per_page: u64,
    pub total_rows: u64,
    pub total_pages: u64,
}

impl Paginator {
    #[must_use]
    pub fn new(current_page: u64, per_page: u64, total_rows: u64) -> Self {
        let total_pages = if per_page > 0 {
            total_rows.div_ceil(per_page)
        } else {
            1
        };
        Self {
            current_page,
            per_page,
            total_rows,
            total_pages,
        }
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    #[must_use]
    pub fn has_prev(&self) -> bool {
        self.current_page > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_page() {
        let page1 = Pagination::page(1, 20);
        assert_eq!(page1.offset, 0);
        assert_eq!(page1.limit, 20);

        let page3 = Pagination::page(3, 20);
        assert_eq!(page3.offset, 40);
    }

    #[test]
    fn test_page_request_clamps_non_positive_values() {
        let request = PageRequest::clamped(0, -5);
        assert_eq!(request.page, 1);
        assert_eq!(request.per_page, 1);
        assert_eq!(request.window(), Pagination::new(0, 1));
    }

    #[test]
    fn test_total_pages_is_ceiling() {
        for (rows, per_page, expected) in [(0, 10, 0), (1, 10, 1), (10, 10, 1), (11, 10, 2), (45, 20, 3)] {
            assert_eq!(Paginator::new(1, per_page, rows).total_pages, expected);
        }
    }

    #[test]
    fn test_zero_per_page_yields_single_page() {
        assert_eq!(Paginator::new(1, 0, 50).total_pages, 1);
    }

    #[test]
    fn test_has_next_and_prev() {
        let middle = Paginator::new(2, 10, 30);
        assert!(middle.has_next());
        assert!(middle.has_prev());

        let last = Paginator::new(3, 10, 30);
        assert!(!last.has_next());
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(Paginator::new(1, 10, 2)).unwrap();
        assert_eq!(json["currentPage"], 1);
        assert_eq!(json["perPage"], 10);
        assert_eq!(json["totalRows"], 2);
        assert_eq!(json["totalPages"], 1);
    }
}
