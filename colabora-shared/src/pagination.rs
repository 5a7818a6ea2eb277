/// Offset pagination
///
/// Query-string values are parsed leniently: anything missing, non-numeric or
/// below 1 falls back to the default, so `?page=abc&limit=0` behaves like no
/// parameters at all.
///
/// # Example
///
/// ```
/// use colabora_shared::pagination::{PageParams, Pagination};
///
/// let params = PageParams::from_query(Some("2"), Some("10"));
/// assert_eq!(params.offset(), 10);
///
/// let pagination = Pagination::new(25, &params);
/// assert_eq!(pagination.total_pages, 3);
/// assert!(pagination.has_next_page);
/// assert!(pagination.has_prev_page);
/// ```

use serde::{Deserialize, Serialize};

/// Page used when none is requested
pub const DEFAULT_PAGE: i64 = 1;

/// Page size used when none is requested
pub const DEFAULT_LIMIT: i64 = 10;

/// Largest page size a client may request
pub const MAX_LIMIT: i64 = 100;

/// Validated page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    /// 1-based page number
    pub page: i64,

    /// Page size
    pub limit: i64,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

fn parse_positive(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok()).filter(|v| *v >= 1)
}

impl PageParams {
    /// Builds page parameters from raw query-string values
    pub fn from_query(page: Option<&str>, limit: Option<&str>) -> Self {
        Self {
            page: parse_positive(page).unwrap_or(DEFAULT_PAGE),
            limit: parse_positive(limit).unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT),
        }
    }

    /// Number of rows to skip
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Pagination metadata returned alongside a page of results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Total number of matching rows
    pub total: i64,

    /// Number of pages at the current page size
    pub total_pages: i64,

    /// Page that was returned
    pub current_page: i64,

    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    pub fn new(total: i64, params: &PageParams) -> Self {
        let total_pages = if total <= 0 {
            0
        } else {
            (total + params.limit - 1) / params.limit
        };

        Self {
            total,
            total_pages,
            current_page: params.page,
            has_next_page: params.page < total_pages,
            has_prev_page: params.page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_missing() {
        let params = PageParams::from_query(None, None);
        assert_eq!(params, PageParams { page: 1, limit: 10 });
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let params = PageParams::from_query(Some("abc"), Some("0"));
        assert_eq!(params, PageParams::default());

        let params = PageParams::from_query(Some("-3"), Some("-1"));
        assert_eq!(params, PageParams::default());
    }

    #[test]
    fn test_limit_is_capped() {
        let params = PageParams::from_query(Some("1"), Some("5000"));
        assert_eq!(params.limit, MAX_LIMIT);
    }

    #[test]
    fn test_offset() {
        let params = PageParams::from_query(Some("3"), Some("20"));
        assert_eq!(params.offset(), 40);
    }

    #[test]
    fn test_pagination_middle_page() {
        let params = PageParams { page: 2, limit: 10 };
        let p = Pagination::new(25, &params);

        assert_eq!(p.total, 25);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.current_page, 2);
        assert!(p.has_next_page);
        assert!(p.has_prev_page);
    }

    #[test]
    fn test_pagination_exact_multiple() {
        let p = Pagination::new(20, &PageParams { page: 2, limit: 10 });
        assert_eq!(p.total_pages, 2);
        assert!(!p.has_next_page);
    }

    #[test]
    fn test_pagination_empty() {
        let p = Pagination::new(0, &PageParams::default());
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_next_page);
        assert!(!p.has_prev_page);
    }

    #[test]
    fn test_pagination_past_the_end() {
        let p = Pagination::new(5, &PageParams { page: 4, limit: 10 });
        assert_eq!(p.total_pages, 1);
        assert!(!p.has_next_page);
        assert!(p.has_prev_page);
    }
}
