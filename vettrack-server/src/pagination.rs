//! Pagination for the dashboard history listing

use serde::Serialize;

/// Dashboard rows per page
pub const DASHBOARD_PAGE_SIZE: i64 = 5;

/// Pagination metadata calculated from total results
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    pub per_page: i64,
    pub total_items: i64,
    pub total_pages: i64,
    pub has_prev: bool,
    pub has_next: bool,
    /// Offset for SQL LIMIT/OFFSET query
    #[serde(skip)]
    pub offset: i64,
}

/// Calculate pagination metadata from total results and requested page
///
/// The page is clamped into [1, total_pages]; an empty result set is page 1
/// of 0.
///
/// # Examples
/// ```
/// use vettrack_server::pagination::calculate_pagination;
///
/// // 12 entries at 5 per page = 3 pages (5 + 5 + 2)
/// let p = calculate_pagination(12, 2, 5);
/// assert_eq!(p.page, 2);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 5);
///
/// // Out-of-bounds pages are clamped
/// let p = calculate_pagination(12, 99, 5);
/// assert_eq!(p.page, 3);
/// assert_eq!(p.offset, 10);
/// ```
pub fn calculate_pagination(total_items: i64, requested_page: i64, per_page: i64) -> Pagination {
    let per_page = per_page.max(1);
    let total_items = total_items.max(0);
    let total_pages = (total_items + per_page - 1) / per_page;
    let page = requested_page.max(1).min(total_pages.max(1));

    Pagination {
        page,
        per_page,
        total_items,
        total_pages,
        has_prev: page > 1,
        has_next: page < total_pages,
        offset: (page - 1) * per_page,
    }
}
