//! Pagination helpers
//!
//! Pushes limit/offset into the query text so the upstream returns one page
//! instead of the whole result set. The executor's row cap remains the
//! fallback bound for queries that cannot be paged.

use serde::Serialize;

/// Largest page size accepted by default.
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 1000;

// == Page ==
/// A 1-based page number and a page size, both clamped on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    /// Clamps `number` to at least 1 and `size` to `1..=max_size`.
    pub fn new(number: u32, size: u32, max_size: u32) -> Self {
        Self {
            number: number.max(1),
            size: size.clamp(1, max_size.max(1)),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.size)
    }

    /// Wraps `sql` so the upstream returns only this page.
    pub fn apply(&self, sql: &str) -> String {
        format!(
            "SELECT * FROM ({}) paged_data LIMIT {} OFFSET {}",
            sql,
            self.size,
            self.offset()
        )
    }

    pub fn total_pages(&self, total_rows: u64) -> u64 {
        total_rows.div_ceil(u64::from(self.size))
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(1, 100, DEFAULT_MAX_PAGE_SIZE)
    }
}

/// Wraps `sql` into a query returning its row count as `total`.
pub fn count_query(sql: &str) -> String {
    format!("SELECT COUNT(*) AS total FROM ({}) count_data", sql)
}
