use serde::Serialize;

use crate::error::{AppError, AppResult};

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// A 1-based page request with its limit clamped to 1..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub limit: i64,
}

impl PageWindow {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }

    /// Rows to skip; a page number past `i64` range is rejected instead of wrapping.
    pub fn offset(&self) -> AppResult<i64> {
        (self.page - 1)
            .checked_mul(self.limit)
            .ok_or_else(|| AppError::validation("Page is out of range"))
    }

    pub fn pagination(&self, total: i64) -> Pagination {
        Pagination::new(self.page, self.limit, total)
    }
}

#[derive(Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        Self { page, limit, total, pages: (total + limit - 1) / limit }
    }
}
