//! Pagination types for search endpoints.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Largest row position the database accepts as `OFFSET + LIMIT`.
const MAX_ROW: u64 = i64::MAX.unsigned_abs();

/// Request parameters for paginated queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number (1-indexed).
    #[serde(default = "default_page")]
    pub page: u64,
    /// Number of items per page.
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    10
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl PageRequest {
    /// Builds a page request from optional query values, applying defaults.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `page` or `limit` is zero, or if the
    /// requested window lies beyond the largest row the database can address.
    pub fn from_query(page: Option<u64>, limit: Option<u64>) -> Result<Self, AppError> {
        let request = Self {
            page: page.unwrap_or_else(default_page),
            limit: limit.unwrap_or_else(default_limit),
        };

        if request.page == 0 {
            return Err(AppError::Validation("page must be a positive integer".into()));
        }
        if request.limit == 0 {
            return Err(AppError::Validation("limit must be a positive integer".into()));
        }

        let end = request
            .page
            .saturating_sub(1)
            .checked_mul(request.limit)
            .and_then(|offset| offset.checked_add(request.limit));
        if end.is_none_or(|end| end > MAX_ROW) {
            return Err(AppError::Validation("page is out of range".into()));
        }

        Ok(request)
    }

    /// Calculates the offset for database queries.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.limit)
            .min(MAX_ROW)
    }

    /// Returns the limit for database queries.
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit.min(MAX_ROW)
    }
}

/// Response wrapper for paginated data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse<T> {
    /// The items in the current page.
    pub data: Vec<T>,
    /// Pagination metadata.
    pub meta: PageMeta,
}

/// Pagination metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    /// Total number of items across all pages.
    pub total: u64,
    /// Current page number.
    pub page: u64,
    /// Items per page.
    pub limit: u64,
    /// Total number of pages (zero when there are no items).
    #[serde(rename = "totalPages")]
    pub total_pages: u64,
}

impl<T> PageResponse<T> {
    /// Creates a new paginated response.
    #[must_use]
    pub fn new(data: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            data,
            meta: PageMeta {
                total,
                page: request.page,
                limit: request.limit,
                total_pages: total.div_ceil(request.limit.max(1)),
            },
        }
    }

    /// Maps every item, keeping the metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResponse<U> {
        PageResponse {
            data: self.data.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}

#[cfg(test)]
#[path = "pagination_tests.rs"]
mod tests;
