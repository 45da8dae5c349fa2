//! Shared pagination types for API query parameters.
//!
//! List endpoints use page-based pagination with `page` and `size`
//! parameters. Pages are 1-based; the size is clamped to prevent both
//! zero-result queries and excessive data fetching.

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

/// Default number of items per page.
pub const DEFAULT_SIZE: i64 = 10;

/// Maximum number of items that can be requested per page.
pub const MAX_SIZE: i64 = 100;

/// Standard pagination parameters for list endpoints.
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct Pagination {
    /// 1-based page number (default: 1)
    #[param(default = 1, minimum = 1)]
    pub page: Option<i64>,

    /// Maximum number of items to return (default: 10, max: 100)
    #[param(default = 10, minimum = 1, maximum = 100)]
    pub size: Option<i64>,
}

impl Pagination {
    /// Get the page number, defaulting to 1 and never below 1.
    #[inline]
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Get the size value, clamped between 1 and [`MAX_SIZE`].
    #[inline]
    pub fn size(&self) -> i64 {
        self.size.unwrap_or(DEFAULT_SIZE).clamp(1, MAX_SIZE)
    }
}
