//! Offset-based pagination.
//!
//! This module provides:
//! - limit/offset parameter handling with clamping
//! - Page metadata computation
//! - A generic paginated response envelope

use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, HiveError};

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: u64 = 50;

/// Maximum number of items per page.
pub const MAX_PAGE_SIZE: u64 = 100;

// ═══════════════════════════════════════════════════════════════════════════════
// Page Parameters
// ═══════════════════════════════════════════════════════════════════════════════

/// Limit/offset pagination parameters, clamped to sane bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
}

impl Page {
    /// Create a page, clamping the limit to `1..=MAX_PAGE_SIZE`.
    pub fn new(limit: u64, offset: u64) -> Self {
        Self {
            limit: limit.clamp(1, MAX_PAGE_SIZE),
            offset,
        }
    }

    /// Build from optional query parameters.
    pub fn from_params(limit: Option<u64>, offset: Option<u64>) -> Self {
        Self::new(limit.unwrap_or(DEFAULT_PAGE_SIZE), offset.unwrap_or(0))
    }

    /// Validate raw (unclamped) parameters.
    pub fn validate(limit: u64) -> Result<(), HiveError> {
        if limit == 0 {
            return Err(HiveError::new(
                ErrorCode::InvalidInput,
                "limit must be at least 1",
            ));
        }
        if limit > MAX_PAGE_SIZE {
            return Err(HiveError::new(
                ErrorCode::InvalidInput,
                format!("limit cannot exceed {}", MAX_PAGE_SIZE),
            ));
        }
        Ok(())
    }

    /// Apply this page to a slice of items.
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        let start = self.offset as usize;
        if start >= items.len() {
            return Vec::new();
        }
        let end = (start + self.limit as usize).min(items.len());
        items[start..end].to_vec()
    }

    /// Build metadata from a total count.
    pub fn metadata(&self, total_items: u64) -> PageMetadata {
        PageMetadata::new(self, total_items)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Page Metadata
// ═══════════════════════════════════════════════════════════════════════════════

/// Metadata about a paginated result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    pub limit: u64,
    pub offset: u64,
    pub total_items: u64,
    pub has_previous: bool,
    pub has_next: bool,
}

impl PageMetadata {
    pub fn new(page: &Page, total_items: u64) -> Self {
        Self {
            limit: page.limit,
            offset: page.offset,
            total_items,
            has_previous: page.offset > 0,
            has_next: page.offset + page.limit < total_items,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Response Envelope
// ═══════════════════════════════════════════════════════════════════════════════

/// A paginated result set with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: PageMetadata,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, page: &Page, total_items: u64) -> Self {
        Self {
            items,
            page: page.metadata(total_items),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_clamped() {
        assert_eq!(Page::new(0, 0).limit, 1);
        assert_eq!(Page::new(10_000, 0).limit, MAX_PAGE_SIZE);
        assert_eq!(Page::new(25, 5).limit, 25);
    }

    #[test]
    fn test_from_params_defaults() {
        let page = Page::from_params(None, None);
        assert_eq!(page.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(page.offset, 0);
    }

    #[test]
    fn test_slice() {
        let items: Vec<u32> = (0..10).collect();

        assert_eq!(Page::new(3, 0).slice(&items), vec![0, 1, 2]);
        assert_eq!(Page::new(3, 8).slice(&items), vec![8, 9]);
        assert!(Page::new(3, 100).slice(&items).is_empty());
    }

    #[test]
    fn test_metadata_boundaries() {
        let meta = Page::new(10, 0).metadata(25);
        assert!(!meta.has_previous);
        assert!(meta.has_next);

        let meta = Page::new(10, 20).metadata(25);
        assert!(meta.has_previous);
        assert!(!meta.has_next);

        let meta = Page::new(10, 0).metadata(0);
        assert!(!meta.has_previous);
        assert!(!meta.has_next);
    }

    #[test]
    fn test_validate() {
        assert!(Page::validate(1).is_ok());
        assert!(Page::validate(0).is_err());
        assert!(Page::validate(MAX_PAGE_SIZE + 1).is_err());
    }
}
