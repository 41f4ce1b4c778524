//! Offset pagination value objects.

use super::errors::require_range;
use super::ValidationError;

/// Largest page size any listing accepts.
pub const MAX_PER_PAGE: u32 = 100;

/// A validated 1-based page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    per_page: u32,
}

impl PageRequest {
    /// Creates a page window; `page >= 1` and `per_page` in `[1, 100]`.
    pub fn new(page: u32, per_page: u32) -> Result<Self, ValidationError> {
        if page < 1 {
            return Err(ValidationError::out_of_range("page", 1, u32::MAX as usize, page as usize));
        }
        validate_per_page(per_page)?;
        Ok(Self { page, per_page })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Number of records before this window.
    pub fn skip(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.per_page)
    }
}

/// Checks a page size against `[1, 100]`.
pub fn validate_per_page(per_page: u32) -> Result<(), ValidationError> {
    require_range("per_page", per_page as usize, 1, MAX_PER_PAGE as usize)
}

/// One page of results plus the size of the whole filtered set.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64) -> Self {
        Self { items, total }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_skips_nothing() {
        let page = PageRequest::new(1, 20).unwrap();
        assert_eq!(page.skip(), 0);
        assert_eq!(page.limit(), 20);
    }

    #[test]
    fn later_pages_skip_whole_windows() {
        let page = PageRequest::new(3, 25).unwrap();
        assert_eq!(page.skip(), 50);
    }

    #[test]
    fn page_zero_is_rejected() {
        assert!(PageRequest::new(0, 10).is_err());
    }

    #[test]
    fn per_page_bounds_are_enforced() {
        assert!(PageRequest::new(1, 0).is_err());
        assert!(PageRequest::new(1, 101).is_err());
        assert!(PageRequest::new(1, 100).is_ok());
    }
}
