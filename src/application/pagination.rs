//! Offset pagination helpers shared by the HTTP layer, the cache keys, and the
//! record store.

use std::num::NonZeroU32;

use thiserror::Error;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("Invalid page number")]
    InvalidPage,
    #[error("Invalid limit value")]
    InvalidLimit,
}

/// A 1-based page of `limit` records. Both values are positive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    page: NonZeroU32,
    limit: NonZeroU32,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Result<Self, PaginationError> {
        let page = NonZeroU32::new(page).ok_or(PaginationError::InvalidPage)?;
        let limit = NonZeroU32::new(limit).ok_or(PaginationError::InvalidLimit)?;
        Ok(Self { page, limit })
    }

    /// Parse raw query-string values, applying defaults for absent ones.
    ///
    /// Anything other than a bare positive integer that fits in `u32` is
    /// rejected; surrounding whitespace is not stripped.
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> Result<Self, PaginationError> {
        let page = parse_positive(page, DEFAULT_PAGE).ok_or(PaginationError::InvalidPage)?;
        let limit = parse_positive(limit, DEFAULT_LIMIT).ok_or(PaginationError::InvalidLimit)?;
        Self::new(page, limit)
    }

    pub fn page(&self) -> u32 {
        self.page.get()
    }

    pub fn limit(&self) -> u32 {
        self.limit.get()
    }

    /// Number of records that precede this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.get() - 1) * u64::from(self.limit.get())
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: NonZeroU32::MIN,
            limit: NonZeroU32::new(DEFAULT_LIMIT).unwrap_or(NonZeroU32::MIN),
        }
    }
}

fn parse_positive(raw: Option<&str>, default: u32) -> Option<u32> {
    match raw {
        None => Some(default),
        Some(value) => value.parse::<u32>().ok().filter(|parsed| *parsed > 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_absent() {
        let request = PageRequest::parse(None, None).expect("defaults are valid");
        assert_eq!(request.page(), 1);
        assert_eq!(request.limit(), 10);
        assert_eq!(request, PageRequest::default());
    }

    #[test]
    fn offset_is_zero_on_first_page() {
        let request = PageRequest::new(1, 25).expect("valid");
        assert_eq!(request.offset(), 0);

        let request = PageRequest::new(3, 25).expect("valid");
        assert_eq!(request.offset(), 50);
    }

    #[test]
    fn rejects_non_positive_and_malformed_values() {
        assert_eq!(
            PageRequest::parse(Some("0"), None),
            Err(PaginationError::InvalidPage)
        );
        assert_eq!(
            PageRequest::parse(Some("-2"), None),
            Err(PaginationError::InvalidPage)
        );
        assert_eq!(
            PageRequest::parse(None, Some("ten")),
            Err(PaginationError::InvalidLimit)
        );
        assert_eq!(
            PageRequest::parse(Some("1"), Some("0")),
            Err(PaginationError::InvalidLimit)
        );
        assert_eq!(
            PageRequest::parse(Some(" 5"), None),
            Err(PaginationError::InvalidPage)
        );
        assert_eq!(
            PageRequest::parse(None, Some("5\n")),
            Err(PaginationError::InvalidLimit)
        );
    }

    #[test]
    fn offset_does_not_overflow_on_large_pages() {
        let request = PageRequest::new(u32::MAX, u32::MAX).expect("valid");
        assert_eq!(
            request.offset(),
            u64::from(u32::MAX - 1) * u64::from(u32::MAX)
        );
    }
}
