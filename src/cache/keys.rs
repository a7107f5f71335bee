//! Cache key definitions.
//!
//! Rendered keys are shared with any other process reading the same store, so
//! their string form must stay bit-exact.

use std::fmt;

use crate::application::pagination::PageRequest;

/// Prefix of every single-book key.
pub const BOOK_KEY_PREFIX: &str = "book:";
/// Prefix of every listing key.
pub const BOOKS_PAGE_KEY_PREFIX: &str = "books:page_";
/// Glob matching every listing key and nothing else.
pub const BOOKS_PAGE_PATTERN: &str = "books:page_*";

/// Key of a cached value.
///
/// `Book` keys render as `book:{id}` and `BooksPage` keys as
/// `books:page_{page}_limit_{limit}`. The two namespaces never overlap: a
/// single-book key never starts with `books:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Book(i64),
    BooksPage { page: u32, limit: u32 },
}

impl CacheKey {
    pub fn book(id: i64) -> Self {
        Self::Book(id)
    }

    pub fn books_page(request: PageRequest) -> Self {
        Self::BooksPage {
            page: request.page(),
            limit: request.limit(),
        }
    }

    /// Metric label for the kind of entry behind this key.
    pub fn scope(&self) -> &'static str {
        match self {
            Self::Book(_) => "single",
            Self::BooksPage { .. } => "page",
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Book(id) => write!(f, "{BOOK_KEY_PREFIX}{id}"),
            Self::BooksPage { page, limit } => {
                write!(f, "{BOOKS_PAGE_KEY_PREFIX}{page}_limit_{limit}")
            }
        }
    }
}
