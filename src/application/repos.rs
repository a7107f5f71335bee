//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::application::pagination::PageRequest;
use crate::domain::entities::BookRecord;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateBookParams {
    pub title: String,
    pub author: String,
    pub year: i32,
}

#[derive(Debug, Clone)]
pub struct UpdateBookParams {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub year: i32,
}

/// Record store for books.
///
/// `update_book` and `delete_book` report a missing row as
/// [`RepoError::NotFound`] so callers can tell it apart from other failures.
#[async_trait]
pub trait BooksRepo: Send + Sync {
    async fn list_books(&self, page: PageRequest) -> Result<Vec<BookRecord>, RepoError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<BookRecord>, RepoError>;

    async fn create_book(&self, params: CreateBookParams) -> Result<BookRecord, RepoError>;

    async fn update_book(&self, params: UpdateBookParams) -> Result<BookRecord, RepoError>;

    async fn delete_book(&self, id: i64) -> Result<(), RepoError>;
}
