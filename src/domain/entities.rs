//! Domain entities mirrored from persistent storage.

use bookshelf_api_types::Book;
use serde::{Deserialize, Serialize};

/// A catalogued book. `id` is assigned by the record store on insert.
///
/// This is also the shape stored in the cache, so the serde field names are
/// part of the cache format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BookRecord {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub year: i32,
}

impl From<BookRecord> for Book {
    fn from(record: BookRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            author: record.author,
            year: record.year,
        }
    }
}
