//! Book invariants enforced before anything reaches the record store.

use super::error::DomainError;

/// Books published before this year are rejected.
pub const MIN_PUBLICATION_YEAR_EXCLUSIVE: i32 = 500;

/// Validated fields of a book about to be created or updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub year: i32,
}

impl BookDraft {
    /// Trim and validate raw input.
    pub fn parse(title: &str, author: &str, year: i32) -> Result<Self, DomainError> {
        let title = required("title", title)?;
        let author = required("author", author)?;

        if year <= MIN_PUBLICATION_YEAR_EXCLUSIVE {
            return Err(DomainError::validation(format!(
                "year must be greater than {MIN_PUBLICATION_YEAR_EXCLUSIVE}"
            )));
        }

        Ok(Self {
            title,
            author,
            year,
        })
    }
}

fn required(field: &'static str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}
