use async_trait::async_trait;

use crate::{
    application::pagination::PageRequest,
    application::repos::{BooksRepo, CreateBookParams, RepoError, UpdateBookParams},
    domain::entities::BookRecord,
};

use super::{SqliteRepositories, map_sqlx_error};

#[async_trait]
impl BooksRepo for SqliteRepositories {
    async fn list_books(&self, page: PageRequest) -> Result<Vec<BookRecord>, RepoError> {
        // No table can hold more rows than an i64 offset addresses.
        let Ok(offset) = i64::try_from(page.offset()) else {
            return Ok(Vec::new());
        };

        sqlx::query_as::<_, BookRecord>(
            r#"
            SELECT id, title, author, year
            FROM books
            ORDER BY id
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(i64::from(page.limit()))
        .bind(offset)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<BookRecord>, RepoError> {
        sqlx::query_as::<_, BookRecord>(
            r#"
            SELECT id, title, author, year
            FROM books
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn create_book(&self, params: CreateBookParams) -> Result<BookRecord, RepoError> {
        sqlx::query_as::<_, BookRecord>(
            r#"
            INSERT INTO books (title, author, year)
            VALUES (?, ?, ?)
            RETURNING id, title, author, year
            "#,
        )
        .bind(params.title)
        .bind(params.author)
        .bind(params.year)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn update_book(&self, params: UpdateBookParams) -> Result<BookRecord, RepoError> {
        let record = sqlx::query_as::<_, BookRecord>(
            r#"
            UPDATE books
            SET title = ?, author = ?, year = ?
            WHERE id = ?
            RETURNING id, title, author, year
            "#,
        )
        .bind(params.title)
        .bind(params.author)
        .bind(params.year)
        .bind(params.id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        record.ok_or(RepoError::NotFound)
    }

    async fn delete_book(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
