use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use bookshelf_api_types::{Book, BookInput, BookListQuery, MessageBody};

use crate::application::books::BookCommand;
use crate::application::pagination::PageRequest;

use super::HttpState;
use super::error::{ApiError, INVALID_BOOK_ID, INVALID_INPUT_DATA};

const SOURCE: &str = "infra::http::books";
const BOOK_DELETED: &str = "Book deleted successfully";

pub async fn list_books(
    State(state): State<HttpState>,
    Query(query): Query<BookListQuery>,
) -> Result<Json<Vec<Book>>, ApiError> {
    let page = PageRequest::parse(query.page.as_deref(), query.limit.as_deref())
        .map_err(|err| ApiError::bad_request(SOURCE, err.to_string()))?;

    let books = state
        .books
        .list(page)
        .await
        .map_err(|err| ApiError::from_service(SOURCE, err))?;

    Ok(Json(books.into_iter().map(Book::from).collect()))
}

pub async fn get_book(
    State(state): State<HttpState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Book>, ApiError> {
    let id = parse_id(&raw_id)?;

    let book = state
        .books
        .get(id)
        .await
        .map_err(|err| ApiError::from_service(SOURCE, err))?;

    Ok(Json(book.into()))
}

pub async fn create_book(
    State(state): State<HttpState>,
    payload: Result<Json<BookInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let command = parse_body(payload)?;

    let book = state
        .books
        .create(command)
        .await
        .map_err(|err| ApiError::from_service(SOURCE, err))?;

    Ok((StatusCode::CREATED, Json(Book::from(book))))
}

pub async fn update_book(
    State(state): State<HttpState>,
    Path(raw_id): Path<String>,
    payload: Result<Json<BookInput>, JsonRejection>,
) -> Result<Json<Book>, ApiError> {
    let id = parse_id(&raw_id)?;
    let command = parse_body(payload)?;

    let book = state
        .books
        .update(id, command)
        .await
        .map_err(|err| ApiError::from_service(SOURCE, err))?;

    Ok(Json(book.into()))
}

pub async fn delete_book(
    State(state): State<HttpState>,
    Path(raw_id): Path<String>,
) -> Result<Json<MessageBody>, ApiError> {
    let id = parse_id(&raw_id)?;

    state
        .books
        .delete(id)
        .await
        .map_err(|err| ApiError::from_service(SOURCE, err))?;

    Ok(Json(MessageBody::new(BOOK_DELETED)))
}

fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>().map_err(|err| {
        ApiError::bad_request(SOURCE, INVALID_BOOK_ID).with_detail(format!("{raw:?}: {err}"))
    })
}

fn parse_body(payload: Result<Json<BookInput>, JsonRejection>) -> Result<BookCommand, ApiError> {
    let Json(input) = payload.map_err(|rejection| {
        ApiError::bad_request(SOURCE, INVALID_INPUT_DATA).with_detail(rejection.body_text())
    })?;

    Ok(BookCommand {
        title: input.title,
        author: input.author,
        year: input.year,
    })
}
