use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bookshelf_api_types::ErrorBody;

use crate::application::books::BookServiceError;
use crate::application::error::ErrorReport;

pub const INVALID_BOOK_ID: &str = "invalid book ID";
pub const INVALID_INPUT_DATA: &str = "invalid input data";
pub const BOOK_NOT_FOUND: &str = "book not found";
pub const INTERNAL_SERVER_ERROR: &str = "internal server error";

/// Error response rendered as `{"error": "..."}`.
///
/// `detail` never reaches the client; it is attached as an [`ErrorReport`]
/// for the response logger.
#[derive(Debug)]
pub struct ApiError {
    source: &'static str,
    status: StatusCode,
    message: String,
    detail: Option<String>,
}

impl ApiError {
    pub fn new(source: &'static str, status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            source,
            status,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn bad_request(source: &'static str, message: impl Into<String>) -> Self {
        Self::new(source, StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(source: &'static str) -> Self {
        Self::new(source, StatusCode::NOT_FOUND, BOOK_NOT_FOUND)
    }

    pub fn internal(source: &'static str, detail: impl Into<String>) -> Self {
        Self::new(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            INTERNAL_SERVER_ERROR,
        )
        .with_detail(detail)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn from_service(source: &'static str, err: BookServiceError) -> Self {
        match err {
            BookServiceError::NotFound => Self::not_found(source),
            BookServiceError::InvalidInput(message) => Self::bad_request(source, message),
            BookServiceError::Internal(detail) => Self::internal(source, detail),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(ErrorBody::new(self.message.clone()))).into_response();
        ErrorReport::from_message(
            self.source,
            self.status,
            self.detail.unwrap_or(self.message),
        )
        .attach(&mut response);
        response
    }
}
