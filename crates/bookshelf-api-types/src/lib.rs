//! Request and response bodies exchanged with the bookshelf HTTP API.

use serde::{Deserialize, Serialize};

/// A book as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub year: i32,
}

/// Body accepted by `POST /books` and `PUT /books/{id}`.
///
/// Any `id` supplied by the client is ignored; the path or the store decides it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub year: i32,
}

/// Query string of `GET /books`.
///
/// Values are kept as raw strings so that the server can report malformed
/// numbers with its own messages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_input_ignores_client_id() {
        let input: BookInput =
            serde_json::from_str(r#"{"id":42,"title":"Dune","author":"Herbert","year":1965}"#)
                .expect("input should parse");
        assert_eq!(input.title, "Dune");
        assert_eq!(input.year, 1965);
    }

    #[test]
    fn error_body_serializes_under_error_field() {
        let body = serde_json::to_value(ErrorBody::new("book not found")).expect("serialize");
        assert_eq!(body, serde_json::json!({ "error": "book not found" }));
    }
}
