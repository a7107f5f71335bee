//! OpenAPI description of the HTTP surface, served at `/swagger/doc.json`.

use axum::Json;
use serde_json::{Value, json};

pub async fn openapi_document() -> Json<Value> {
    Json(document())
}

pub fn document() -> Value {
    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Bookshelf API",
            "description": "Book catalog with a read-through cache.",
            "version": env!("CARGO_PKG_VERSION")
        },
        "paths": {
            "/books": books_collection(),
            "/books/{id}": books_item(),
            "/health": health()
        },
        "components": { "schemas": schemas() }
    })
}

fn schema_ref(name: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{name}") })
}

fn json_response(description: &str, schema: Value) -> Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": schema } }
    })
}

fn error_response(description: &str) -> Value {
    json_response(description, schema_ref("Error"))
}

fn book_body() -> Value {
    json!({
        "required": true,
        "content": { "application/json": { "schema": schema_ref("BookInput") } }
    })
}

fn id_param() -> Value {
    json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "integer", "format": "int64" }
    })
}

fn query_param(name: &str, default: u32) -> Value {
    json!({
        "name": name,
        "in": "query",
        "schema": { "type": "integer", "minimum": 1, "default": default }
    })
}

fn books_collection() -> Value {
    let list = json!({
        "summary": "List books",
        "parameters": [query_param("page", 1), query_param("limit", 10)],
        "responses": {
            "200": json_response(
                "Books on the requested page",
                json!({ "type": "array", "items": schema_ref("Book") }),
            ),
            "400": error_response("Invalid page or limit"),
            "500": error_response("Internal error")
        }
    });
    let create = json!({
        "summary": "Create a book",
        "requestBody": book_body(),
        "responses": {
            "201": json_response("Created book", schema_ref("Book")),
            "400": error_response("Invalid input"),
            "500": error_response("Internal error")
        }
    });
    json!({ "get": list, "post": create })
}

fn books_item() -> Value {
    let get = json!({
        "summary": "Get a book",
        "parameters": [id_param()],
        "responses": {
            "200": json_response("The book", schema_ref("Book")),
            "400": error_response("Invalid id"),
            "404": error_response("Not found")
        }
    });
    let put = json!({
        "summary": "Replace a book",
        "parameters": [id_param()],
        "requestBody": book_body(),
        "responses": {
            "200": json_response("Updated book", schema_ref("Book")),
            "400": error_response("Invalid id or input"),
            "404": error_response("Not found")
        }
    });
    let delete = json!({
        "summary": "Delete a book",
        "parameters": [id_param()],
        "responses": {
            "200": json_response("Deleted", schema_ref("Message")),
            "400": error_response("Invalid id"),
            "404": error_response("Not found")
        }
    });
    json!({ "get": get, "put": put, "delete": delete })
}

fn health() -> Value {
    json!({
        "get": {
            "summary": "Database liveness",
            "responses": {
                "204": { "description": "Healthy" },
                "503": { "description": "Database unavailable" }
            }
        }
    })
}

fn schemas() -> Value {
    let book = json!({
        "type": "object",
        "required": ["id", "title", "author", "year"],
        "properties": {
            "id": { "type": "integer", "format": "int64" },
            "title": { "type": "string" },
            "author": { "type": "string" },
            "year": { "type": "integer", "format": "int32" }
        }
    });
    let input = json!({
        "type": "object",
        "required": ["title", "author", "year"],
        "properties": {
            "title": { "type": "string", "minLength": 1 },
            "author": { "type": "string", "minLength": 1 },
            "year": { "type": "integer", "format": "int32", "minimum": 500, "exclusiveMinimum": true }
        }
    });
    let error = json!({
        "type": "object",
        "required": ["error"],
        "properties": { "error": { "type": "string" } }
    });
    let message = json!({
        "type": "object",
        "required": ["message"],
        "properties": { "message": { "type": "string" } }
    });
    json!({ "Book": book, "BookInput": input, "Error": error, "Message": message })
}
