//! HTTP handlers for the books module, mounted under `/api/v1/books`.

mod payload;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use bookstore_http::AppError;
use serde_json::json;

use super::models::Book;
use super::service::BookService;
pub use payload::BookPayload;

pub fn router(service: BookService) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route(
            "/{id}",
            get(retrieve_book)
                .put(update_book)
                .patch(partial_update_book)
                .delete(destroy_book),
        )
        .with_state(service)
}

/// Ids that are not integers cannot name a book.
fn parse_id(raw: &str) -> Result<i32, AppError> {
    raw.parse::<i32>()
        .map_err(|_| AppError::not_found(format!("Book {raw} not found")))
}

async fn list_books(State(service): State<BookService>) -> Result<Json<Vec<Book>>, AppError> {
    let books = service.list().await?;
    tracing::debug!(count = books.len(), "listed books");
    Ok(Json(books))
}

async fn create_book(
    State(service): State<BookService>,
    BookPayload(payload): BookPayload,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let book = service.create(&payload).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

async fn retrieve_book(
    State(service): State<BookService>,
    Path(id): Path<String>,
) -> Result<Json<Book>, AppError> {
    let book = service.retrieve(parse_id(&id)?).await?;
    Ok(Json(book))
}

async fn update_book(
    State(service): State<BookService>,
    Path(id): Path<String>,
    BookPayload(payload): BookPayload,
) -> Result<Json<Book>, AppError> {
    let book = service.update(parse_id(&id)?, &payload).await?;
    Ok(Json(book))
}

async fn partial_update_book(
    State(service): State<BookService>,
    Path(id): Path<String>,
    BookPayload(payload): BookPayload,
) -> Result<Json<Book>, AppError> {
    let book = service.partial_update(parse_id(&id)?, &payload).await?;
    Ok(Json(book))
}

async fn destroy_book(
    State(service): State<BookService>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    service.destroy(parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn error_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn book_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/Book" }
            }
        }
    })
}

fn book_request_body(schema: &str) -> serde_json::Value {
    json!({
        "required": true,
        "content": {
            "application/json": {
                "schema": { "$ref": format!("#/components/schemas/{schema}") }
            },
            "application/x-www-form-urlencoded": {
                "schema": { "$ref": format!("#/components/schemas/{schema}") }
            }
        }
    })
}

/// OpenAPI fragment for the books endpoints, relative to the module prefix
pub fn openapi() -> serde_json::Value {
    let id_param = json!([{
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "integer" },
        "description": "Book identifier"
    }]);

    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "All books ordered by id",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "array",
                                        "items": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            }
                        },
                        "500": error_response("Internal server error")
                    }
                },
                "post": {
                    "summary": "Create a book",
                    "tags": ["Books"],
                    "requestBody": book_request_body("BookInput"),
                    "responses": {
                        "201": book_response("Book created"),
                        "400": error_response("Validation error")
                    }
                }
            },
            "/{id}/": {
                "get": {
                    "summary": "Retrieve a book",
                    "tags": ["Books"],
                    "parameters": id_param.clone(),
                    "responses": {
                        "200": book_response("Book"),
                        "404": error_response("Book not found")
                    }
                },
                "put": {
                    "summary": "Replace a book",
                    "tags": ["Books"],
                    "parameters": id_param.clone(),
                    "requestBody": book_request_body("BookInput"),
                    "responses": {
                        "200": book_response("Book updated"),
                        "400": error_response("Validation error"),
                        "404": error_response("Book not found")
                    }
                },
                "patch": {
                    "summary": "Partially update a book",
                    "tags": ["Books"],
                    "parameters": id_param.clone(),
                    "requestBody": book_request_body("BookPatch"),
                    "responses": {
                        "200": book_response("Book updated"),
                        "400": error_response("Validation error"),
                        "404": error_response("Book not found")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": id_param,
                    "responses": {
                        "204": { "description": "Book deleted" },
                        "404": error_response("Book not found")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer", "description": "Server-assigned identifier" },
                        "title": { "type": "string", "maxLength": 128 },
                        "author": { "type": "string", "maxLength": 64 },
                        "genre": { "type": "string", "maxLength": 32 },
                        "price": {
                            "type": "string",
                            "format": "decimal",
                            "example": "9.99",
                            "description": "Price between 0.00 and 9999.99"
                        }
                    },
                    "required": ["id", "title", "author", "genre", "price"]
                },
                "BookInput": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string", "maxLength": 128 },
                        "author": { "type": "string", "maxLength": 64 },
                        "genre": { "type": "string", "maxLength": 32 },
                        "price": {
                            "oneOf": [{ "type": "number" }, { "type": "string" }],
                            "description": "At most 4 digits before and 2 after the decimal point, not negative"
                        }
                    },
                    "required": ["title", "author", "price"]
                },
                "BookPatch": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string", "maxLength": 128 },
                        "author": { "type": "string", "maxLength": 64 },
                        "genre": { "type": "string", "maxLength": 32 },
                        "price": { "oneOf": [{ "type": "number" }, { "type": "string" }] }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_integer_ids_are_not_found() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert_eq!(parse_id("abc").unwrap_err().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            parse_id("99999999999").unwrap_err().status(),
            StatusCode::NOT_FOUND
        );
    }
}
