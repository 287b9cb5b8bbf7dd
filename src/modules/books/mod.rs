pub mod models;
pub mod routes;
pub mod store;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookshelf_kernel::{InitCtx, Migration, Module};

pub use models::{Book, NewBook};
pub use store::{BookStore, CatalogError, Shelf};

/// Book catalog: paginated listing, lookup, title search, creation, rating
/// updates and deletion over the `books` table.
pub struct BooksModule {
    store: BookStore,
}

impl BooksModule {
    pub fn new(store: BookStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            books_per_shelf = self.store.books_per_shelf(),
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.store.clone())
    }

    /// Serves `/books` at the server root.
    fn route_prefix(&self) -> Option<String> {
        None
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_create_books",
            up: r#"
                CREATE TABLE IF NOT EXISTS books (
                    id     INTEGER PRIMARY KEY AUTOINCREMENT,
                    title  TEXT NOT NULL,
                    author TEXT NOT NULL,
                    rating INTEGER
                );
                "#,
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module(store: BookStore) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(store))
}

fn error_response(description: &str) -> serde_json::Value {
    serde_json::json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn ok_response(description: &str, schema: &str) -> serde_json::Value {
    serde_json::json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": format!("#/components/schemas/{schema}") }
            }
        }
    })
}

fn openapi_fragment() -> serde_json::Value {
    let page_param = serde_json::json!({
        "name": "page",
        "in": "query",
        "required": false,
        "description": "1-based shelf number, 8 books per shelf",
        "schema": { "type": "integer", "default": 1 }
    });
    let id_param = serde_json::json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "integer" }
    });
    let book_list_schema = |extra: serde_json::Value| {
        let mut schema = serde_json::json!({
            "type": "object",
            "properties": {
                "success": { "type": "boolean" },
                "books": {
                    "type": "array",
                    "items": { "$ref": "#/components/schemas/Book" }
                },
                "total_books": { "type": "integer" }
            },
            "required": ["success", "books", "total_books"]
        });
        let props = schema["properties"].as_object_mut();
        if let (Some(props), Some(extra)) = (props, extra.as_object()) {
            for (key, value) in extra {
                props.insert(key.clone(), value.clone());
            }
        }
        schema
    };

    serde_json::json!({
        "paths": {
            "/books": {
                "get": {
                    "summary": "List books, one shelf at a time",
                    "tags": ["Books"],
                    "parameters": [page_param.clone()],
                    "responses": {
                        "200": ok_response("One shelf of books", "BookList"),
                        "500": error_response("Store failure")
                    }
                },
                "post": {
                    "summary": "Create a book, or search titles when `search` is set",
                    "tags": ["Books"],
                    "parameters": [page_param.clone()],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/BookRequest" }
                            }
                        }
                    },
                    "responses": {
                        "200": {
                            "description": "Search results, or the shelf after creation",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "oneOf": [
                                            { "$ref": "#/components/schemas/BookList" },
                                            { "$ref": "#/components/schemas/BookCreated" }
                                        ]
                                    }
                                }
                            }
                        },
                        "422": error_response("Unprocessable request")
                    }
                }
            },
            "/books/{id}": {
                "get": {
                    "summary": "Fetch one book",
                    "tags": ["Books"],
                    "parameters": [id_param.clone()],
                    "responses": {
                        "200": ok_response("The book", "BookDetail"),
                        "404": error_response("No book with that id")
                    }
                },
                "patch": {
                    "summary": "Update a book's rating",
                    "tags": ["Books"],
                    "parameters": [id_param.clone()],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": {
                                    "type": "object",
                                    "properties": {
                                        "rating": { "type": ["integer", "string"] }
                                    }
                                }
                            }
                        }
                    },
                    "responses": {
                        "200": ok_response("Rating stored", "RatingUpdated"),
                        "400": error_response("Rating is not an integer"),
                        "404": error_response("No book with that id")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": [id_param, page_param],
                    "responses": {
                        "200": ok_response("Book deleted", "BookDeleted"),
                        "404": error_response("No book with that id"),
                        "422": error_response("Store failure")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer" },
                        "title": { "type": "string" },
                        "author": { "type": "string" },
                        "rating": { "type": ["integer", "null"] }
                    },
                    "required": ["id", "title", "author", "rating"]
                },
                "BookRequest": {
                    "type": "object",
                    "properties": {
                        "search": { "type": "string" },
                        "title": { "type": "string" },
                        "author": { "type": "string" },
                        "rating": { "type": ["integer", "string", "null"] }
                    }
                },
                "BookList": book_list_schema(serde_json::json!({})),
                "BookCreated": book_list_schema(serde_json::json!({
                    "created": { "type": "integer" }
                })),
                "BookDeleted": book_list_schema(serde_json::json!({
                    "deleted": { "type": "integer" }
                })),
                "BookDetail": {
                    "type": "object",
                    "properties": {
                        "success": { "type": "boolean" },
                        "book": { "$ref": "#/components/schemas/Book" }
                    },
                    "required": ["success", "book"]
                },
                "RatingUpdated": {
                    "type": "object",
                    "properties": {
                        "success": { "type": "boolean" },
                        "id": { "type": "integer" }
                    },
                    "required": ["success", "id"]
                }
            }
        }
    })
}
