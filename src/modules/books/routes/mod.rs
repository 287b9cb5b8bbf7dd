//! HTTP handlers for the book catalog.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use bookshelf_http::error::AppError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::models::{
    coerce_rating, BookAction, BookCreated, BookDeleted, BookDetail, BookList, BookRequest,
    RatingUpdated, UpdateRating,
};
use super::store::{BookStore, CatalogError};
use crate::utils::Page;

/// Routes served by the books module, rooted at `/books`.
pub fn router(store: BookStore) -> Router {
    Router::new()
        .route("/books", get(list_books).post(create_or_search_books))
        .route(
            "/books/{id}",
            get(get_book).patch(update_rating).delete(delete_book),
        )
        .with_state(store)
}

#[derive(Debug, Default, Deserialize)]
struct PageQuery {
    page: Option<String>,
}

/// Status reported when an operation fails for a reason other than a
/// missing book.
#[derive(Debug, Clone, Copy)]
enum OnFailure {
    BadRequest,
    Unprocessable,
    Internal,
}

fn reject(err: CatalogError, on_failure: OnFailure) -> AppError {
    match err {
        CatalogError::NotFound(id) => AppError::not_found(format!("book {id}")),
        other => match on_failure {
            OnFailure::BadRequest => AppError::bad_request(other.to_string()),
            OnFailure::Unprocessable => AppError::unprocessable(other.to_string()),
            OnFailure::Internal => AppError::Internal(other.into()),
        },
    }
}

fn page_of(query: Result<Query<PageQuery>, QueryRejection>) -> Page {
    let query = query.map(|Query(query)| query).unwrap_or_default();
    Page::parse(query.page.as_deref())
}

/// Non-integer ids never name a book.
fn book_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, AppError> {
    path.map(|Path(id)| id)
        .map_err(|rejection| AppError::not_found(rejection.body_text()))
}

/// Accept only JSON objects, then map them onto `T`.
fn parse_body<T: DeserializeOwned>(
    body: Result<Json<Value>, JsonRejection>,
) -> Result<T, String> {
    let Json(value) = body.map_err(|rejection| rejection.body_text())?;
    if !value.is_object() {
        return Err("request body must be a JSON object".to_string());
    }
    serde_json::from_value(value).map_err(|err| err.to_string())
}

/// `GET /books?page=N`
async fn list_books(
    State(store): State<BookStore>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<BookList>, AppError> {
    let shelf = store
        .shelf(page_of(query))
        .await
        .map_err(|err| reject(err, OnFailure::Internal))?;

    Ok(Json(BookList {
        success: true,
        books: shelf.books,
        total_books: shelf.total,
    }))
}

/// `GET /books/{id}`
async fn get_book(
    State(store): State<BookStore>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<BookDetail>, AppError> {
    let id = book_id(path)?;
    let book = store
        .get(id)
        .await
        .map_err(|err| reject(err, OnFailure::Internal))?;

    Ok(Json(BookDetail {
        success: true,
        book,
    }))
}

/// `PATCH /books/{id}`: only the rating can change.
async fn update_rating(
    State(store): State<BookStore>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<RatingUpdated>, AppError> {
    let id = book_id(path)?;
    let on_failure = |err: CatalogError| reject(err, OnFailure::BadRequest);

    store.get(id).await.map_err(on_failure)?;

    let patch: UpdateRating = parse_body(body).map_err(AppError::bad_request)?;
    if let Some(value) = patch.rating {
        let rating =
            coerce_rating(&value).map_err(|err| AppError::bad_request(err.to_string()))?;
        store.update_rating(id, rating).await.map_err(on_failure)?;
        tracing::info!(book_id = id, rating, "book rating updated");
    }

    Ok(Json(RatingUpdated { success: true, id }))
}

/// `DELETE /books/{id}`: answers with the requested shelf of what remains.
async fn delete_book(
    State(store): State<BookStore>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<BookDeleted>, AppError> {
    let id = book_id(path)?;
    let on_failure = |err: CatalogError| reject(err, OnFailure::Unprocessable);

    store.delete(id).await.map_err(on_failure)?;
    tracing::info!(book_id = id, "book deleted");

    let shelf = store.shelf(page_of(query)).await.map_err(on_failure)?;

    Ok(Json(BookDeleted {
        success: true,
        deleted: id,
        books: shelf.books,
        total_books: shelf.total,
    }))
}

/// `POST /books`: searches titles when the body carries a non-empty
/// `search`, creates a book otherwise.
async fn create_or_search_books(
    State(store): State<BookStore>,
    query: Result<Query<PageQuery>, QueryRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    let page = page_of(query);
    let on_failure = |err: CatalogError| reject(err, OnFailure::Unprocessable);

    let request: BookRequest = parse_body(body).map_err(AppError::unprocessable)?;
    let action = request
        .into_action()
        .map_err(|err| on_failure(CatalogError::from(err)))?;

    match action {
        BookAction::Search(term) => {
            let shelf = store.search(&term, page).await.map_err(on_failure)?;
            tracing::debug!(term = %term, matches = shelf.total, "book search");

            Ok(Json(BookList {
                success: true,
                books: shelf.books,
                total_books: shelf.total,
            })
            .into_response())
        }
        BookAction::Create(new_book) => {
            let book = store.insert(&new_book).await.map_err(on_failure)?;
            tracing::info!(book_id = book.id, title = %book.title, "book created");

            let shelf = store.shelf(page).await.map_err(on_failure)?;
            Ok(Json(BookCreated {
                success: true,
                created: book.id,
                books: shelf.books,
                total_books: shelf.total,
            })
            .into_response())
        }
    }
}
