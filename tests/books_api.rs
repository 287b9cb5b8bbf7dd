//! End-to-end tests of the `/books` endpoints over an in-memory store.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use bookshelf_app::Application;
use bookshelf_kernel::settings::{DatabaseSettings, Settings};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn test_app() -> (Application, Router) {
    let settings = Settings {
        database: DatabaseSettings::in_memory(),
        ..Settings::default()
    };
    let app = Application::build(settings).await.expect("build application");
    app.start().await.expect("start application");
    let router = app.router().expect("build router");
    (app, router)
}

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(payload) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&payload).unwrap())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let parsed = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, parsed)
}

async fn create(router: &Router, title: &str, author: &str, rating: Value) -> i64 {
    let (status, body) = send(
        router,
        Method::POST,
        "/books",
        Some(json!({"title": title, "author": author, "rating": rating})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create failed: {body}");
    body["created"].as_i64().expect("created id")
}

fn ids(body: &Value) -> Vec<i64> {
    body["books"]
        .as_array()
        .expect("books array")
        .iter()
        .map(|book| book["id"].as_i64().unwrap())
        .collect()
}

fn assert_error(status: StatusCode, body: &Value, code: u16, message: &str) {
    assert_eq!(status.as_u16(), code);
    assert_eq!(
        body,
        &json!({"success": false, "error": code, "message": message})
    );
}

#[tokio::test]
async fn dune_lifecycle() {
    let (_app, router) = test_app().await;

    let (status, created) = send(
        &router,
        Method::POST,
        "/books",
        Some(json!({"title": "Dune", "author": "Herbert", "rating": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["success"], true);
    assert_eq!(created["total_books"], 1);
    let id = created["created"].as_i64().unwrap();

    let (status, fetched) = send(&router, Method::GET, &format!("/books/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        fetched,
        json!({
            "success": true,
            "book": {"id": id, "title": "Dune", "author": "Herbert", "rating": 5}
        })
    );

    let (status, patched) = send(
        &router,
        Method::PATCH,
        &format!("/books/{id}"),
        Some(json!({"rating": 3})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched, json!({"success": true, "id": id}));

    let (_, fetched) = send(&router, Method::GET, &format!("/books/{id}"), None).await;
    assert_eq!(fetched["book"]["rating"], 3);

    let (status, deleted) = send(&router, Method::DELETE, &format!("/books/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["success"], true);
    assert_eq!(deleted["deleted"], id);
    assert_eq!(deleted["books"], json!([]));
    assert_eq!(deleted["total_books"], 0);

    let (status, body) = send(&router, Method::GET, &format!("/books/{id}"), None).await;
    assert_error(status, &body, 404, "resource not found");
}

#[tokio::test]
async fn pages_concatenate_to_the_whole_collection() {
    let (_app, router) = test_app().await;

    let mut created = Vec::new();
    for n in 0..19 {
        created.push(create(&router, &format!("Book {n}"), "Author", json!(n % 5)).await);
    }

    let (_, first) = send(&router, Method::GET, "/books", None).await;
    assert_eq!(first["success"], true);
    assert_eq!(first["total_books"], 19);

    let mut seen = Vec::new();
    for page in 1..=3 {
        let (status, body) = send(&router, Method::GET, &format!("/books?page={page}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let page_ids = ids(&body);
        assert!(page_ids.len() <= 8);
        assert_eq!(body["total_books"], 19);
        seen.extend(page_ids);
    }
    assert_eq!(seen, created);
    assert_eq!(ids(&first), created[..8].to_vec());
}

#[tokio::test]
async fn out_of_range_and_malformed_pages() {
    let (_app, router) = test_app().await;
    create(&router, "Emma", "Austen", json!(4)).await;

    for uri in ["/books?page=2", "/books?page=0", "/books?page=-1"] {
        let (status, body) = send(&router, Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body["success"], true);
        assert_eq!(body["books"], json!([]), "{uri}");
        assert_eq!(body["total_books"], 1);
    }

    let (status, body) = send(&router, Method::GET, "/books?page=abc", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body).len(), 1);
}

#[tokio::test]
async fn invalid_rating_is_rejected_and_leaves_book_unchanged() {
    let (_app, router) = test_app().await;
    let id = create(&router, "Emma", "Austen", json!(4)).await;
    let uri = format!("/books/{id}");

    for payload in [json!({"rating": "five"}), json!({"rating": null}), json!({"rating": [1]})] {
        let (status, body) = send(&router, Method::PATCH, &uri, Some(payload)).await;
        assert_error(status, &body, 400, "bad request");
    }

    let (_, fetched) = send(&router, Method::GET, &uri, None).await;
    assert_eq!(fetched["book"]["rating"], 4);
}

#[tokio::test]
async fn rating_patch_coerces_and_ignores_missing_rating() {
    let (_app, router) = test_app().await;
    let id = create(&router, "Emma", "Austen", json!(4)).await;
    let uri = format!("/books/{id}");

    let (status, _) = send(&router, Method::PATCH, &uri, Some(json!({"rating": "1"}))).await;
    assert_eq!(status, StatusCode::OK);
    let (_, fetched) = send(&router, Method::GET, &uri, None).await;
    assert_eq!(fetched["book"]["rating"], 1);

    let (status, body) = send(&router, Method::PATCH, &uri, Some(json!({"title": "Other"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "id": id}));
    let (_, fetched) = send(&router, Method::GET, &uri, None).await;
    assert_eq!(fetched["book"]["rating"], 1);
    assert_eq!(fetched["book"]["title"], "Emma");
}

#[tokio::test]
async fn patch_errors() {
    let (_app, router) = test_app().await;

    let (status, body) = send(&router, Method::PATCH, "/books/999", Some(json!({"rating": 2}))).await;
    assert_error(status, &body, 404, "resource not found");

    let id = create(&router, "Emma", "Austen", json!(4)).await;
    let (status, body) = send(&router, Method::PATCH, &format!("/books/{id}"), None).await;
    assert_error(status, &body, 400, "bad request");

    let (status, body) = send(&router, Method::PATCH, &format!("/books/{id}"), Some(json!([3]))).await;
    assert_error(status, &body, 400, "bad request");
}

#[tokio::test]
async fn delete_reduces_total_and_reports_missing_books() {
    let (_app, router) = test_app().await;
    let first = create(&router, "A", "X", json!(1)).await;
    let second = create(&router, "B", "X", json!(2)).await;

    let (_, before) = send(&router, Method::GET, "/books", None).await;
    let (status, deleted) = send(&router, Method::DELETE, &format!("/books/{first}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        deleted["total_books"].as_i64().unwrap(),
        before["total_books"].as_i64().unwrap() - 1
    );
    assert_eq!(ids(&deleted), vec![second]);

    let (status, body) = send(&router, Method::DELETE, &format!("/books/{first}"), None).await;
    assert_error(status, &body, 404, "resource not found");
}

#[tokio::test]
async fn delete_returns_requested_page_of_remaining_books() {
    let (_app, router) = test_app().await;
    let mut created = Vec::new();
    for n in 0..10 {
        created.push(create(&router, &format!("Book {n}"), "Author", json!(3)).await);
    }

    let (status, body) = send(
        &router,
        Method::DELETE,
        &format!("/books/{}?page=2", created[0]),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], created[0]);
    assert_eq!(body["total_books"], 9);
    assert_eq!(ids(&body), vec![created[9]]);

    let (_, body) = send(
        &router,
        Method::DELETE,
        &format!("/books/{}?page=3", created[1]),
        None,
    )
    .await;
    assert_eq!(body["books"], json!([]));
    assert_eq!(body["total_books"], 8);
}

#[tokio::test]
async fn create_returns_requested_page_after_insert() {
    let (_app, router) = test_app().await;
    let mut created = Vec::new();
    for n in 0..8 {
        created.push(create(&router, &format!("Book {n}"), "Author", json!(3)).await);
    }

    let (status, body) = send(
        &router,
        Method::POST,
        "/books?page=2",
        Some(json!({"title": "Book 8", "author": "Author", "rating": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let ninth = body["created"].as_i64().expect("created id");
    assert_eq!(ids(&body), vec![ninth]);
    assert_eq!(body["total_books"], 9);

    let (_, body) = send(
        &router,
        Method::POST,
        "/books",
        Some(json!({"title": "Book 9", "author": "Author"})),
    )
    .await;
    assert_eq!(ids(&body), created);
    assert_eq!(body["total_books"], 10);
}

#[tokio::test]
async fn search_is_case_insensitive_substring_match() {
    let (_app, router) = test_app().await;
    let a = create(&router, "The Dark Tower", "King", json!(5)).await;
    create(&router, "Emma", "Austen", json!(4)).await;
    let c = create(&router, "DARKLY DREAMING", "Lindsay", json!(3)).await;

    let (status, body) = send(&router, Method::POST, "/books", Some(json!({"search": "dark"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(ids(&body), vec![a, c]);
    assert_eq!(body["total_books"], 2);
    assert!(body.get("created").is_none());

    let (status, body) =
        send(&router, Method::POST, "/books", Some(json!({"search": "zzz"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["books"], json!([]));
    assert_eq!(body["total_books"], 0);

    let (_, all) = send(&router, Method::GET, "/books", None).await;
    assert_eq!(all["total_books"], 3);

    let emile = create(&router, "Émile, ou De l'éducation", "Rousseau", json!(4)).await;
    let uber = create(&router, "ÜBER ALLES", "Anon", json!(2)).await;

    let (_, body) = send(&router, Method::POST, "/books", Some(json!({"search": "émile"}))).await;
    assert_eq!(ids(&body), vec![emile]);
    assert_eq!(body["total_books"], 1);

    let (_, body) = send(&router, Method::POST, "/books", Some(json!({"search": "über"}))).await;
    assert_eq!(ids(&body), vec![uber]);
    assert_eq!(body["total_books"], 1);
}

#[tokio::test]
async fn search_results_are_paginated() {
    let (_app, router) = test_app().await;
    for n in 0..10 {
        create(&router, &format!("Saga {n}"), "Author", json!(1)).await;
    }

    let (_, second) = send(
        &router,
        Method::POST,
        "/books?page=2",
        Some(json!({"search": "saga"})),
    )
    .await;
    assert_eq!(ids(&second).len(), 2);
    assert_eq!(second["total_books"], 10);
}

#[tokio::test]
async fn create_failures_are_unprocessable() {
    let (_app, router) = test_app().await;

    for payload in [
        json!({"author": "Nobody"}),
        json!({"title": "Untitled"}),
        json!({"title": "T", "author": "A", "rating": "lots"}),
        json!({"search": 42}),
        json!("not an object"),
    ] {
        let (status, body) = send(&router, Method::POST, "/books", Some(payload)).await;
        assert_error(status, &body, 422, "unprocessable");
    }

    let (_, all) = send(&router, Method::GET, "/books", None).await;
    assert_eq!(all["total_books"], 0);
}

#[tokio::test]
async fn create_without_rating_stores_null() {
    let (_app, router) = test_app().await;
    let id = create(&router, "Ulysses", "Joyce", Value::Null).await;

    let (_, fetched) = send(&router, Method::GET, &format!("/books/{id}"), None).await;
    assert_eq!(fetched["book"]["rating"], Value::Null);
}

#[tokio::test]
async fn non_integer_ids_are_not_found() {
    let (_app, router) = test_app().await;
    let (status, body) = send(&router, Method::GET, "/books/abc", None).await;
    assert_error(status, &body, 404, "resource not found");
}

#[tokio::test]
async fn unsupported_methods_are_405_with_cors_headers() {
    let (_app, router) = test_app().await;

    let request = Request::builder()
        .method(Method::PUT)
        .uri("/books")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_HEADERS));

    let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], 405);
    assert_eq!(body["message"], "method not allowed");
}

#[tokio::test]
async fn store_failures_map_per_operation() {
    let (app, router) = test_app().await;
    let id = create(&router, "Emma", "Austen", json!(4)).await;
    app.database().close().await;

    let (status, body) = send(&router, Method::GET, "/books", None).await;
    assert_error(status, &body, 500, "internal server error");

    let (status, body) = send(
        &router,
        Method::PATCH,
        &format!("/books/{id}"),
        Some(json!({"rating": 1})),
    )
    .await;
    assert_error(status, &body, 400, "bad request");

    let (status, body) = send(&router, Method::DELETE, &format!("/books/{id}"), None).await;
    assert_error(status, &body, 422, "unprocessable");

    let (status, body) = send(
        &router,
        Method::POST,
        "/books",
        Some(json!({"title": "T", "author": "A"})),
    )
    .await;
    assert_error(status, &body, 422, "unprocessable");
}

#[tokio::test]
async fn health_and_openapi_are_served() {
    let (_app, router) = test_app().await;

    let request = Request::builder()
        .uri("/healthz")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, spec) = send(&router, Method::GET, "/docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(spec["paths"]["/books"]["post"].is_object());
    assert!(spec["paths"]["/books/{id}"]["patch"].is_object());
}
