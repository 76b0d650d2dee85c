//! API integration tests

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;

use bookshelf_server::{api::create_router, AppConfig, AppState};

fn app() -> Router {
    create_router(AppState::new(AppConfig::default()))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn book(name: &str, page_count: u32, read_page: u32, reading: bool) -> Value {
    json!({
        "name": name,
        "year": 2010,
        "author": "John Doe",
        "summary": "Lorem ipsum dolor sit amet",
        "publisher": "Dicoding Indonesia",
        "pageCount": page_count,
        "readPage": read_page,
        "reading": reading
    })
}

async fn create(app: &Router, payload: Value) -> String {
    let (status, body) = send(app, "POST", "/books", Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["bookId"].as_str().unwrap().to_string()
}

async fn count(app: &Router) -> usize {
    let (_, body) = send(app, "GET", "/books", None).await;
    body["data"]["books"].as_array().unwrap().len()
}

#[tokio::test]
async fn test_health_check() {
    let app = app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["books"], 0);
}

#[tokio::test]
async fn test_create_and_get_book() {
    let app = app();
    let (status, body) = send(&app, "POST", "/books", Some(book("Buku A", 100, 25, true))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Buku berhasil ditambahkan");
    let id = body["data"]["bookId"].as_str().unwrap().to_string();
    assert_eq!(id.len(), 16);

    let (status, body) = send(&app, "GET", &format!("/books/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    let stored = &body["data"]["book"];
    assert_eq!(stored["id"], id.as_str());
    assert_eq!(stored["name"], "Buku A");
    assert_eq!(stored["year"], 2010);
    assert_eq!(stored["author"], "John Doe");
    assert_eq!(stored["summary"], "Lorem ipsum dolor sit amet");
    assert_eq!(stored["publisher"], "Dicoding Indonesia");
    assert_eq!(stored["pageCount"], 100);
    assert_eq!(stored["readPage"], 25);
    assert_eq!(stored["reading"], true);
    assert_eq!(stored["finished"], false);
    assert!(stored["insertedAt"].is_string());
    assert_eq!(stored["insertedAt"], stored["updatedAt"]);
}

#[tokio::test]
async fn test_create_coerces_string_numbers() {
    let app = app();
    let id = create(
        &app,
        json!({"name": "Buku B", "year": "1999", "pageCount": "50", "readPage": "50", "reading": 1}),
    )
    .await;

    let (_, body) = send(&app, "GET", &format!("/books/{}", id), None).await;
    let stored = &body["data"]["book"];
    assert_eq!(stored["year"], 1999);
    assert_eq!(stored["pageCount"], 50);
    assert_eq!(stored["finished"], true);
    assert_eq!(stored["reading"], true);
}

#[tokio::test]
async fn test_create_without_name() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/books",
        Some(json!({"year": 2010, "pageCount": 10, "readPage": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "fail");
    assert_eq!(body["message"], "Gagal menambahkan buku. Mohon isi nama buku");

    let (status, _) = send(&app, "POST", "/books", Some(book("", 10, 1, false))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(count(&app).await, 0);
}

#[tokio::test]
async fn test_create_with_page_overflow() {
    let app = app();
    let (status, body) = send(&app, "POST", "/books", Some(book("Buku A", 10, 11, false))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "fail");
    assert_eq!(
        body["message"],
        "Gagal menambahkan buku. readPage tidak boleh lebih besar dari pageCount"
    );
    assert_eq!(count(&app).await, 0);
}

#[tokio::test]
async fn test_create_with_invalid_number() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/books",
        Some(json!({"name": "Buku A", "pageCount": "many"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "fail");
    assert_eq!(body["message"], "Gagal menambahkan buku. Nilai pageCount tidak valid");
    assert_eq!(count(&app).await, 0);
}

#[tokio::test]
async fn test_create_without_name_and_with_bad_number() {
    let app = app();
    let (status, body) = send(&app, "POST", "/books", Some(json!({"pageCount": "x"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Gagal menambahkan buku. Mohon isi nama buku");
    assert_eq!(count(&app).await, 0);
}

#[tokio::test]
async fn test_create_with_null_fields() {
    let app = app();
    let id = create(
        &app,
        json!({
            "name": "Buku A",
            "year": null,
            "author": null,
            "pageCount": 10.0,
            "readPage": null,
            "reading": null
        }),
    )
    .await;

    let (_, body) = send(&app, "GET", &format!("/books/{}", id), None).await;
    let stored = &body["data"]["book"];
    assert_eq!(stored["year"], 0);
    assert_eq!(stored["pageCount"], 10);
    assert_eq!(stored["readPage"], 0);
    assert_eq!(stored["reading"], false);
    assert_eq!(stored["finished"], false);
}

#[tokio::test]
async fn test_timestamps_have_millisecond_precision() {
    let app = app();
    let id = create(&app, book("Buku A", 10, 1, false)).await;

    let (_, body) = send(&app, "GET", &format!("/books/{}", id), None).await;
    let inserted_at = body["data"]["book"]["insertedAt"].as_str().unwrap();
    // e.g. 2024-01-31T08:15:02.417Z
    assert_eq!(inserted_at.len(), 24);
    assert!(inserted_at.ends_with('Z'));
    assert_eq!(&inserted_at[19..20], ".");
}

#[tokio::test]
async fn test_list_returns_projections_in_order() {
    let app = app();
    let first = create(&app, book("Buku A", 10, 1, false)).await;
    let second = create(&app, book("Buku B", 10, 10, true)).await;

    let (status, body) = send(&app, "GET", "/books", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");

    let books = body["data"]["books"].as_array().unwrap();
    assert_eq!(books.len(), 2);
    assert_eq!(books[0]["id"], first.as_str());
    assert_eq!(books[1]["id"], second.as_str());
    assert_eq!(books[0]["publisher"], "Dicoding Indonesia");

    let keys: Vec<_> = books[0].as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys.len(), 3);
    assert!(books[0].get("pageCount").is_none());
}

#[tokio::test]
async fn test_list_filters() {
    let app = app();
    create(&app, book("Laut Bercerita", 100, 100, false)).await;
    create(&app, book("Bumi", 100, 20, true)).await;
    create(&app, book("Di Tepi Laut", 100, 5, false)).await;

    let (_, body) = send(&app, "GET", "/books?name=laut", None).await;
    let names: Vec<_> = body["data"]["books"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Laut Bercerita", "Di Tepi Laut"]);

    let (_, body) = send(&app, "GET", "/books?reading=1", None).await;
    assert_eq!(body["data"]["books"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["books"][0]["name"], "Bumi");

    let (_, body) = send(&app, "GET", "/books?reading=0", None).await;
    assert_eq!(body["data"]["books"].as_array().unwrap().len(), 2);

    let (_, body) = send(&app, "GET", "/books?finished=1", None).await;
    assert_eq!(body["data"]["books"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["books"][0]["name"], "Laut Bercerita");

    let (_, body) = send(&app, "GET", "/books?name=LAUT&finished=0", None).await;
    assert_eq!(body["data"]["books"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["books"][0]["name"], "Di Tepi Laut");

    let (_, body) = send(&app, "GET", "/books?name=", None).await;
    assert_eq!(body["data"]["books"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_list_with_invalid_flag() {
    let app = app();
    let (status, body) = send(&app, "GET", "/books?reading=maybe", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "fail");
}

#[tokio::test]
async fn test_get_unknown_book() {
    let app = app();
    let (status, body) = send(&app, "GET", "/books/xxxxxxxxxxxxxxxx", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "fail");
    assert_eq!(body["message"], "Buku tidak ditemukan");
}

#[tokio::test]
async fn test_update_book() {
    let app = app();
    let id = create(&app, book("Dicoding", 100, 100, false)).await;
    let (_, before) = send(&app, "GET", &format!("/books/{}", id), None).await;
    assert_eq!(before["data"]["book"]["finished"], true);

    tokio::time::sleep(Duration::from_millis(5)).await;

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/books/{}", id),
        Some(book("Dicoding Revisi", 200, 50, true)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Buku berhasil diperbarui");
    assert_eq!(body["data"]["name"], "Dicoding Revisi");

    let (_, after) = send(&app, "GET", &format!("/books/{}", id), None).await;
    let before = &before["data"]["book"];
    let after = &after["data"]["book"];
    assert_eq!(after["id"], before["id"]);
    assert_eq!(after["insertedAt"], before["insertedAt"]);
    assert_ne!(after["updatedAt"], before["updatedAt"]);
    assert_eq!(after["pageCount"], 200);
    assert_eq!(after["readPage"], 50);
    assert_eq!(after["reading"], true);
    // finished is only derived at creation
    assert_eq!(after["finished"], true);
}

#[tokio::test]
async fn test_update_with_invalid_payload() {
    let app = app();
    let id = create(&app, book("Buku A", 100, 10, false)).await;
    let (_, before) = send(&app, "GET", &format!("/books/{}", id), None).await;

    let (status, body) = send(&app, "PUT", &format!("/books/{}", id), Some(book("", 100, 10, false))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Gagal memperbarui buku. Mohon isi nama buku");

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/books/{}", id),
        Some(book("Buku A", 10, 100, false)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Gagal memperbarui buku. readPage tidak boleh lebih besar dari pageCount"
    );

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/books/{}", id),
        Some(json!({"name": "Buku A", "reading": "kadang"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Gagal memperbarui buku. Nilai reading tidak valid");

    let (_, after) = send(&app, "GET", &format!("/books/{}", id), None).await;
    assert_eq!(after, before);
}

#[tokio::test]
async fn test_update_unknown_book() {
    let app = app();
    let (status, body) = send(&app, "PUT", "/books/unknown", Some(book("Buku A", 10, 1, false))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "fail");
    assert_eq!(body["message"], "Gagal memperbarui buku. Id tidak ditemukan");
}

#[tokio::test]
async fn test_delete_book() {
    let app = app();
    let id = create(&app, book("Buku A", 10, 1, false)).await;

    let (status, body) = send(&app, "DELETE", &format!("/books/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Buku berhasil dihapus");
    assert!(body.get("data").is_none());

    let (status, _) = send(&app, "GET", &format!("/books/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_unknown_book() {
    let app = app();
    create(&app, book("Buku A", 10, 1, false)).await;

    let (status, body) = send(&app, "DELETE", "/books/unknown", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Buku gagal dihapus. Id tidak ditemukan");
    assert_eq!(count(&app).await, 1);
}

#[tokio::test]
async fn test_malformed_json_body() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri("/books")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
