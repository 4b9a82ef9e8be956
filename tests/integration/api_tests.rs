//! API integration tests
//!
//! These run against a live server on localhost:8080 with an `admin`/`admin`
//! account whose role was set to `admin` directly in the database.

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Client that keeps the session cookie between requests
fn session_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to build client")
}

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}

async fn login(client: &Client, username: &str, password: &str) {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Failed to send login request");
    assert_eq!(response.status(), StatusCode::OK);
}

/// Register and log in a fresh user on its own client
async fn new_user() -> Client {
    let client = session_client();
    let name = unique("reader");

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({ "username": name, "password": "secret" }))
        .send()
        .await
        .expect("Failed to send register request");
    assert_eq!(response.status(), StatusCode::CREATED);

    login(&client, &name, "secret").await;
    client
}

async fn admin() -> Client {
    let client = session_client();
    login(&client, "admin", "admin").await;
    client
}

async fn add_book(admin: &Client, stock: i32) -> i64 {
    let response = admin
        .post(format!("{}/admin/books", BASE_URL))
        .json(&json!({ "title": unique("book"), "author": "Integration", "stock": stock }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_i64().expect("No id in response")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login_sets_session_cookie() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "username": "admin", "password": "admin" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cookie.starts_with("library-session="));
    assert!(cookie.contains("HttpOnly"));

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["user"]["role"], "admin");
    assert!(body["user"].get("password").is_none());
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "username": "admin", "password": "wrong_password" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_unauthorized_access() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_borrow_and_return() {
    let admin = admin().await;
    let reader = new_user().await;
    let book_id = add_book(&admin, 1).await;

    let response = reader
        .post(format!("{}/borrow", BASE_URL))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse response");
    let record_id = body["record"]["id"].as_i64().expect("No record id");

    // Stock is exhausted for everyone else
    let other = new_user().await;
    let response = other
        .post(format!("{}/borrow", BASE_URL))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = reader
        .post(format!("{}/borrow/return", BASE_URL))
        .json(&json!({ "record_id": record_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);

    let book: Value = reader
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(book["stock"], 1);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_borrows_respect_stock() {
    let admin = admin().await;
    let book_id = add_book(&admin, 3).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        handles.push(tokio::spawn(async move {
            let reader = new_user().await;
            reader
                .post(format!("{}/borrow", BASE_URL))
                .json(&json!({ "book_id": book_id }))
                .send()
                .await
                .expect("Failed to send request")
                .status()
        }));
    }

    let mut ok = 0;
    for handle in handles {
        match handle.await.expect("task panicked") {
            StatusCode::OK => ok += 1,
            status => assert_eq!(status, StatusCode::CONFLICT),
        }
    }
    assert_eq!(ok, 3);

    let book: Value = admin
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(book["stock"], 0);
}

#[tokio::test]
#[ignore]
async fn test_logout_ends_session() {
    let reader = new_user().await;

    let response = reader
        .post(format!("{}/auth/logout", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = reader
        .get(format!("{}/borrow/records", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
