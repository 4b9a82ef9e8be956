//! Borrowing endpoints for the logged-in user

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{error::AppResult, models::BorrowRecord, AppState};

use super::AuthenticatedUser;

/// Borrow request
#[derive(Deserialize, ToSchema)]
pub struct BorrowBookRequest {
    #[schema(example = 1)]
    pub book_id: i32,
}

/// Return request
#[derive(Deserialize, ToSchema)]
pub struct ReturnBookRequest {
    #[schema(example = 1)]
    pub record_id: i32,
}

/// Borrow or return outcome
#[derive(Serialize, ToSchema)]
pub struct BorrowResponse {
    pub message: String,
    pub record: BorrowRecord,
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/borrow",
    tag = "borrow",
    security(("session_cookie" = [])),
    request_body = BorrowBookRequest,
    responses(
        (status = 200, description = "Book borrowed", body = BorrowResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Out of stock or borrow limit reached")
    )
)]
pub async fn borrow_book(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Json(request): Json<BorrowBookRequest>,
) -> AppResult<Json<BorrowResponse>> {
    let record = state
        .services
        .borrows
        .borrow_book(identity.user_id, request.book_id)
        .await?;

    Ok(Json(BorrowResponse {
        message: "Book borrowed successfully".to_string(),
        record,
    }))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/borrow/return",
    tag = "borrow",
    security(("session_cookie" = [])),
    request_body = ReturnBookRequest,
    responses(
        (status = 200, description = "Book returned", body = BorrowResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Record belongs to another user"),
        (status = 404, description = "Record or book not found"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Json(request): Json<ReturnBookRequest>,
) -> AppResult<Json<BorrowResponse>> {
    let record = state
        .services
        .borrows
        .return_book(request.record_id, identity.user_id)
        .await?;

    Ok(Json(BorrowResponse {
        message: "Book returned successfully".to_string(),
        record,
    }))
}

/// Borrow history of the current user
#[utoipa::path(
    get,
    path = "/borrow/records",
    tag = "borrow",
    security(("session_cookie" = [])),
    responses(
        (status = 200, description = "Open and closed records", body = Vec<BorrowRecord>),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn my_borrow_records(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowRecord>>> {
    let records = state
        .services
        .borrows
        .get_user_borrow_records(identity.user_id)
        .await?;
    Ok(Json(records))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::api::test_support::{app, login, seed_admin, send};

    #[tokio::test]
    async fn borrow_and_return_over_http() {
        let (app, repository) = app();
        seed_admin(&repository, "root", "secret").await;
        let admin = login(&app, "root", "secret").await;

        for name in ["alice", "bob"] {
            send(
                &app,
                Method::POST,
                "/api/v1/auth/register",
                None,
                Some(json!({ "username": name, "password": "pw" })),
            )
            .await;
        }
        let alice = login(&app, "alice", "pw").await;
        let bob = login(&app, "bob", "pw").await;

        let (_, _, book) = send(
            &app,
            Method::POST,
            "/api/v1/admin/books",
            Some(&admin),
            Some(json!({ "title": "X", "author": "Y", "stock": 1 })),
        )
        .await;
        let book_id = book["id"].as_i64().unwrap();

        let (status, _, body) = send(
            &app,
            Method::POST,
            "/api/v1/borrow",
            Some(&alice),
            Some(json!({ "book_id": book_id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let record_id = body["record"]["id"].as_i64().unwrap();
        assert!(body["record"].get("returned_at").is_none());

        let (status, _, body) = send(
            &app,
            Method::POST,
            "/api/v1/borrow",
            Some(&bob),
            Some(json!({ "book_id": book_id })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "StockNotEnough");

        let (status, _, _) = send(
            &app,
            Method::POST,
            "/api/v1/borrow/return",
            Some(&bob),
            Some(json!({ "record_id": record_id })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _, body) = send(
            &app,
            Method::POST,
            "/api/v1/borrow/return",
            Some(&alice),
            Some(json!({ "record_id": record_id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["record"]["returned_at"].is_string());

        let (status, _, _) = send(
            &app,
            Method::POST,
            "/api/v1/borrow/return",
            Some(&alice),
            Some(json!({ "record_id": record_id })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, _, records) =
            send(&app, Method::GET, "/api/v1/borrow/records", Some(&alice), None).await;
        assert_eq!(records.as_array().unwrap().len(), 1);
        let (_, _, records) =
            send(&app, Method::GET, "/api/v1/borrow/records", Some(&bob), None).await;
        assert!(records.as_array().unwrap().is_empty());

        let (_, _, book) =
            send(&app, Method::GET, &format!("/api/v1/books/{}", book_id), Some(&alice), None).await;
        assert_eq!(book["stock"], 1);
    }

    #[tokio::test]
    async fn borrow_unknown_book_is_not_found() {
        let (app, _) = app();
        send(
            &app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "username": "alice", "password": "pw" })),
        )
        .await;
        let alice = login(&app, "alice", "pw").await;

        let (status, _, _) = send(
            &app,
            Method::POST,
            "/api/v1/borrow",
            Some(&alice),
            Some(json!({ "book_id": 404 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _, _) = send(
            &app,
            Method::POST,
            "/api/v1/borrow",
            Some(&alice),
            Some(json!({ "book_id": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
