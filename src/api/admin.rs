//! Admin-only catalog management endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{Book, BorrowRecord},
    AppState,
};

use super::AdminUser;

/// New catalog entry
#[derive(Deserialize, Validate, ToSchema)]
pub struct AddBookRequest {
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    #[schema(example = "The Name of the Rose")]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    #[schema(example = "Umberto Eco")]
    pub author: String,
    #[validate(range(min = 0, message = "Stock must not be negative"))]
    #[schema(example = 10)]
    pub stock: i32,
}

/// Full replacement of a catalog entry
#[derive(Deserialize, Validate, ToSchema)]
pub struct UpdateBookRequest {
    #[schema(example = 1)]
    pub id: i32,
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    #[validate(range(min = 0, message = "Stock must not be negative"))]
    #[schema(example = 15)]
    pub stock: i32,
}

/// Book to delete
#[derive(Deserialize, ToSchema)]
pub struct DeleteBookRequest {
    #[schema(example = 1)]
    pub id: i32,
}

/// Deletion outcome
#[derive(Serialize, ToSchema)]
pub struct DeleteBookResponse {
    pub message: String,
    /// Open records that were force-closed
    pub closed_records: usize,
}

/// Add a book to the catalog
#[utoipa::path(
    post,
    path = "/admin/books",
    tag = "admin",
    security(("session_cookie" = [])),
    request_body = AddBookRequest,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Administrator privileges required"),
        (status = 409, description = "Title already exists")
    )
)]
pub async fn add_book(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(request): Json<AddBookRequest>,
) -> AppResult<(StatusCode, Json<Book>)> {
    request
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    let book = state
        .services
        .admin
        .add_book(&request.title, &request.author, request.stock)
        .await?;

    Ok((StatusCode::CREATED, Json(book)))
}

/// Replace title, author and stock of a book
#[utoipa::path(
    put,
    path = "/admin/books",
    tag = "admin",
    security(("session_cookie" = [])),
    request_body = UpdateBookRequest,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Administrator privileges required"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(request): Json<UpdateBookRequest>,
) -> AppResult<Json<Book>> {
    request
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    let book = state
        .services
        .admin
        .update_book(&request.title, &request.author, request.id, request.stock)
        .await?;

    Ok(Json(book))
}

/// Delete a book, closing its open borrow records
#[utoipa::path(
    delete,
    path = "/admin/books",
    tag = "admin",
    security(("session_cookie" = [])),
    request_body = DeleteBookRequest,
    responses(
        (status = 200, description = "Book deleted", body = DeleteBookResponse),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Administrator privileges required"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(request): Json<DeleteBookRequest>,
) -> AppResult<Json<DeleteBookResponse>> {
    let closed_records = state.services.admin.delete_book(request.id).await?;

    Ok(Json(DeleteBookResponse {
        message: "Book deleted successfully".to_string(),
        closed_records,
    }))
}

/// Every borrow record, for auditing
#[utoipa::path(
    get,
    path = "/admin/borrow-records",
    tag = "admin",
    security(("session_cookie" = [])),
    responses(
        (status = 200, description = "All borrow records", body = Vec<BorrowRecord>),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn all_borrow_records(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<Json<Vec<BorrowRecord>>> {
    let records = state.services.admin.get_all_borrow_records().await?;
    Ok(Json(records))
}
