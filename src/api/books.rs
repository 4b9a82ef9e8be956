//! Catalog endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::{AppError, AppResult},
    models::Book,
    AppState,
};

use super::AuthenticatedUser;

/// Keyword search over title and author
#[derive(Deserialize, IntoParams)]
pub struct KeywordQuery {
    pub keyword: Option<String>,
}

/// Keyword search over titles only
#[derive(Deserialize, IntoParams)]
pub struct TitleKeywordQuery {
    pub titlekeyword: Option<String>,
}

/// Exact author lookup
#[derive(Deserialize, IntoParams)]
pub struct AuthorQuery {
    pub author: Option<String>,
}

/// Exact title lookup
#[derive(Deserialize, IntoParams)]
pub struct TitleQuery {
    pub title: Option<String>,
}

fn required(value: Option<String>, name: &str) -> AppResult<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::InvalidInput(format!("{} must not be empty", name))),
    }
}

/// List every book
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    security(("session_cookie" = [])),
    responses(
        (status = 200, description = "All books", body = Vec<Book>),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    AuthenticatedUser(_identity): AuthenticatedUser,
) -> AppResult<Json<Vec<Book>>> {
    let books = state.services.catalog.get_all_books().await?;
    Ok(Json(books))
}

/// Get a book by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    security(("session_cookie" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 400, description = "Invalid book ID"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    AuthenticatedUser(_identity): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<Book>> {
    let id: i32 = id
        .parse()
        .map_err(|_| AppError::InvalidInput("Invalid book ID".to_string()))?;
    let book = state.services.catalog.get_book_by_id(id).await?;
    Ok(Json(book))
}

/// Get a book by its exact title
#[utoipa::path(
    get,
    path = "/books/title",
    tag = "books",
    security(("session_cookie" = [])),
    params(TitleQuery),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 400, description = "Missing title"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book_by_title(
    State(state): State<AppState>,
    AuthenticatedUser(_identity): AuthenticatedUser,
    Query(query): Query<TitleQuery>,
) -> AppResult<Json<Book>> {
    let title = required(query.title, "title")?;
    let book = state.services.catalog.get_book_by_title(&title).await?;
    Ok(Json(book))
}

/// Search title and author by keyword
#[utoipa::path(
    get,
    path = "/books/search",
    tag = "books",
    security(("session_cookie" = [])),
    params(KeywordQuery),
    responses(
        (status = 200, description = "Matching books", body = Vec<Book>),
        (status = 400, description = "Missing keyword")
    )
)]
pub async fn search_books(
    State(state): State<AppState>,
    AuthenticatedUser(_identity): AuthenticatedUser,
    Query(query): Query<KeywordQuery>,
) -> AppResult<Json<Vec<Book>>> {
    let keyword = required(query.keyword, "keyword")?;
    let books = state.services.catalog.search_by_keyword(&keyword).await?;
    Ok(Json(books))
}

/// Search titles by keyword
#[utoipa::path(
    get,
    path = "/books/search/title",
    tag = "books",
    security(("session_cookie" = [])),
    params(TitleKeywordQuery),
    responses(
        (status = 200, description = "Matching books", body = Vec<Book>),
        (status = 400, description = "Missing keyword")
    )
)]
pub async fn search_books_by_title(
    State(state): State<AppState>,
    AuthenticatedUser(_identity): AuthenticatedUser,
    Query(query): Query<TitleKeywordQuery>,
) -> AppResult<Json<Vec<Book>>> {
    let keyword = required(query.titlekeyword, "titlekeyword")?;
    let books = state.services.catalog.search_by_title_keyword(&keyword).await?;
    Ok(Json(books))
}

/// Books by an exact author name
#[utoipa::path(
    get,
    path = "/books/search/author",
    tag = "books",
    security(("session_cookie" = [])),
    params(AuthorQuery),
    responses(
        (status = 200, description = "Matching books", body = Vec<Book>),
        (status = 400, description = "Missing author")
    )
)]
pub async fn search_books_by_author(
    State(state): State<AppState>,
    AuthenticatedUser(_identity): AuthenticatedUser,
    Query(query): Query<AuthorQuery>,
) -> AppResult<Json<Vec<Book>>> {
    let author = required(query.author, "author")?;
    let books = state.services.catalog.search_by_author(&author).await?;
    Ok(Json(books))
}
