//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{admin, auth, books, borrow, health};

/// Registers the session cookie as the API's security scheme
struct SessionCookie;

impl Modify for SessionCookie {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "library-session",
                    "Set by /auth/login and sent back automatically by the browser",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lendbook API",
        version = "1.0.0",
        description = "Library lending REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        // Auth
        auth::register,
        auth::login,
        auth::logout,
        // Books
        books::list_books,
        books::get_book,
        books::get_book_by_title,
        books::search_books,
        books::search_books_by_title,
        books::search_books_by_author,
        // Borrow
        borrow::borrow_book,
        borrow::return_book,
        borrow::my_borrow_records,
        // Admin
        admin::add_book,
        admin::update_book,
        admin::delete_book,
        admin::all_borrow_records,
    ),
    components(
        schemas(
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::LoginResponse,
            borrow::BorrowBookRequest,
            borrow::ReturnBookRequest,
            borrow::BorrowResponse,
            admin::AddBookRequest,
            admin::UpdateBookRequest,
            admin::DeleteBookRequest,
            admin::DeleteBookResponse,
            crate::api::MessageResponse,
            crate::models::Book,
            crate::models::BorrowRecord,
            crate::models::User,
            crate::models::Role,
            health::HealthResponse,
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SessionCookie),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration and sessions"),
        (name = "books", description = "Catalog lookups and search"),
        (name = "borrow", description = "Borrowing and returning"),
        (name = "admin", description = "Catalog administration")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
