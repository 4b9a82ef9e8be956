//! API handlers for the lending REST endpoints

pub mod admin;
pub mod auth;
pub mod books;
pub mod borrow;
pub mod health;
pub mod openapi;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, Method},
    routing::{get, post},
    Router,
};
use axum_extra::extract::CookieJar;
use serde::Serialize;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::ToSchema;

use crate::{error::AppError, models::Identity, AppState};

/// Extractor for the caller behind the session cookie
pub struct AuthenticatedUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let sessions = &state.services.sessions;
        let jar = CookieJar::from_headers(&parts.headers);
        let session_id = jar.get(sessions.cookie_name()).map(|c| c.value().to_string());

        let identity = sessions.identity(session_id.as_deref()).await?;
        Ok(AuthenticatedUser(identity))
    }
}

/// Extractor that additionally requires the admin role
pub struct AdminUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(identity) = AuthenticatedUser::from_request_parts(parts, state).await?;
        if let Err(e) = identity.require_admin() {
            tracing::warn!(user_id = identity.user_id, "Non-admin caller rejected from admin route");
            return Err(e);
        }
        Ok(AdminUser(identity))
    }
}

/// Plain acknowledgement body
#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    // Session cookies need credentialed CORS, which forbids wildcards
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_LENGTH,
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
        ])
        .allow_credentials(true);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Authentication
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        // Catalog
        .route("/books", get(books::list_books))
        .route("/books/search", get(books::search_books))
        .route("/books/search/title", get(books::search_books_by_title))
        .route("/books/search/author", get(books::search_books_by_author))
        .route("/books/title", get(books::get_book_by_title))
        .route("/books/:id", get(books::get_book))
        // Borrowing
        .route("/borrow", post(borrow::borrow_book))
        .route("/borrow/return", post(borrow::return_book))
        .route("/borrow/records", get(borrow::my_borrow_records))
        // Administration
        .route(
            "/admin/books",
            post(admin::add_book).put(admin::update_book).delete(admin::delete_book),
        )
        .route("/admin/borrow-records", get(admin::all_borrow_records))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
