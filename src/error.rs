//! Error types for the lending server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable error codes exposed to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthenticated = 2,
    DbFailure = 3,
    NoSuchUser = 4,
    NoSuchBook = 5,
    NoSuchRecord = 6,
    UserExists = 7,
    BookExists = 8,
    InvalidPassword = 9,
    StockNotEnough = 10,
    MaxBorrowsReached = 11,
    AlreadyReturned = 12,
    PermissionDenied = 13,
    Forbidden = 14,
    BadValue = 18,
}

/// Main application error type
///
/// Domain variants are expected outcomes the caller maps to a status code.
/// `Database`, `Persistence` and `Internal` are opaque failures whose details
/// are logged but never sent to clients.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Book not found")]
    BookNotFound,

    #[error("Borrow record not found")]
    RecordNotFound,

    #[error("User already exists")]
    UserExists,

    #[error("Book already exists")]
    BookExists,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Not enough stock")]
    StockNotEnough,

    #[error("Borrow limit reached")]
    BorrowLimit,

    #[error("Book already returned")]
    AlreadyReturned,

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Authentication required: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{context}: {source}")]
    Persistence {
        context: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// True for the opaque failures that surface as 500
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Persistence { .. } | AppError::Internal(_)
        )
    }
}

/// Annotates raw storage failures with the operation that produced them.
///
/// Domain errors pass through untouched so callers can still match on them.
pub trait Context<T> {
    fn context(self, context: &str) -> AppResult<T>;
}

impl<T> Context<T> for AppResult<T> {
    fn context(self, context: &str) -> AppResult<T> {
        self.map_err(|e| match e {
            AppError::Database(source) => AppError::Persistence {
                context: context.to_string(),
                source,
            },
            AppError::Internal(msg) => AppError::Internal(format!("{}: {}", context, msg)),
            other => other,
        })
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::InvalidInput(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::UserNotFound => {
                (StatusCode::NOT_FOUND, ErrorCode::NoSuchUser, self.to_string())
            }
            AppError::BookNotFound => {
                (StatusCode::NOT_FOUND, ErrorCode::NoSuchBook, self.to_string())
            }
            AppError::RecordNotFound => {
                (StatusCode::NOT_FOUND, ErrorCode::NoSuchRecord, self.to_string())
            }
            AppError::UserExists => {
                (StatusCode::BAD_REQUEST, ErrorCode::UserExists, "Username already exists".to_string())
            }
            AppError::BookExists => {
                (StatusCode::CONFLICT, ErrorCode::BookExists, self.to_string())
            }
            AppError::InvalidPassword => {
                (StatusCode::UNAUTHORIZED, ErrorCode::InvalidPassword, self.to_string())
            }
            AppError::StockNotEnough => {
                (StatusCode::CONFLICT, ErrorCode::StockNotEnough, self.to_string())
            }
            AppError::BorrowLimit => {
                (StatusCode::CONFLICT, ErrorCode::MaxBorrowsReached, self.to_string())
            }
            AppError::AlreadyReturned => {
                (StatusCode::CONFLICT, ErrorCode::AlreadyReturned, self.to_string())
            }
            AppError::PermissionDenied => {
                (StatusCode::FORBIDDEN, ErrorCode::PermissionDenied, "Borrower does not match current user".to_string())
            }
            AppError::Unauthenticated(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthenticated, msg.clone())
            }
            AppError::Forbidden(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::Forbidden, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Persistence { context, source } => {
                tracing::error!("Database error ({}): {:?}", context, source);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_wraps_database_errors_only() {
        let raw: AppResult<()> = Err(AppError::Database(sqlx::Error::RowNotFound));
        match raw.context("failed to update book stock") {
            Err(AppError::Persistence { context, .. }) => {
                assert_eq!(context, "failed to update book stock")
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let domain: AppResult<()> = Err(AppError::StockNotEnough);
        assert!(matches!(domain.context("ignored"), Err(AppError::StockNotEnough)));
    }

    #[test]
    fn internal_errors_hide_details() {
        let response = AppError::Internal("secret detail".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = AppError::BorrowLimit.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
