//! Book model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    #[schema(example = 1)]
    pub id: i32,
    /// Unique title
    #[schema(example = "The Name of the Rose")]
    pub title: String,
    #[schema(example = "Umberto Eco")]
    pub author: String,
    /// Copies available for lending, never negative
    #[schema(example = 10)]
    pub stock: i32,
}

/// Book about to be inserted
#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub stock: i32,
}
