//! Storage port for users, books and borrow records
//!
//! Services never talk to a database directly. They go through [`Store`] for
//! plain reads and through [`Repository::atomically`] for every multi-step
//! mutation, which runs on a [`StoreTx`] that either commits as a whole or is
//! rolled back as a whole.

pub mod memory;
pub mod postgres;

use std::{future::Future, pin::Pin, sync::Arc};

use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{Book, BorrowRecord, NewBook, NewBorrowRecord, NewUser, User},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Future returned by a closure passed to [`Repository::atomically`]
pub type TxFuture<'t, T> = Pin<Box<dyn Future<Output = AppResult<T>> + Send + 't>>;

/// Persistence backend.
///
/// Reads on the store itself see committed state only and take no locks.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Open an atomic unit of work
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>>;

    async fn books_all(&self) -> AppResult<Vec<Book>>;

    async fn book_by_id(&self, id: i32) -> AppResult<Option<Book>>;

    async fn book_by_title(&self, title: &str) -> AppResult<Option<Book>>;

    /// Substring match against title or author
    async fn books_search_keyword(&self, keyword: &str) -> AppResult<Vec<Book>>;

    /// Substring match against title only
    async fn books_search_title(&self, keyword: &str) -> AppResult<Vec<Book>>;

    /// Exact author match
    async fn books_by_author(&self, author: &str) -> AppResult<Vec<Book>>;

    async fn user_by_name(&self, name: &str) -> AppResult<Option<User>>;

    async fn records_all(&self) -> AppResult<Vec<BorrowRecord>>;

    async fn records_by_user(&self, user_id: i32) -> AppResult<Vec<BorrowRecord>>;
}

/// An open atomic unit. Dropping it without [`StoreTx::commit`] discards every write.
///
/// Reads inside a unit lock what they return until the unit ends, so a
/// read-modify-write of the same row by two units is serialised.
#[async_trait]
pub trait StoreTx: Send {
    async fn book_by_id(&mut self, id: i32) -> AppResult<Option<Book>>;

    async fn book_by_title(&mut self, title: &str) -> AppResult<Option<Book>>;

    /// Returns `BookExists` if the title is already taken
    async fn insert_book(&mut self, book: &NewBook) -> AppResult<Book>;

    async fn update_book(&mut self, book: &Book) -> AppResult<()>;

    async fn delete_book(&mut self, id: i32) -> AppResult<()>;

    async fn user_by_name(&mut self, name: &str) -> AppResult<Option<User>>;

    /// Returns `UserExists` if the name is already taken
    async fn insert_user(&mut self, user: &NewUser) -> AppResult<User>;

    /// Read a record without locking it
    async fn peek_record(&mut self, id: i32) -> AppResult<Option<BorrowRecord>>;

    /// Locking read. Take the book lock first when both are needed.
    async fn record_by_id(&mut self, id: i32) -> AppResult<Option<BorrowRecord>>;

    async fn records_by_book(&mut self, book_id: i32) -> AppResult<Vec<BorrowRecord>>;

    /// Number of records of this user that are still open.
    /// Serialises concurrent borrowers acting for the same user.
    async fn count_open_records(&mut self, user_id: i32) -> AppResult<i64>;

    async fn insert_record(&mut self, record: &NewBorrowRecord) -> AppResult<BorrowRecord>;

    /// Stamp `returned_at` on a record
    async fn close_record(&mut self, id: i32, returned_at: chrono::DateTime<chrono::Utc>) -> AppResult<()>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}

/// Shared handle on the configured store
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn Store>,
}

impl Repository {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Plain reads outside any unit
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Run `f` as one atomic unit.
    ///
    /// Commits when `f` succeeds. On error the unit is dropped, which rolls
    /// back every write it made, and the error is returned unchanged.
    pub async fn atomically<T, F>(&self, f: F) -> AppResult<T>
    where
        T: Send,
        F: for<'t> FnOnce(&'t mut dyn StoreTx) -> TxFuture<'t, T> + Send,
    {
        let mut tx = self.store.begin().await?;
        let value = f(tx.as_mut()).await?;
        tx.commit().await?;
        Ok(value)
    }
}
