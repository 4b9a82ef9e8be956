//! In-memory store for tests and local development.
//!
//! A unit of work holds the store's only lock for its whole lifetime and
//! mutates a private copy of the state. Commit publishes the copy, drop
//! throws it away, so units are serialisable and rollback is free.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Store, StoreTx};
use crate::{
    error::{AppError, AppResult},
    models::{Book, BorrowRecord, NewBook, NewBorrowRecord, NewUser, User},
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: BTreeMap<i32, User>,
    books: BTreeMap<i32, Book>,
    records: BTreeMap<i32, BorrowRecord>,
    next_user_id: i32,
    next_book_id: i32,
    next_record_id: i32,
}

impl MemoryState {
    fn next_id(counter: &mut i32) -> i32 {
        *counter += 1;
        *counter
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    #[cfg(test)]
    fail_record_inserts: Arc<std::sync::atomic::AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `insert_record` fail, to exercise rollback
    #[cfg(test)]
    pub fn fail_record_inserts(&self, fail: bool) {
        self.fail_record_inserts
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryStoreTx {
            guard,
            work,
            #[cfg(test)]
            fail_record_inserts: self
                .fail_record_inserts
                .load(std::sync::atomic::Ordering::SeqCst),
        }))
    }

    async fn books_all(&self) -> AppResult<Vec<Book>> {
        Ok(self.state.lock().await.books.values().cloned().collect())
    }

    async fn book_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        Ok(self.state.lock().await.books.get(&id).cloned())
    }

    async fn book_by_title(&self, title: &str) -> AppResult<Option<Book>> {
        let state = self.state.lock().await;
        Ok(state.books.values().find(|b| b.title == title).cloned())
    }

    async fn books_search_keyword(&self, keyword: &str) -> AppResult<Vec<Book>> {
        let state = self.state.lock().await;
        Ok(state
            .books
            .values()
            .filter(|b| b.title.contains(keyword) || b.author.contains(keyword))
            .cloned()
            .collect())
    }

    async fn books_search_title(&self, keyword: &str) -> AppResult<Vec<Book>> {
        let state = self.state.lock().await;
        Ok(state
            .books
            .values()
            .filter(|b| b.title.contains(keyword))
            .cloned()
            .collect())
    }

    async fn books_by_author(&self, author: &str) -> AppResult<Vec<Book>> {
        let state = self.state.lock().await;
        Ok(state
            .books
            .values()
            .filter(|b| b.author == author)
            .cloned()
            .collect())
    }

    async fn user_by_name(&self, name: &str) -> AppResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.name == name).cloned())
    }

    async fn records_all(&self) -> AppResult<Vec<BorrowRecord>> {
        Ok(self.state.lock().await.records.values().cloned().collect())
    }

    async fn records_by_user(&self, user_id: i32) -> AppResult<Vec<BorrowRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .records
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }
}

pub struct MemoryStoreTx {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
    #[cfg(test)]
    fail_record_inserts: bool,
}

impl MemoryStoreTx {
    #[cfg(test)]
    fn insert_should_fail(&self) -> bool {
        self.fail_record_inserts
    }

    #[cfg(not(test))]
    fn insert_should_fail(&self) -> bool {
        false
    }
}

#[async_trait]
impl StoreTx for MemoryStoreTx {
    async fn book_by_id(&mut self, id: i32) -> AppResult<Option<Book>> {
        Ok(self.work.books.get(&id).cloned())
    }

    async fn book_by_title(&mut self, title: &str) -> AppResult<Option<Book>> {
        Ok(self.work.books.values().find(|b| b.title == title).cloned())
    }

    async fn insert_book(&mut self, book: &NewBook) -> AppResult<Book> {
        if self.work.books.values().any(|b| b.title == book.title) {
            return Err(AppError::BookExists);
        }
        let id = MemoryState::next_id(&mut self.work.next_book_id);
        let book = Book {
            id,
            title: book.title.clone(),
            author: book.author.clone(),
            stock: book.stock,
        };
        self.work.books.insert(id, book.clone());
        Ok(book)
    }

    async fn update_book(&mut self, book: &Book) -> AppResult<()> {
        if self
            .work
            .books
            .values()
            .any(|b| b.id != book.id && b.title == book.title)
        {
            return Err(AppError::BookExists);
        }
        if book.stock < 0 {
            return Err(AppError::Internal("stock constraint violated".to_string()));
        }
        if let Some(existing) = self.work.books.get_mut(&book.id) {
            *existing = book.clone();
        }
        Ok(())
    }

    async fn delete_book(&mut self, id: i32) -> AppResult<()> {
        self.work.books.remove(&id);
        Ok(())
    }

    async fn user_by_name(&mut self, name: &str) -> AppResult<Option<User>> {
        Ok(self.work.users.values().find(|u| u.name == name).cloned())
    }

    async fn insert_user(&mut self, user: &NewUser) -> AppResult<User> {
        if self.work.users.values().any(|u| u.name == user.name) {
            return Err(AppError::UserExists);
        }
        let id = MemoryState::next_id(&mut self.work.next_user_id);
        let user = User {
            id,
            name: user.name.clone(),
            password: user.password_hash.clone(),
            role: user.role,
        };
        self.work.users.insert(id, user.clone());
        Ok(user)
    }

    async fn peek_record(&mut self, id: i32) -> AppResult<Option<BorrowRecord>> {
        Ok(self.work.records.get(&id).cloned())
    }

    async fn record_by_id(&mut self, id: i32) -> AppResult<Option<BorrowRecord>> {
        Ok(self.work.records.get(&id).cloned())
    }

    async fn records_by_book(&mut self, book_id: i32) -> AppResult<Vec<BorrowRecord>> {
        Ok(self
            .work
            .records
            .values()
            .filter(|r| r.book_id == book_id)
            .cloned()
            .collect())
    }

    async fn count_open_records(&mut self, user_id: i32) -> AppResult<i64> {
        Ok(self
            .work
            .records
            .values()
            .filter(|r| r.user_id == user_id && r.is_open())
            .count() as i64)
    }

    async fn insert_record(&mut self, record: &NewBorrowRecord) -> AppResult<BorrowRecord> {
        if self.insert_should_fail() {
            return Err(AppError::Internal("injected insert failure".to_string()));
        }

        let id = MemoryState::next_id(&mut self.work.next_record_id);
        let record = BorrowRecord {
            id,
            user_id: record.user_id,
            book_id: record.book_id,
            borrowed_at: record.borrowed_at,
            due_date: record.due_date,
            returned_at: None,
        };
        self.work.records.insert(id, record.clone());
        Ok(record)
    }

    async fn close_record(&mut self, id: i32, returned_at: DateTime<Utc>) -> AppResult<()> {
        if let Some(record) = self.work.records.get_mut(&id) {
            if record.returned_at.is_none() {
                record.returned_at = Some(returned_at);
            }
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryStoreTx { mut guard, work, .. } = *self;
        *guard = work;
        Ok(())
    }
}
