//! Borrow and return transactions
//!
//! Each mutation runs as one atomic unit against the store. The book row and
//! the borrower's open-record count are read inside the unit, so two
//! concurrent borrows can never both see the last copy, and two concurrent
//! returns of one record can never both credit the stock.

use chrono::{Months, Utc};

use crate::{
    config::LibraryConfig,
    error::{AppError, AppResult, Context},
    models::{BorrowRecord, NewBorrowRecord},
    repository::Repository,
};

#[derive(Clone)]
pub struct BorrowService {
    repository: Repository,
    config: LibraryConfig,
}

impl BorrowService {
    pub fn new(repository: Repository, config: LibraryConfig) -> Self {
        Self { repository, config }
    }

    /// Lend one copy of `book_id` to `user_id`
    pub async fn borrow_book(&self, user_id: i32, book_id: i32) -> AppResult<BorrowRecord> {
        if user_id <= 0 || book_id <= 0 {
            return Err(AppError::InvalidInput("Invalid user or book ID".to_string()));
        }

        let max_active = self.config.max_active_borrows;
        let loan_months = Months::new(self.config.loan_months);

        let record = self
            .repository
            .atomically(move |tx| {
                Box::pin(async move {
                    let mut book = tx
                        .book_by_id(book_id)
                        .await
                        .context("failed to get book by ID")?
                        .ok_or(AppError::BookNotFound)?;

                    if book.stock <= 0 {
                        return Err(AppError::StockNotEnough);
                    }

                    let active = tx
                        .count_open_records(user_id)
                        .await
                        .context("failed to count active borrows by user ID")?;
                    if active >= max_active {
                        return Err(AppError::BorrowLimit);
                    }

                    book.stock -= 1;
                    tx.update_book(&book)
                        .await
                        .context("failed to update book stock")?;

                    let borrowed_at = Utc::now();
                    let due_date = borrowed_at
                        .checked_add_months(loan_months)
                        .ok_or_else(|| AppError::Internal("due date out of range".to_string()))?;

                    tx.insert_record(&NewBorrowRecord {
                        user_id,
                        book_id,
                        borrowed_at,
                        due_date,
                    })
                    .await
                    .context("failed to create borrow record")
                })
            })
            .await?;

        tracing::debug!(record_id = record.id, user_id, book_id, "Book borrowed");
        Ok(record)
    }

    /// Close `record_id` on behalf of its borrower and put the copy back in stock
    pub async fn return_book(&self, record_id: i32, current_user_id: i32) -> AppResult<BorrowRecord> {
        if record_id <= 0 || current_user_id <= 0 {
            return Err(AppError::InvalidInput("Invalid record or user ID".to_string()));
        }

        let record = self
            .repository
            .atomically(move |tx| {
                Box::pin(async move {
                    // Lock order is book then record, as in the cascade delete
                    let book_id = tx
                        .peek_record(record_id)
                        .await
                        .context("failed to get borrow record by ID")?
                        .ok_or(AppError::RecordNotFound)?
                        .book_id;

                    let book = tx
                        .book_by_id(book_id)
                        .await
                        .context("failed to get book by ID")?;

                    let mut record = tx
                        .record_by_id(record_id)
                        .await
                        .context("failed to get borrow record by ID")?
                        .ok_or(AppError::RecordNotFound)?;

                    if record.user_id != current_user_id {
                        return Err(AppError::PermissionDenied);
                    }

                    if record.returned_at.is_some() {
                        return Err(AppError::AlreadyReturned);
                    }

                    let mut book = book.ok_or(AppError::BookNotFound)?;

                    book.stock += 1;
                    tx.update_book(&book)
                        .await
                        .context("failed to update book stock")?;

                    let returned_at = Utc::now();
                    tx.close_record(record.id, returned_at)
                        .await
                        .context("failed to update borrow record")?;
                    record.returned_at = Some(returned_at);

                    Ok(record)
                })
            })
            .await?;

        tracing::debug!(record_id, user_id = current_user_id, "Book returned");
        Ok(record)
    }

    /// Every record the user ever opened, returned or not
    pub async fn get_user_borrow_records(&self, user_id: i32) -> AppResult<Vec<BorrowRecord>> {
        if user_id <= 0 {
            return Err(AppError::InvalidInput("Invalid user ID".to_string()));
        }

        self.repository
            .store()
            .records_by_user(user_id)
            .await
            .context("failed to get borrow records by user ID")
    }
}
