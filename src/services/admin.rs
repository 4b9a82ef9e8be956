//! Administrative catalog changes and audit reads

use chrono::Utc;

use crate::{
    config::LibraryConfig,
    error::{AppError, AppResult, Context},
    models::{Book, BorrowRecord, NewBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct AdminService {
    repository: Repository,
    config: LibraryConfig,
}

impl AdminService {
    pub fn new(repository: Repository, config: LibraryConfig) -> Self {
        Self { repository, config }
    }

    fn check_book_id(&self, id: i32) -> AppResult<()> {
        if id < self.config.min_book_id {
            return Err(AppError::InvalidInput(format!("Invalid book ID {}", id)));
        }
        Ok(())
    }

    /// Add a title to the catalog. Titles are unique.
    pub async fn add_book(&self, title: &str, author: &str, stock: i32) -> AppResult<Book> {
        if title.is_empty() || author.is_empty() || stock < 0 {
            return Err(AppError::InvalidInput(
                "Title and author are required and stock must not be negative".to_string(),
            ));
        }

        let new_book = NewBook {
            title: title.to_string(),
            author: author.to_string(),
            stock,
        };

        let book = self
            .repository
            .atomically(move |tx| {
                Box::pin(async move {
                    if tx
                        .book_by_title(&new_book.title)
                        .await
                        .context("failed to check book existence")?
                        .is_some()
                    {
                        return Err(AppError::BookExists);
                    }
                    tx.insert_book(&new_book).await.context("failed to create book")
                })
            })
            .await?;

        tracing::info!(book_id = book.id, title = %book.title, "Book added");
        Ok(book)
    }

    /// Overwrite title, author and stock of an existing book
    pub async fn update_book(&self, title: &str, author: &str, id: i32, stock: i32) -> AppResult<Book> {
        if title.is_empty() || author.is_empty() || stock < 0 {
            return Err(AppError::InvalidInput(
                "Title and author are required and stock must not be negative".to_string(),
            ));
        }
        self.check_book_id(id)?;

        let title = title.to_string();
        let author = author.to_string();

        let book = self
            .repository
            .atomically(move |tx| {
                Box::pin(async move {
                    let mut book = tx
                        .book_by_id(id)
                        .await
                        .context("failed to get book by ID")?
                        .ok_or(AppError::BookNotFound)?;

                    book.title = title;
                    book.author = author;
                    book.stock = stock;

                    tx.update_book(&book).await.context("failed to update book")?;
                    Ok(book)
                })
            })
            .await?;

        tracing::info!(book_id = book.id, "Book updated");
        Ok(book)
    }

    /// Delete a book, force-closing every open record that references it.
    ///
    /// Closed records keep their now dangling `book_id` as history. Stock is
    /// not credited back for the force-closed loans since the book is gone;
    /// whether those copies need separate accounting is an open question for
    /// the library staff. Returns how many records were closed.
    pub async fn delete_book(&self, id: i32) -> AppResult<usize> {
        self.check_book_id(id)?;

        let closed = self
            .repository
            .atomically(move |tx| {
                Box::pin(async move {
                    let book = tx
                        .book_by_id(id)
                        .await
                        .context("failed to get book by ID")?
                        .ok_or(AppError::BookNotFound)?;

                    let records = tx
                        .records_by_book(book.id)
                        .await
                        .context("failed to get borrow records by book ID")?;

                    let now = Utc::now();
                    let mut closed = 0;
                    for record in records.iter().filter(|r| r.is_open()) {
                        tx.close_record(record.id, now)
                            .await
                            .context("failed to update borrow record")?;
                        closed += 1;
                    }

                    tx.delete_book(book.id).await.context("failed to delete book")?;
                    Ok(closed)
                })
            })
            .await?;

        tracing::info!(book_id = id, closed_records = closed, "Book deleted");
        Ok(closed)
    }

    /// Every borrow record in the store
    pub async fn get_all_borrow_records(&self) -> AppResult<Vec<BorrowRecord>> {
        self.repository
            .store()
            .records_all()
            .await
            .context("failed to get all borrow records")
    }
}
