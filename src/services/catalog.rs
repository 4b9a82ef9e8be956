//! Read-only catalog lookups and search

use crate::{
    error::{AppError, AppResult, Context},
    models::Book,
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get_all_books(&self) -> AppResult<Vec<Book>> {
        self.repository
            .store()
            .books_all()
            .await
            .context("failed to get all books")
    }

    pub async fn get_book_by_id(&self, id: i32) -> AppResult<Book> {
        self.repository
            .store()
            .book_by_id(id)
            .await
            .context("failed to get book by ID")?
            .ok_or(AppError::BookNotFound)
    }

    pub async fn get_book_by_title(&self, title: &str) -> AppResult<Book> {
        self.repository
            .store()
            .book_by_title(title)
            .await
            .context("failed to get book by title")?
            .ok_or(AppError::BookNotFound)
    }

    /// Books whose title or author contains `keyword`
    pub async fn search_by_keyword(&self, keyword: &str) -> AppResult<Vec<Book>> {
        self.repository
            .store()
            .books_search_keyword(keyword)
            .await
            .context("failed to search books by keyword")
    }

    /// Books whose title contains `keyword`
    pub async fn search_by_title_keyword(&self, keyword: &str) -> AppResult<Vec<Book>> {
        self.repository
            .store()
            .books_search_title(keyword)
            .await
            .context("failed to search books by title keyword")
    }

    /// Books by exactly this author
    pub async fn search_by_author(&self, author: &str) -> AppResult<Vec<Book>> {
        self.repository
            .store()
            .books_by_author(author)
            .await
            .context("failed to search books by author")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{memory_repository, seed_book};

    async fn catalog() -> CatalogService {
        let (repository, _) = memory_repository();
        seed_book(&repository, "The Hobbit", "J. R. R. Tolkien", 3).await;
        seed_book(&repository, "The Silmarillion", "J. R. R. Tolkien", 1).await;
        seed_book(&repository, "Hobbit Cookbook", "Anon", 0).await;
        CatalogService::new(repository)
    }

    #[tokio::test]
    async fn lookups_by_id_and_title() {
        let catalog = catalog().await;

        let hobbit = catalog.get_book_by_title("The Hobbit").await.unwrap();
        assert_eq!(catalog.get_book_by_id(hobbit.id).await.unwrap(), hobbit);

        assert!(matches!(
            catalog.get_book_by_id(999).await,
            Err(AppError::BookNotFound)
        ));
        assert!(matches!(
            catalog.get_book_by_title("Hobbit").await,
            Err(AppError::BookNotFound)
        ));
        assert_eq!(catalog.get_all_books().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn keyword_matches_title_or_author() {
        let catalog = catalog().await;

        assert_eq!(catalog.search_by_keyword("Hobbit").await.unwrap().len(), 2);
        assert_eq!(catalog.search_by_keyword("Tolkien").await.unwrap().len(), 2);
        assert_eq!(catalog.search_by_keyword("Anon").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn title_and_author_searches() {
        let catalog = catalog().await;

        let titles = catalog.search_by_title_keyword("Silm").await.unwrap();
        assert_eq!(titles.len(), 1);
        assert!(catalog.search_by_title_keyword("Tolkien").await.unwrap().is_empty());

        assert_eq!(catalog.search_by_author("J. R. R. Tolkien").await.unwrap().len(), 2);
        // Exact match only
        assert!(catalog.search_by_author("Tolkien").await.unwrap().is_empty());
    }
}
