//! Lending core against a real PostgreSQL database
//!
//! Needs `DATABASE_URL` pointing at a scratch database; migrations are applied
//! on connect. Run with: cargo test --test pg_store_tests -- --ignored

use std::{sync::Arc, time::Duration};

use sqlx::postgres::PgPoolOptions;

use lendbook_server::{
    config::LibraryConfig,
    models::{NewBook, NewUser, Role, User},
    repository::{PgStore, Repository, Store, StoreTx},
    services::{admin::AdminService, borrows::BorrowService},
    AppError,
};

async fn pg_store() -> Arc<PgStore> {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&url)
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    Arc::new(PgStore::new(pool))
}

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}

async fn add_user(repository: &Repository) -> User {
    let user = NewUser {
        name: unique("reader"),
        password_hash: "unused".to_string(),
        role: Role::User,
    };
    repository
        .atomically(move |tx| Box::pin(async move { tx.insert_user(&user).await }))
        .await
        .unwrap()
}

async fn add_book(repository: &Repository, stock: i32) -> i32 {
    let book = NewBook {
        title: unique("book"),
        author: "Integration".to_string(),
        stock,
    };
    repository
        .atomically(move |tx| Box::pin(async move { tx.insert_book(&book).await }))
        .await
        .unwrap()
        .id
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_concurrent_borrows_never_oversell() {
    let store = pg_store().await;
    let repository = Repository::new(store.clone());
    let borrows = BorrowService::new(repository.clone(), LibraryConfig::default());
    let book_id = add_book(&repository, 3).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let user = add_user(&repository).await;
        let borrows = borrows.clone();
        handles.push(tokio::spawn(async move { borrows.borrow_book(user.id, book_id).await }));
    }

    let mut ok = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => ok += 1,
            Err(AppError::StockNotEnough) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(ok, 3);
    assert_eq!(store.book_by_id(book_id).await.unwrap().unwrap().stock, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_concurrent_borrows_by_one_user_respect_limit() {
    let store = pg_store().await;
    let repository = Repository::new(store.clone());
    let borrows = BorrowService::new(repository.clone(), LibraryConfig::default());
    let user = add_user(&repository).await;
    let book_id = add_book(&repository, 20).await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let borrows = borrows.clone();
            let user_id = user.id;
            tokio::spawn(async move { borrows.borrow_book(user_id, book_id).await })
        })
        .collect();

    let mut ok = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => ok += 1,
            Err(AppError::BorrowLimit) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(ok, 5);
    assert_eq!(store.book_by_id(book_id).await.unwrap().unwrap().stock, 15);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_concurrent_returns_credit_stock_once() {
    let store = pg_store().await;
    let repository = Repository::new(store.clone());
    let borrows = BorrowService::new(repository.clone(), LibraryConfig::default());
    let user = add_user(&repository).await;
    let book_id = add_book(&repository, 1).await;
    let record = borrows.borrow_book(user.id, book_id).await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let borrows = borrows.clone();
            let (record_id, user_id) = (record.id, user.id);
            tokio::spawn(async move { borrows.return_book(record_id, user_id).await })
        })
        .collect();

    let mut ok = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => ok += 1,
            Err(AppError::AlreadyReturned) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(ok, 1);
    assert_eq!(store.book_by_id(book_id).await.unwrap().unwrap().stock, 1);
}

/// A return arriving while a deletion holds the book must queue behind it
/// and then see the record force-closed, never abort on a lock cycle.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_return_waits_for_book_deletion() {
    let store = pg_store().await;
    let repository = Repository::new(store.clone());
    let borrows = BorrowService::new(repository.clone(), LibraryConfig::default());
    let user = add_user(&repository).await;
    let book_id = add_book(&repository, 1).await;
    let record = borrows.borrow_book(user.id, book_id).await.unwrap();

    // Deletion steps, holding the book lock while the return starts
    let mut deleting = store.begin().await.unwrap();
    deleting.book_by_id(book_id).await.unwrap().unwrap();

    let returning = {
        let borrows = borrows.clone();
        tokio::spawn(async move { borrows.return_book(record.id, user.id).await })
    };
    tokio::time::sleep(Duration::from_millis(200)).await;

    let records = deleting.records_by_book(book_id).await.unwrap();
    assert_eq!(records.len(), 1);
    deleting
        .close_record(record.id, chrono::Utc::now())
        .await
        .unwrap();
    deleting.delete_book(book_id).await.unwrap();
    deleting.commit().await.unwrap();

    assert!(matches!(
        returning.await.unwrap(),
        Err(AppError::AlreadyReturned)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_return_and_delete_races_end_cleanly() {
    let store = pg_store().await;
    let repository = Repository::new(store.clone());
    let borrows = BorrowService::new(repository.clone(), LibraryConfig::default());
    let admin = AdminService::new(repository.clone(), LibraryConfig::default());

    for _ in 0..20 {
        let user = add_user(&repository).await;
        let book_id = add_book(&repository, 1).await;
        let record = borrows.borrow_book(user.id, book_id).await.unwrap();

        let returning = {
            let borrows = borrows.clone();
            tokio::spawn(async move { borrows.return_book(record.id, user.id).await })
        };
        let deleting = {
            let admin = admin.clone();
            tokio::spawn(async move { admin.delete_book(book_id).await })
        };

        match returning.await.unwrap() {
            Ok(_) | Err(AppError::AlreadyReturned) => {}
            Err(e) => panic!("unexpected return error: {}", e),
        }
        deleting.await.unwrap().unwrap();
        assert!(store.book_by_id(book_id).await.unwrap().is_none());
    }
}
