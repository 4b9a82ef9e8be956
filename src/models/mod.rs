//! Data models for the lending server

pub mod book;
pub mod borrow_record;
pub mod session;
pub mod user;

// Re-export commonly used types
pub use book::{Book, NewBook};
pub use borrow_record::{BorrowRecord, NewBorrowRecord};
pub use session::{Identity, SessionData};
pub use user::{NewUser, Role, User};
