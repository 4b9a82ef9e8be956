//! Lendbook Server
//!
//! REST JSON API for a small lending library: a catalog of books with stock
//! counts, user accounts with session login, and borrow/return bookkeeping
//! whose every mutation runs as one atomic unit.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

use repository::{Repository, Store};
use services::{
    sessions::{SessionService, SessionStore},
    Services,
};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<Services>,
}

impl AppState {
    /// Wire services on top of the chosen storage and session backends
    pub fn new(config: AppConfig, store: Arc<dyn Store>, session_store: Arc<dyn SessionStore>) -> Self {
        let repository = Repository::new(store);
        let sessions = SessionService::new(session_store, config.sessions.clone());
        let services = Services::new(repository, sessions, &config);

        Self {
            services: Arc::new(services),
        }
    }
}
