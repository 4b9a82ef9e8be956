//! Business logic services

pub mod admin;
pub mod auth;
pub mod borrows;
pub mod catalog;
pub mod sessions;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub catalog: catalog::CatalogService,
    pub borrows: borrows::BorrowService,
    pub admin: admin::AdminService,
    pub sessions: sessions::SessionService,
}

impl Services {
    /// Create all services on top of the given repository and session store
    pub fn new(
        repository: Repository,
        sessions: sessions::SessionService,
        config: &AppConfig,
    ) -> Self {
        Self {
            auth: auth::AuthService::new(repository.clone()),
            catalog: catalog::CatalogService::new(repository.clone()),
            borrows: borrows::BorrowService::new(repository.clone(), config.library.clone()),
            admin: admin::AdminService::new(repository, config.library.clone()),
            sessions,
        }
    }
}
