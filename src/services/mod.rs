//! Business logic services

pub mod auth;
pub mod catalog;
pub mod credentials;
pub mod loans;
pub mod revocation;
pub mod token;
pub mod users;

use crate::{config::AuthConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub users: users::UsersService,
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, auth_config: &AuthConfig) -> AppResult<Self> {
        Ok(Self {
            auth: auth::AuthService::new(repository.clone(), auth_config)?,
            users: users::UsersService::new(repository.clone()),
            catalog: catalog::CatalogService::new(repository.clone()),
            loans: loans::LoansService::new(repository.clone()),
            repository,
        })
    }

    /// Round-trip to the store, used by the readiness probe
    pub async fn ping_store(&self) -> AppResult<()> {
        self.repository.users.count().await.map(|_| ())
    }
}
