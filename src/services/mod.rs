//! Business logic services

pub mod catalog;
pub mod redis;
pub mod sessions;
pub mod templates;
pub mod users;

use std::sync::Arc;

use crate::{config::AuthConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub repository: Repository,
    pub catalog: catalog::CatalogService,
    pub users: users::UsersService,
    pub sessions: sessions::SessionService,
    pub templates: templates::Templates,
}

impl Services {
    /// Create all services with the given repository and revocation store
    pub fn new(
        repository: Repository,
        auth_config: AuthConfig,
        revocations: Arc<dyn sessions::RevocationStore>,
    ) -> AppResult<Self> {
        Ok(Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            users: users::UsersService::new(repository.clone()),
            sessions: sessions::SessionService::new(auth_config, revocations),
            templates: templates::Templates::new()?,
            repository,
        })
    }
}
