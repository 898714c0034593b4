use std::sync::Arc;

use diesel::{
    pg::PgConnection,
    r2d2::{ConnectionManager, PooledConnection},
};

use crate::{
    auth::{jwt::JwtService, provider::IdentityProvider},
    config::AppConfig,
    db::PgPool,
    directory::DirectoryLookup,
    error::{AppError, AppResult},
};

type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub jwt: JwtService,
    pub identity_provider: Arc<dyn IdentityProvider>,
    pub directory: Arc<dyn DirectoryLookup>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        config: AppConfig,
        jwt: JwtService,
        identity_provider: Arc<dyn IdentityProvider>,
        directory: Arc<dyn DirectoryLookup>,
    ) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            jwt,
            identity_provider,
            directory,
        }
    }

    pub fn db(&self) -> AppResult<PgPooledConnection> {
        self.pool
            .get()
            .map_err(|err| AppError::internal(format!("database pool error: {err}")))
    }
}
