//! State shared by every route handler.

use curbside_common::config::AppConfig;
use redis::aio::ConnectionManager;
use sqlx::PgPool;

use crate::middleware::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub redis: ConnectionManager,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(pool: PgPool, redis: ConnectionManager, config: AppConfig) -> Self {
        Self {
            pool,
            redis,
            config,
        }
    }

    /// Revocation list for logged-out tokens.
    pub fn sessions(&self) -> SessionStore {
        SessionStore::new(self.redis.clone())
    }
}
