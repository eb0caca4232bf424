use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Checkout waits this long before a single attempt counts as failed;
/// retries are layered on top by the repository.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
pub struct PoolSettings {
    pub min_connections: u32,
    pub max_connections: u32,
}

/// Creates the PostgreSQL connection pool.
///
/// Connections are opened lazily, so the service starts (and serves a
/// persisted model) even while the database is down.
pub fn create_pool(database_url: &str, settings: PoolSettings) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .min_connections(settings.min_connections)
        .max_connections(settings.max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_lazy(database_url)
        .context("DATABASE_URL is not a valid PostgreSQL connection string")?;

    info!(
        min = settings.min_connections,
        max = settings.max_connections,
        "PostgreSQL connection pool configured"
    );
    Ok(pool)
}
