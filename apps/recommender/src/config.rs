use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::datasource::circuit_breaker::CircuitBreakerConfig;
use crate::datasource::repository::CheckoutPolicy;
use crate::db::PoolSettings;
use crate::lifecycle::LifecycleConfig;
use crate::recommendation::EngineConfig;

/// Application configuration loaded from environment variables.
/// Fails at startup if `DATABASE_URL` is missing or any value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    pub model_dir: PathBuf,
    pub model_ttl_secs: u64,
    pub model_refresh_secs: u64,
    pub knn_neighbors: usize,
    pub similarity_floor: f64,
    pub request_timeout_secs: u64,
    pub db_pool_min: u32,
    pub db_pool_max: u32,
    pub db_acquire_retries: u32,
    pub db_retry_delay_ms: u64,
    pub db_fetch_chunk: i64,
    pub circuit_max_failures: u32,
    pub circuit_reset_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            model_dir: std::env::var("MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./model")),
            model_ttl_secs: env_or("MODEL_TTL_SECS", 24 * 60 * 60)?,
            model_refresh_secs: env_or("MODEL_REFRESH_SECS", 300)?,
            knn_neighbors: env_or("KNN_NEIGHBORS", 100)?,
            similarity_floor: env_or("SIMILARITY_FLOOR", 0.05)?,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30)?,
            db_pool_min: env_or("DB_POOL_MIN", 1)?,
            db_pool_max: env_or("DB_POOL_MAX", 10)?,
            db_acquire_retries: env_or("DB_ACQUIRE_RETRIES", 3)?,
            db_retry_delay_ms: env_or("DB_RETRY_DELAY_MS", 500)?,
            db_fetch_chunk: env_or("DB_FETCH_CHUNK", 500)?,
            circuit_max_failures: env_or("CIRCUIT_MAX_FAILURES", 5)?,
            circuit_reset_secs: env_or("CIRCUIT_RESET_SECS", 30)?,
        })
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            min_connections: self.db_pool_min,
            max_connections: self.db_pool_max.max(self.db_pool_min).max(1),
        }
    }

    pub fn checkout_policy(&self) -> CheckoutPolicy {
        CheckoutPolicy {
            retries: self.db_acquire_retries,
            delay: Duration::from_millis(self.db_retry_delay_ms),
        }
    }

    pub fn circuit_breaker(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig::new(
            self.circuit_max_failures,
            Duration::from_secs(self.circuit_reset_secs),
        )
    }

    pub fn lifecycle(&self) -> LifecycleConfig {
        LifecycleConfig {
            ttl: Duration::from_secs(self.model_ttl_secs),
            configured_k: self.knn_neighbors,
        }
    }

    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            similarity_floor: self.similarity_floor,
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.model_refresh_secs)
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_or(key, std::env::var(key).ok().as_deref(), default)
}

fn parse_or<T>(key: &str, raw: Option<&str>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => value
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{value}'")),
    }
}
