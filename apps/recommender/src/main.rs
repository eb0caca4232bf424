mod config;
mod datasource;
mod db;
mod errors;
mod index;
mod lifecycle;
mod models;
mod recommendation;
mod routes;
mod skills;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::datasource::repository::PgVacancyRepository;
use crate::datasource::ResilientDataSource;
use crate::db::create_pool;
use crate::lifecycle::scheduler::spawn_refresh_loop;
use crate::lifecycle::{ModelLifecycleManager, ModelStore};
use crate::recommendation::RecommendationEngine;
use crate::routes::build_router;
use crate::skills::SkillNormalizer;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing or malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting vacancy recommender v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (lazy: connections open on first checkout)
    let pool = create_pool(&config.database_url, config.pool_settings())?;
    let repository = Arc::new(PgVacancyRepository::new(
        pool,
        config.checkout_policy(),
        config.db_fetch_chunk,
    ));

    let normalizer = Arc::new(SkillNormalizer::default());
    info!(
        compound_terms = normalizer.compounds().terms().len(),
        "Skill normalizer initialized"
    );

    let data_source = Arc::new(ResilientDataSource::new(
        repository,
        config.circuit_breaker(),
        Arc::clone(&normalizer),
    ));

    let lifecycle = Arc::new(ModelLifecycleManager::new(
        Arc::clone(&data_source),
        ModelStore::new(&config.model_dir),
        Arc::clone(&normalizer),
        config.lifecycle(),
    ));
    info!(
        dir = %config.model_dir.display(),
        ttl_secs = config.model_ttl_secs,
        "Model lifecycle manager initialized"
    );

    let engine = Arc::new(RecommendationEngine::new(
        Arc::clone(&lifecycle),
        normalizer,
        config.engine(),
    ));

    // First tick trains or loads the model in the background
    let _refresh = spawn_refresh_loop(Arc::clone(&lifecycle), config.refresh_interval());

    // Build app state
    let state = AppState {
        engine,
        lifecycle,
        data_source,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
