use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use crate::datasource::circuit_breaker::{
    BreakerError, CircuitBreaker, CircuitBreakerConfig, CircuitState,
};
use crate::datasource::repository::{RepositoryError, VacancyRepository};
use crate::models::posting::Posting;
use crate::skills::SkillNormalizer;

#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("Data source unavailable: {0}")]
    Unavailable(#[from] RepositoryError),

    /// Rejected without touching the repository.
    #[error("Data source circuit is open; retry after {retry_after_ms}ms")]
    CircuitOpen { retry_after_ms: u64 },
}

/// Posting retrieval behind a circuit breaker. The repository itself owns
/// connection pooling and checkout retries.
pub struct ResilientDataSource {
    repository: Arc<dyn VacancyRepository>,
    breaker: CircuitBreaker,
    normalizer: Arc<SkillNormalizer>,
}

impl ResilientDataSource {
    pub fn new(
        repository: Arc<dyn VacancyRepository>,
        breaker: CircuitBreakerConfig,
        normalizer: Arc<SkillNormalizer>,
    ) -> Self {
        Self {
            repository,
            breaker: CircuitBreaker::new("vacancy_repository", breaker),
            normalizer,
        }
    }

    /// Fetches every posting, normalizing its skill text. Failures are logged
    /// here and returned; the lifecycle manager decides whether stale data is served.
    pub async fn try_fetch_postings(&self) -> Result<Vec<Posting>, DataSourceError> {
        let records = self
            .breaker
            .call(|| self.repository.list_postings())
            .await
            .map_err(|e| {
                let e = match e {
                    BreakerError::Open { retry_after_ms } => {
                        DataSourceError::CircuitOpen { retry_after_ms }
                    }
                    BreakerError::Inner(e) => DataSourceError::Unavailable(e),
                };
                error!(error = %e, "Failed to fetch postings");
                e
            })?;

        let postings: Vec<Posting> = records
            .into_iter()
            .map(|record| Posting::from_record(record, &self.normalizer))
            .collect();
        info!(count = postings.len(), "Loaded postings from data source");
        Ok(postings)
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }
}
