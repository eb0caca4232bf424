//! Model Lifecycle Manager: keeps one trained index generation published.
//!
//! - Staleness is decided by the persisted timestamp marker alone
//! - A fresh marker with no matching in-memory generation means "reload from disk"
//! - At most one training pass runs at a time, in its own task; while a
//!   generation exists every caller gets it immediately and only a cold start
//!   waits for the pass
//! - A failed pass falls back to the previous generation when there is one

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::datasource::{DataSourceError, ResilientDataSource};
use crate::index::VacancyIndex;
use crate::lifecycle::persistence::{ModelStore, PersistenceError};
use crate::skills::SkillNormalizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelState {
    Fresh,
    Stale,
    Training,
}

#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Age after which a trained generation is stale.
    pub ttl: Duration,
    /// Neighbour count the index is built for.
    pub configured_k: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 60 * 60),
            configured_k: 100,
        }
    }
}

/// Why a training pass did not produce a new generation.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error(transparent)]
    DataSource(#[from] DataSourceError),

    #[error("Could not persist model: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Training task failed: {0}")]
    Task(String),
}

/// No generation is available at all: nothing was ever trained or loaded,
/// and the latest attempt failed.
#[derive(Debug, Error)]
#[error("No model generation available: {reason}")]
pub struct ModelUnavailable {
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshMode {
    IfStale,
    Force,
}

pub struct ModelLifecycleManager {
    source: Arc<ResilientDataSource>,
    store: ModelStore,
    normalizer: Arc<SkillNormalizer>,
    config: LifecycleConfig,
    current: RwLock<Option<Arc<VacancyIndex>>>,
    training: Arc<Mutex<()>>,
}

impl ModelLifecycleManager {
    pub fn new(
        source: Arc<ResilientDataSource>,
        store: ModelStore,
        normalizer: Arc<SkillNormalizer>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            source,
            store,
            normalizer,
            config,
            current: RwLock::new(None),
            training: Arc::new(Mutex::new(())),
        }
    }

    /// The published generation, if any. The lock is held only to clone the `Arc`.
    pub fn current(&self) -> Option<Arc<VacancyIndex>> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn publish(&self, index: Arc<VacancyIndex>) {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(index);
    }

    /// True when the marker is missing, unreadable, or older than the TTL.
    pub async fn needs_retrain(&self) -> bool {
        match self.store.trained_at().await {
            Some(trained_at) => self.is_expired(trained_at),
            None => true,
        }
    }

    pub async fn state(&self) -> ModelState {
        if self.training.try_lock().is_err() {
            return ModelState::Training;
        }
        if self.current().is_none() || self.needs_retrain().await {
            ModelState::Stale
        } else {
            ModelState::Fresh
        }
    }

    fn is_expired(&self, trained_at: DateTime<Utc>) -> bool {
        match Utc::now().signed_duration_since(trained_at).to_std() {
            Ok(age) => age > self.config.ttl,
            // Marker from the future (clock skew): not expired.
            Err(_) => false,
        }
    }

    /// Returns a usable generation, retraining or reloading first when needed.
    pub async fn ensure_fresh(self: &Arc<Self>) -> Result<Arc<VacancyIndex>, ModelUnavailable> {
        if let Some(trained_at) = self.store.trained_at().await {
            if !self.is_expired(trained_at) {
                if let Some(current) = self.current().filter(|c| c.trained_at() == trained_at) {
                    return Ok(current);
                }
            }
        }
        self.refresh(RefreshMode::IfStale).await
    }

    /// Retrains regardless of staleness, with the same fallback rules.
    pub async fn retrain(self: &Arc<Self>) -> Result<Arc<VacancyIndex>, ModelUnavailable> {
        self.refresh(RefreshMode::Force).await
    }

    async fn refresh(self: &Arc<Self>, mode: RefreshMode) -> Result<Arc<VacancyIndex>, ModelUnavailable> {
        let guard = match Arc::clone(&self.training).try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => {
                if let Some(current) = self.current() {
                    debug!("Model refresh already running; serving previous generation");
                    return Ok(current);
                }
                // Cold start: nothing to serve yet, so wait for the running pass.
                let _done = self.training.lock().await;
                return self.current().ok_or_else(|| ModelUnavailable {
                    reason: "concurrent training pass produced no model".to_string(),
                });
            }
        };

        // The pass runs in its own task so an abandoned request cannot cancel it halfway.
        let previous = self.current();
        let manager = Arc::clone(self);
        let pass = tokio::spawn(async move {
            let _guard = guard;
            manager.refresh_locked(mode).await
        });

        // Stale-while-revalidate: only a cold start waits for the pass.
        if mode == RefreshMode::IfStale {
            if let Some(previous) = previous {
                debug!(
                    generation = %previous.generation(),
                    "Model refresh started in background; serving previous generation"
                );
                return Ok(previous);
            }
        }

        match pass.await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "Model refresh task aborted");
                self.current().ok_or_else(|| ModelUnavailable {
                    reason: format!("refresh task aborted: {e}"),
                })
            }
        }
    }

    /// Resolves once no training pass holds the guard.
    #[cfg(test)]
    pub(crate) async fn wait_for_refresh(&self) {
        let _idle = self.training.lock().await;
    }

    async fn refresh_locked(&self, mode: RefreshMode) -> Result<Arc<VacancyIndex>, ModelUnavailable> {
        if mode == RefreshMode::IfStale {
            if let Some(index) = self.reuse_persisted().await {
                return Ok(index);
            }
        }

        match self.train().await {
            Ok(index) => Ok(index),
            Err(e) => match self.current() {
                Some(previous) => {
                    warn!(
                        error = %e,
                        generation = %previous.generation(),
                        "Training failed; serving previous generation"
                    );
                    Ok(previous)
                }
                None => {
                    error!(error = %e, "Training failed and no previous generation exists");
                    Err(ModelUnavailable {
                        reason: e.to_string(),
                    })
                }
            },
        }
    }

    /// A fresh marker may belong to a generation written by an earlier pass or
    /// process; load it instead of retraining.
    async fn reuse_persisted(&self) -> Option<Arc<VacancyIndex>> {
        let trained_at = self.store.trained_at().await?;
        if self.is_expired(trained_at) {
            return None;
        }
        if let Some(current) = self.current().filter(|c| c.trained_at() == trained_at) {
            return Some(current);
        }

        let store = self.store.clone();
        let loaded = match tokio::task::spawn_blocking(move || store.load()).await {
            Ok(Ok(index)) => index,
            Ok(Err(e)) => {
                warn!(error = %e, "Persisted model unreadable; retraining");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Model load task failed; retraining");
                return None;
            }
        };

        if !loaded.is_compatible_with(&self.normalizer) {
            warn!("Persisted model was built with different skill rules; retraining");
            return None;
        }
        if loaded.trained_at() != trained_at {
            warn!("Persisted model does not match its timestamp marker; retraining");
            return None;
        }

        let index = Arc::new(loaded);
        info!(
            generation = %index.generation(),
            postings = index.corpus_size(),
            trained_at = %index.trained_at(),
            "Loaded persisted model"
        );
        self.publish(Arc::clone(&index));
        Some(index)
    }

    async fn train(&self) -> Result<Arc<VacancyIndex>, TrainingError> {
        let started = Instant::now();
        info!("Training vacancy index");

        let postings = self.source.try_fetch_postings().await?;

        let store = self.store.clone();
        let normalizer = Arc::clone(&self.normalizer);
        let configured_k = self.config.configured_k;
        let index = tokio::task::spawn_blocking(move || -> Result<VacancyIndex, TrainingError> {
            let index = VacancyIndex::build(postings, configured_k, &normalizer);
            store.save(&index)?;
            Ok(index)
        })
        .await
        .map_err(|e| TrainingError::Task(e.to_string()))??;

        let index = Arc::new(index);
        self.publish(Arc::clone(&index));
        info!(
            generation = %index.generation(),
            postings = index.corpus_size(),
            terms = index.model().vocabulary_size(),
            skills = index.vocabulary().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Published new model generation"
        );
        Ok(index)
    }
}
