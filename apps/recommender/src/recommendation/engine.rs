use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::index::VacancyIndex;
use crate::lifecycle::ModelLifecycleManager;
use crate::models::recommendation::Recommendation;
use crate::recommendation::scoring::{rank, score_candidate, MAX_TOP_N};
use crate::skills::{SkillInput, SkillNormalizer};

/// Candidates retrieved per requested result, before filtering and re-ranking.
pub const CANDIDATE_OVERFETCH: usize = 5;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub request_timeout: Duration,
    /// Candidates below this similarity are dropped before scoring.
    pub similarity_floor: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            similarity_floor: 0.05,
        }
    }
}

#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("Recommendation timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Recommendation failed: {0}")]
    Internal(String),
}

pub struct RecommendationEngine {
    lifecycle: Arc<ModelLifecycleManager>,
    normalizer: Arc<SkillNormalizer>,
    config: EngineConfig,
}

impl RecommendationEngine {
    pub fn new(
        lifecycle: Arc<ModelLifecycleManager>,
        normalizer: Arc<SkillNormalizer>,
        config: EngineConfig,
    ) -> Self {
        Self {
            lifecycle,
            normalizer,
            config,
        }
    }

    /// Ranks postings for `input`, returning at most `top_n` (clamped to `[1, 20]`).
    ///
    /// "No results" is `Ok(vec![])`: blank input, nothing extracted, no model.
    /// The whole pipeline is bounded by the request timeout.
    pub async fn recommend(
        &self,
        input: &SkillInput,
        top_n: usize,
    ) -> Result<Vec<Recommendation>, RecommendError> {
        let top_n = top_n.clamp(1, MAX_TOP_N);
        if input.is_blank() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let deadline = self.config.request_timeout;
        let result = tokio::time::timeout(deadline, self.pipeline(input.clone(), top_n))
            .await
            .map_err(|_| {
                warn!(timeout_ms = deadline.as_millis() as u64, "Recommendation request timed out");
                RecommendError::Timeout(deadline)
            })??;

        info!(
            results = result.len(),
            top_n,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Recommendations computed"
        );
        Ok(result)
    }

    async fn pipeline(
        &self,
        input: SkillInput,
        top_n: usize,
    ) -> Result<Vec<Recommendation>, RecommendError> {
        let index = match self.lifecycle.ensure_fresh().await {
            Ok(index) => index,
            Err(e) => {
                warn!(error = %e, "No model available; returning no recommendations");
                return Ok(Vec::new());
            }
        };

        // If the deadline fires first, this closure still finishes on the
        // blocking pool and its result is dropped.
        let normalizer = Arc::clone(&self.normalizer);
        let floor = self.config.similarity_floor;
        tokio::task::spawn_blocking(move || {
            rank_candidates(&index, &normalizer, &input, top_n, floor)
        })
        .await
        .map_err(|e| RecommendError::Internal(e.to_string()))
    }
}

fn rank_candidates(
    index: &VacancyIndex,
    normalizer: &SkillNormalizer,
    input: &SkillInput,
    top_n: usize,
    similarity_floor: f64,
) -> Vec<Recommendation> {
    let skills = index.vocabulary().extract(normalizer, input);
    if skills.is_empty() {
        return Vec::new();
    }

    let k = (top_n * CANDIDATE_OVERFETCH).min(index.corpus_size());
    let candidates = index.query(&skills, k);
    let retrieved = candidates.len();

    let mut recommendations: Vec<Recommendation> = candidates
        .iter()
        .filter(|c| c.similarity_score >= similarity_floor)
        .filter_map(|c| score_candidate(&skills, c))
        .collect();
    rank(&mut recommendations);
    recommendations.truncate(top_n);

    debug!(
        generation = %index.generation(),
        skills = skills.len(),
        retrieved,
        kept = recommendations.len(),
        "Ranked candidates"
    );
    recommendations
}
