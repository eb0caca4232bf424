//! Axum route handlers for the model administration API.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::datasource::circuit_breaker::CircuitSnapshot;
use crate::errors::AppError;
use crate::lifecycle::manager::ModelState;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ModelStatus {
    pub state: ModelState,
    pub generation: Option<Uuid>,
    pub trained_at: Option<DateTime<Utc>>,
    pub corpus_size: usize,
    pub vocabulary_size: usize,
    pub circuit: CircuitSnapshot,
}

#[derive(Debug, Serialize)]
pub struct RetrainResponse {
    /// False when training failed and the previous generation is still served.
    pub retrained: bool,
    #[serde(flatten)]
    pub status: ModelStatus,
}

async fn model_status(state: &AppState) -> ModelStatus {
    let current = state.lifecycle.current();
    ModelStatus {
        state: state.lifecycle.state().await,
        generation: current.as_ref().map(|m| m.generation()),
        trained_at: current.as_ref().map(|m| m.trained_at()),
        corpus_size: current.as_ref().map_or(0, |m| m.corpus_size()),
        vocabulary_size: current.as_ref().map_or(0, |m| m.vocabulary().len()),
        circuit: state.data_source.circuit_state().into(),
    }
}

/// GET /api/v1/model/status
pub async fn handle_model_status(State(state): State<AppState>) -> Json<ModelStatus> {
    Json(model_status(&state).await)
}

/// POST /api/v1/model/retrain
///
/// Forces a training pass. Falls back to the previous generation on failure;
/// 503 only when there is none.
pub async fn handle_model_retrain(
    State(state): State<AppState>,
) -> Result<Json<RetrainResponse>, AppError> {
    let before = state.lifecycle.current().map(|m| m.generation());
    let index = state
        .lifecycle
        .retrain()
        .await
        .map_err(|e| AppError::ModelUnavailable(e.to_string()))?;

    Ok(Json(RetrainResponse {
        retrained: before != Some(index.generation()),
        status: model_status(&state).await,
    }))
}
