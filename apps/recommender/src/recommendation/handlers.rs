use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::recommendation::Recommendation;
use crate::recommendation::scoring::{clamp_top_n, DEFAULT_TOP_N};
use crate::skills::SkillInput;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub student_skills: Option<SkillInput>,
    pub top_n: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub recommendations: Vec<Recommendation>,
}

/// POST /recommend
///
/// Ranks vacancies for a student's skills, given as free text or a list.
pub async fn handle_recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendRequest>,
) -> Result<Json<RecommendResponse>, AppError> {
    let skills = match request.student_skills {
        Some(skills) if !skills.is_blank() => skills,
        _ => {
            return Err(AppError::Validation(
                "student_skills cannot be empty".to_string(),
            ))
        }
    };
    let top_n = request.top_n.map_or(DEFAULT_TOP_N, clamp_top_n);

    let recommendations = state.engine.recommend(&skills, top_n).await?;
    Ok(Json(RecommendResponse { recommendations }))
}
