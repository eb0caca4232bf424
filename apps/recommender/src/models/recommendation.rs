use serde::{Deserialize, Serialize};

/// A single ranked posting returned to callers.
///
/// Field names on the wire follow the backend's recommendation contract
/// (`vacancy_id`, `skills_matched`, `total_skills_required`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "vacancy_id")]
    pub posting_id: i64,
    /// 1 − cosine distance, in [0, 1], rounded to 4 decimals.
    pub similarity_score: f64,
    /// round(matched_count / total_required × 100), 0 when nothing is required.
    pub match_percentage: u32,
    pub matching_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    #[serde(rename = "total_skills_required")]
    pub total_required: usize,
    #[serde(rename = "skills_matched")]
    pub matched_count: usize,
}
