//! Skill-overlap scoring of retrieved postings against a student's skills.
//!
//! Retrieval ranks by vector similarity; this module turns each candidate into
//! a [`Recommendation`] with explicit matching/missing skills and re-ranks by
//! coverage first, similarity second.

use std::collections::BTreeSet;

use crate::index::ScoredPosting;
use crate::models::recommendation::Recommendation;

pub const DEFAULT_TOP_N: usize = 5;
pub const MAX_TOP_N: usize = 20;

/// Input skills shorter than this never match by substring.
const SUBSTRING_MIN_CHARS: usize = 4;

// ────────────────────────────────────────────────────────────────────────────
// Skill overlap
// ────────────────────────────────────────────────────────────────────────────

/// A required skill is covered when the student lists it exactly, or when one
/// of the student's longer skills appears inside it ("react" covers "react native").
pub fn covers(student: &BTreeSet<String>, required: &str) -> bool {
    student.contains(required)
        || student
            .iter()
            .any(|s| s.chars().count() >= SUBSTRING_MIN_CHARS && required.contains(s.as_str()))
}

/// Splits `required` into (matching, missing), both in sorted order.
pub fn skill_overlap(
    student: &BTreeSet<String>,
    required: &BTreeSet<String>,
) -> (Vec<String>, Vec<String>) {
    required
        .iter()
        .cloned()
        .partition(|skill| covers(student, skill))
}

/// `round(matched / total × 100)`, 0 when nothing is required.
pub fn match_percentage(matched: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((matched as f64 / total as f64) * 100.0).round().min(100.0) as u32
}

// ────────────────────────────────────────────────────────────────────────────
// Candidates
// ────────────────────────────────────────────────────────────────────────────

/// Builds the recommendation for one candidate. `None` for postings with no
/// required skills, and for postings none of whose skills the student covers:
/// vector similarity alone (e.g. "sql" against "ms sql") is not a match.
pub fn score_candidate(
    student: &BTreeSet<String>,
    candidate: &ScoredPosting<'_>,
) -> Option<Recommendation> {
    let required = candidate.posting.skills();
    if required.is_empty() {
        return None;
    }

    let (matching_skills, missing_skills) = skill_overlap(student, required);
    let matched_count = matching_skills.len();
    if matched_count == 0 {
        return None;
    }
    Some(Recommendation {
        posting_id: candidate.posting.id(),
        similarity_score: candidate.similarity_score,
        match_percentage: match_percentage(matched_count, required.len()),
        matching_skills,
        missing_skills,
        total_required: required.len(),
        matched_count,
    })
}

/// Stable sort by `(match_percentage, similarity_score)`, both descending.
pub fn rank(recommendations: &mut [Recommendation]) {
    recommendations.sort_by(|a, b| {
        b.match_percentage
            .cmp(&a.match_percentage)
            .then_with(|| b.similarity_score.total_cmp(&a.similarity_score))
    });
}

/// Clamps a caller-supplied count into `[1, MAX_TOP_N]`.
pub fn clamp_top_n(requested: i64) -> usize {
    requested.clamp(1, MAX_TOP_N as i64) as usize
}
