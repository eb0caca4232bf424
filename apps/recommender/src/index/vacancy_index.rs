use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::index::knn::CosineKnn;
use crate::index::tfidf::TfidfModel;
use crate::models::posting::Posting;
use crate::skills::{SkillNormalizer, SkillVocabulary};

/// A retrieved posting with its similarity to the query.
#[derive(Debug, Clone, Copy)]
pub struct ScoredPosting<'a> {
    pub posting: &'a Posting,
    pub similarity_score: f64,
}

/// One immutable generation of the vector-space index over postings.
///
/// Built once by the lifecycle manager, then shared read-only behind an `Arc`.
/// Nothing here is mutated after `build` returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VacancyIndex {
    generation: Uuid,
    trained_at: DateTime<Utc>,
    configured_k: usize,
    /// Compound table the postings were normalized with; a mismatch on load
    /// means the stored skill sets are out of date.
    compound_terms: Vec<String>,
    model: TfidfModel,
    knn: CosineKnn,
    postings: Vec<Posting>,
    vocabulary: SkillVocabulary,
}

impl VacancyIndex {
    pub fn build(postings: Vec<Posting>, configured_k: usize, normalizer: &SkillNormalizer) -> Self {
        let documents: Vec<String> = postings.iter().map(|p| pseudo_document(p.skills())).collect();
        let model = TfidfModel::fit(&documents);
        let knn = CosineKnn::new(documents.iter().map(|d| model.transform(d)).collect());
        let vocabulary = SkillVocabulary::from_postings(&postings);

        Self {
            generation: Uuid::new_v4(),
            trained_at: Utc::now(),
            configured_k,
            compound_terms: normalizer.compounds().terms().to_vec(),
            model,
            knn,
            postings,
            vocabulary,
        }
    }

    /// Nearest postings to `skills`, up to `min(k, effective_k)`, by descending similarity.
    /// Ties keep corpus order.
    pub fn query(&self, skills: &BTreeSet<String>, k: usize) -> Vec<ScoredPosting<'_>> {
        let k = k.min(self.effective_k());
        if k == 0 || skills.is_empty() {
            return Vec::new();
        }

        let vector = self.model.transform(&pseudo_document(skills));
        self.knn
            .kneighbors(&vector, k)
            .into_iter()
            .map(|n| ScoredPosting {
                posting: &self.postings[n.index],
                similarity_score: similarity_from_distance(n.distance),
            })
            .collect()
    }

    pub fn effective_k(&self) -> usize {
        self.configured_k.min(self.postings.len())
    }

    pub fn corpus_size(&self) -> usize {
        self.postings.len()
    }

    pub fn generation(&self) -> Uuid {
        self.generation
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    pub fn vocabulary(&self) -> &SkillVocabulary {
        &self.vocabulary
    }

    pub fn model(&self) -> &TfidfModel {
        &self.model
    }

    /// True when this generation's postings were normalized with the same
    /// compound table as `normalizer` uses now.
    pub fn is_compatible_with(&self, normalizer: &SkillNormalizer) -> bool {
        self.compound_terms == normalizer.compounds().terms()
    }
}

/// Skills joined into the whitespace-separated text the term model is fitted on.
fn pseudo_document(skills: &BTreeSet<String>) -> String {
    skills.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
}

/// `max(0, 1 − d)` rounded to 4 decimal digits.
pub fn similarity_from_distance(distance: f64) -> f64 {
    let similarity = (1.0 - distance).clamp(0.0, 1.0);
    (similarity * 10_000.0).round() / 10_000.0
}
