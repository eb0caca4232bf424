use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::skills::SkillNormalizer;

/// One vacancy row as read from the repository: its id and the concatenated
/// names of every skill it requires.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct VacancyRecord {
    pub id: i64,
    pub skills_text: String,
}

/// A posting with its canonical skill set.
///
/// `skills` is always derived from `raw_skill_text` by the normalizer; there is
/// no way to set it directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    id: i64,
    raw_skill_text: String,
    skills: BTreeSet<String>,
}

impl Posting {
    pub fn from_raw(id: i64, raw_skill_text: String, normalizer: &SkillNormalizer) -> Self {
        let skills = normalizer.tokenize(&raw_skill_text).into_iter().collect();
        Self {
            id,
            raw_skill_text,
            skills,
        }
    }

    pub fn from_record(record: VacancyRecord, normalizer: &SkillNormalizer) -> Self {
        Self::from_raw(record.id, record.skills_text, normalizer)
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    #[cfg(test)]
    pub fn raw_skill_text(&self) -> &str {
        &self.raw_skill_text
    }

    pub fn skills(&self) -> &BTreeSet<String> {
        &self.skills
    }
}
