use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::posting::Posting;
use crate::skills::normalizer::{SkillInput, SkillNormalizer};

/// How an extracted token relates to the skills seen in the current corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A standalone skill some posting requires.
    Known,
    /// Not a skill on its own, but a word of a known multi-word skill.
    CompoundFragment,
    Unknown,
}

/// Union of all skills across the corpus of one index generation.
/// Rebuilt from scratch on every retrain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillVocabulary {
    skills: BTreeSet<String>,
    compound_words: BTreeSet<String>,
}

impl SkillVocabulary {
    pub fn from_postings(postings: &[Posting]) -> Self {
        Self::from_skills(postings.iter().flat_map(|p| p.skills().iter().cloned()))
    }

    pub fn from_skills<I>(skills: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let skills: BTreeSet<String> = skills.into_iter().collect();
        let compound_words = skills
            .iter()
            .filter(|s| s.contains(' '))
            .flat_map(|s| s.split_whitespace().map(str::to_string))
            .collect();
        Self {
            skills,
            compound_words,
        }
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.skills.contains(token)
    }

    pub fn classify(&self, token: &str) -> TokenKind {
        if self.contains(token) {
            TokenKind::Known
        } else if !token.contains(' ') && self.compound_words.contains(token) {
            TokenKind::CompoundFragment
        } else {
            TokenKind::Unknown
        }
    }

    /// Extracts the skill set of a request.
    ///
    /// Every normalized token is kept as-is: fragments of known compound skills
    /// are not merged into the compound, and unknown tokens are not dropped.
    /// A normalization failure degrades to an empty set.
    pub fn extract(&self, normalizer: &SkillNormalizer, input: &SkillInput) -> BTreeSet<String> {
        let tokens = match normalizer.normalize(input) {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(error = %e, "Skill normalization failed; treating input as empty");
                return BTreeSet::new();
            }
        };

        if self.is_empty() {
            debug!(total = tokens.len(), "Empty skill vocabulary; tokens kept unclassified");
            return tokens.into_iter().collect();
        }

        let mut fragments = Vec::new();
        let mut unknown = Vec::new();
        for token in &tokens {
            match self.classify(token) {
                TokenKind::Known => {}
                TokenKind::CompoundFragment => fragments.push(token.as_str()),
                TokenKind::Unknown => unknown.push(token.as_str()),
            }
        }
        if !fragments.is_empty() || !unknown.is_empty() {
            debug!(
                ?fragments,
                ?unknown,
                total = tokens.len(),
                "Extracted skills not known as standalone skills"
            );
        }

        tokens.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::normalizer::MAX_INPUT_CHARS;

    fn vocabulary() -> SkillVocabulary {
        SkillVocabulary::from_skills(
            ["machine learning", "python", "sql"].map(str::to_string),
        )
    }

    #[test]
    fn test_classify_known_skill() {
        assert_eq!(vocabulary().classify("python"), TokenKind::Known);
        assert_eq!(vocabulary().classify("machine learning"), TokenKind::Known);
    }

    #[test]
    fn test_classify_compound_fragment() {
        assert_eq!(vocabulary().classify("learning"), TokenKind::CompoundFragment);
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(vocabulary().classify("haskell"), TokenKind::Unknown);
    }

    #[test]
    fn test_extract_keeps_fragments_unmerged() {
        let normalizer = SkillNormalizer::default();
        let skills = vocabulary().extract(&normalizer, &SkillInput::from("learning, python, rust"));
        let expected: BTreeSet<String> = ["learning", "python", "rust"].map(str::to_string).into();
        assert_eq!(skills, expected);
    }

    #[test]
    fn test_extract_degrades_to_empty_on_failure() {
        let normalizer = SkillNormalizer::default();
        let input = SkillInput::Text("x".repeat(MAX_INPUT_CHARS + 1));
        assert!(vocabulary().extract(&normalizer, &input).is_empty());
    }

    #[test]
    fn test_empty_vocabulary_still_extracts() {
        let normalizer = SkillNormalizer::default();
        let skills = SkillVocabulary::default().extract(&normalizer, &SkillInput::from("go"));
        assert_eq!(skills.len(), 1);
    }
}
