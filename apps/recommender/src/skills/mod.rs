// Skill text handling: normalization into canonical tokens and the per-generation vocabulary.

pub mod normalizer;
pub mod vocabulary;

pub use normalizer::{SkillInput, SkillNormalizer};
pub use vocabulary::SkillVocabulary;
