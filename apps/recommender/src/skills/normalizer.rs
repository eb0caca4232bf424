//! Skill Normalizer: turns raw skill text (or a list of skills) into canonical skill tokens.
//!
//! Pipeline:
//! 1. Coerce the input into one text (list items become comma-separated segments)
//! 2. Lowercase, replace characters outside `[a-z а-я 0-9 # +]` with spaces, collapse whitespace
//! 3. Split on commas; inside each segment pull out compound terms longest-first
//! 4. Split the remainder on whitespace
//! 5. Deduplicate, keeping first-seen order

use std::borrow::Cow;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Inputs longer than this are rejected instead of normalized.
pub const MAX_INPUT_CHARS: usize = 10_000;

/// Multi-word skills recognised as a single token when they appear verbatim.
/// Written in already-normalized form (`node.js` → `node js`, `ci/cd` → `ci cd`).
const DEFAULT_COMPOUND_TERMS: &[&str] = &[
    "machine learning",
    "deep learning",
    "data science",
    "data analysis",
    "data engineering",
    "computer vision",
    "natural language processing",
    "big data",
    "ci cd",
    "rest api",
    "restful api",
    "spring boot",
    "spring framework",
    "react native",
    "node js",
    "vue js",
    "next js",
    "asp net",
    "asp net core",
    "net core",
    "ruby on rails",
    "objective c",
    "sql server",
    "ms sql",
    "ms office",
    "power bi",
    "google cloud",
    "amazon web services",
    "unit testing",
    "manual testing",
    "automated testing",
    "load testing",
    "project management",
    "product management",
    "business analysis",
    "system administration",
    "information security",
    "technical support",
    "ui ux",
    "web design",
    "graphic design",
    "1с предприятие",
    "управление проектами",
    "работа с клиентами",
    "деловая переписка",
    "английский язык",
    "анализ данных",
];

/// Raw skill input as it arrives from callers: free text or a list of skills.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SkillInput {
    Text(String),
    List(Vec<String>),
}

impl SkillInput {
    /// True when the input carries no non-whitespace characters at all.
    pub fn is_blank(&self) -> bool {
        match self {
            SkillInput::Text(text) => text.trim().is_empty(),
            SkillInput::List(items) => items.iter().all(|item| item.trim().is_empty()),
        }
    }

    fn coerce(&self) -> Cow<'_, str> {
        match self {
            SkillInput::Text(text) => Cow::Borrowed(text.as_str()),
            // Separate list items must never fuse into a compound term.
            SkillInput::List(items) => Cow::Owned(items.join(", ")),
        }
    }
}

impl From<&str> for SkillInput {
    fn from(text: &str) -> Self {
        SkillInput::Text(text.to_string())
    }
}

impl From<Vec<String>> for SkillInput {
    fn from(items: Vec<String>) -> Self {
        SkillInput::List(items)
    }
}

#[derive(Debug, Error)]
pub enum NormalizationError {
    #[error("Skill input is too long: {len} characters (max {max})")]
    InputTooLong { len: usize, max: usize },
}

/// Ordered set of multi-word technical terms, longest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundTermTable {
    terms: Vec<String>,
}

impl CompoundTermTable {
    /// Builds a table from arbitrary terms. Each term is cleaned with the same
    /// charset rules as skill text; single-word and empty terms are dropped.
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut terms: Vec<String> = terms
            .into_iter()
            .map(|t| clean_text(t.as_ref()).replace(',', " "))
            .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|t| t.contains(' '))
            .filter(|t| seen.insert(t.clone()))
            .collect();

        terms.sort_by(|a, b| {
            b.chars()
                .count()
                .cmp(&a.chars().count())
                .then_with(|| a.cmp(b))
        });

        Self { terms }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

}

impl Default for CompoundTermTable {
    fn default() -> Self {
        Self::new(DEFAULT_COMPOUND_TERMS.iter().copied())
    }
}

/// Deterministic text → canonical skill token pipeline.
#[derive(Debug, Clone)]
pub struct SkillNormalizer {
    compounds: CompoundTermTable,
}

impl Default for SkillNormalizer {
    fn default() -> Self {
        Self::new(CompoundTermTable::default())
    }
}

impl SkillNormalizer {
    pub fn new(compounds: CompoundTermTable) -> Self {
        Self { compounds }
    }

    pub fn compounds(&self) -> &CompoundTermTable {
        &self.compounds
    }

    /// Normalizes raw input into canonical tokens: duplicates removed,
    /// first-occurrence order preserved. Blank input yields an empty vector.
    pub fn normalize(&self, input: &SkillInput) -> Result<Vec<String>, NormalizationError> {
        self.normalize_text(&input.coerce())
    }

    /// Request-side entry point: rejects text over [`MAX_INPUT_CHARS`].
    pub fn normalize_text(&self, text: &str) -> Result<Vec<String>, NormalizationError> {
        let len = text.chars().count();
        if len > MAX_INPUT_CHARS {
            return Err(NormalizationError::InputTooLong {
                len,
                max: MAX_INPUT_CHARS,
            });
        }
        Ok(self.tokenize(text))
    }

    /// Same pipeline without the length cap. Corpus text comes from the
    /// database and a long skill list is still a valid posting.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let cleaned = clean_text(text);
        let mut tokens = Vec::new();
        if cleaned.contains(',') {
            for segment in cleaned.split(',') {
                self.split_segment(segment, &mut tokens);
            }
        } else {
            self.split_segment(&cleaned, &mut tokens);
        }

        let mut seen = HashSet::new();
        tokens.retain(|t| seen.insert(t.clone()));
        tokens
    }

    fn split_segment(&self, segment: &str, tokens: &mut Vec<String>) {
        let mut rest = segment.to_string();
        for term in self.compounds.terms() {
            if rest.contains(term.as_str()) {
                tokens.push(term.clone());
                rest = rest.replace(term.as_str(), " ");
            }
        }
        tokens.extend(rest.split_whitespace().map(str::to_string));
    }
}

fn is_skill_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || ('а'..='я').contains(&c) || c == '#' || c == '+'
}

/// Lowercases and charset-filters text, keeping commas as segment separators.
fn clean_text(text: &str) -> String {
    let filtered: String = text
        .to_lowercase()
        .chars()
        .map(|c| if is_skill_char(c) || c == ',' { c } else { ' ' })
        .collect();
    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}
