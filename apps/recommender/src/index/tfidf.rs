//! TF-IDF term weighting over whitespace-tokenized skill documents.
//!
//! - n-grams for n in `NGRAM_RANGE`, joined with a single space
//! - smooth idf: `ln((1 + n_docs) / (1 + df)) + 1`
//! - raw term counts × idf, then L2-normalized
//!
//! Vocabulary indices are assigned in sorted term order so that two fits over
//! the same corpus produce identical models.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

pub const NGRAM_RANGE: (usize, usize) = (1, 3);

/// Sparse vector as sorted `(term_index, weight)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    /// Builds a vector from index → weight pairs, dropping zero weights.
    pub fn from_weights(weights: BTreeMap<usize, f64>) -> Self {
        Self {
            entries: weights.into_iter().filter(|(_, w)| *w != 0.0).collect(),
        }
    }

    pub fn norm(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt()
    }

    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (a_idx, a_w) = self.entries[i];
            let (b_idx, b_w) = other.entries[j];
            match a_idx.cmp(&b_idx) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += a_w * b_w;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    fn normalized(mut self) -> Self {
        let norm = self.norm();
        if norm > 0.0 {
            for (_, w) in &mut self.entries {
                *w /= norm;
            }
        }
        self
    }
}

/// Fitted term-weighting model. Immutable once fitted; queries never refit it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TfidfModel {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
    n_documents: usize,
}

impl TfidfModel {
    /// Learns vocabulary and idf weights from the given documents.
    /// An empty corpus yields an empty model that maps everything to the zero vector.
    pub fn fit<S: AsRef<str>>(documents: &[S]) -> Self {
        let n_docs = documents.len();
        let mut doc_freq: BTreeMap<String, usize> = BTreeMap::new();

        for doc in documents {
            let tokens: Vec<&str> = doc.as_ref().split_whitespace().collect();
            let unique: BTreeSet<String> = ngrams(&tokens).into_iter().collect();
            for term in unique {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(doc_freq.len());
        for (idx, (term, df)) in doc_freq.into_iter().enumerate() {
            idf.push(((1.0 + n_docs as f64) / (1.0 + df as f64)).ln() + 1.0);
            vocabulary.insert(term, idx);
        }

        Self {
            vocabulary,
            idf,
            n_documents: n_docs,
        }
    }

    /// Maps a document into the fitted space. Unknown n-grams contribute nothing.
    pub fn transform(&self, document: &str) -> SparseVector {
        let tokens: Vec<&str> = document.split_whitespace().collect();
        let mut weights: BTreeMap<usize, f64> = BTreeMap::new();
        for term in ngrams(&tokens) {
            if let Some(&idx) = self.vocabulary.get(&term) {
                *weights.entry(idx).or_insert(0.0) += 1.0;
            }
        }
        for (idx, weight) in weights.iter_mut() {
            *weight *= self.idf[*idx];
        }
        SparseVector::from_weights(weights).normalized()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }
}

#[cfg(test)]
impl SparseVector {
    fn is_zero(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
impl TfidfModel {
    fn n_documents(&self) -> usize {
        self.n_documents
    }

    fn idf(&self, term: &str) -> Option<f64> {
        self.vocabulary.get(term).map(|&idx| self.idf[idx])
    }
}

fn ngrams(tokens: &[&str]) -> Vec<String> {
    let mut terms = Vec::new();
    for n in NGRAM_RANGE.0..=NGRAM_RANGE.1 {
        for window in tokens.windows(n) {
            terms.push(window.join(" "));
        }
    }
    terms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ngrams_unigram_to_trigram() {
        let terms = ngrams(&["a", "b", "c"]);
        assert_eq!(terms, vec!["a", "b", "c", "a b", "b c", "a b c"]);
    }

    #[test]
    fn test_idf_rare_terms_weigh_more() {
        let model = TfidfModel::fit(&["python sql", "python go", "python rust"]);
        let common = model.idf("python").unwrap();
        let rare = model.idf("rust").unwrap();
        assert!((common - 1.0).abs() < 1e-12, "idf of a term in every doc is 1");
        assert!(rare > common);
    }

    #[test]
    fn test_transform_is_unit_length() {
        let model = TfidfModel::fit(&["html css javascript", "python django"]);
        let v = model.transform("css html");
        assert!((v.norm() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_vocabulary_is_zero() {
        let model = TfidfModel::fit(&["html css"]);
        assert!(model.transform("cobol fortran").is_zero());
        assert_eq!(model.vocabulary_size(), 3);
    }

    #[test]
    fn test_empty_corpus_model() {
        let model = TfidfModel::fit::<&str>(&[]);
        assert_eq!(model.vocabulary_size(), 0);
        assert_eq!(model.n_documents(), 0);
        assert!(model.transform("anything").is_zero());
    }

    #[test]
    fn test_dot_of_sparse_vectors() {
        let a = SparseVector::from_weights(BTreeMap::from([(0, 1.0), (2, 2.0)]));
        let b = SparseVector::from_weights(BTreeMap::from([(1, 5.0), (2, 3.0)]));
        assert!((a.dot(&b) - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let docs = ["sql python", "go rust", "python go"];
        assert_eq!(TfidfModel::fit(&docs), TfidfModel::fit(&docs));
    }
}
