use serde::{Deserialize, Serialize};

use crate::index::tfidf::SparseVector;

/// A neighbour found by [`CosineKnn::kneighbors`]: position in insertion order and its distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f64,
}

/// Brute-force nearest-neighbour search under cosine distance.
///
/// Vectors keep their insertion order, which is also the tie-break order for
/// equal distances.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CosineKnn {
    vectors: Vec<SparseVector>,
}

impl CosineKnn {
    pub fn new(vectors: Vec<SparseVector>) -> Self {
        Self { vectors }
    }

    /// Returns up to `k` neighbours by ascending distance.
    pub fn kneighbors(&self, query: &SparseVector, k: usize) -> Vec<Neighbor> {
        let mut neighbors: Vec<Neighbor> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(index, v)| Neighbor {
                index,
                distance: cosine_distance(query, v),
            })
            .collect();
        // sort_by is stable: equal distances stay in insertion order.
        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        neighbors.truncate(k);
        neighbors
    }
}

/// `1 − cos(a, b)`. A zero vector is at distance 1 from everything.
pub fn cosine_distance(a: &SparseVector, b: &SparseVector) -> f64 {
    let denom = a.norm() * b.norm();
    if denom == 0.0 {
        return 1.0;
    }
    1.0 - a.dot(b) / denom
}
