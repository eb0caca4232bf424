// Vector-space index over postings: TF-IDF weighting plus cosine nearest-neighbour search.

pub mod knn;
pub mod tfidf;
pub mod vacancy_index;

pub use vacancy_index::{ScoredPosting, VacancyIndex};
