// Request-time pipeline: retrieve candidates from the current generation,
// score skill overlap, re-rank, all under a per-request deadline.

pub mod engine;
pub mod handlers;
pub mod scoring;

pub use engine::{EngineConfig, RecommendError, RecommendationEngine};
