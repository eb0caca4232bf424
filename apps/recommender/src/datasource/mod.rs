// Posting retrieval: the repository contract, its Postgres implementation,
// and the circuit-broken wrapper the lifecycle manager trains from.

pub mod circuit_breaker;
pub mod repository;
pub mod resilient;

pub use resilient::{DataSourceError, ResilientDataSource};
