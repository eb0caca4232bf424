// Trained-model lifecycle: staleness, (re)training, persistence and background refresh.

pub mod handlers;
pub mod manager;
pub mod persistence;
pub mod scheduler;

pub use manager::{LifecycleConfig, ModelLifecycleManager};
pub use persistence::ModelStore;
