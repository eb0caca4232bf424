use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::lifecycle::manager::ModelLifecycleManager;

/// Periodically calls `ensure_fresh` so staleness is caught without waiting
/// for a request. The first tick fires immediately and warms the model.
///
/// Returns `None` when `every` is zero (refresh disabled).
pub fn spawn_refresh_loop(
    manager: Arc<ModelLifecycleManager>,
    every: Duration,
) -> Option<JoinHandle<()>> {
    if every.is_zero() {
        info!("Background model refresh disabled");
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(every_secs = every.as_secs(), "Background model refresh started");

        loop {
            ticker.tick().await;
            if let Err(e) = manager.ensure_fresh().await {
                warn!(error = %e, "Scheduled model refresh produced no model");
            }
        }
    }))
}
