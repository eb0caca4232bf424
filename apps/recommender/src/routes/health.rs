use axum::Json;
use serde_json::{json, Value};

/// GET /health
/// Liveness only; model and database state are under /api/v1/model/status.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "vacancy-recommender"
    }))
}
