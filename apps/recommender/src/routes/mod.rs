pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::lifecycle::handlers as model;
use crate::recommendation::handlers as recommend;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/recommend", post(recommend::handle_recommend))
        // Model administration
        .route("/api/v1/model/status", get(model::handle_model_status))
        .route("/api/v1/model/retrain", post(model::handle_model_retrain))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::datasource::repository::fake::FakeRepository;
    use crate::state::test_support::state_with;

    async fn send(router: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn repo() -> Arc<FakeRepository> {
        Arc::new(FakeRepository::new(&[
            (10, "HTML, CSS, JavaScript"),
            (11, "Python, SQL"),
        ]))
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let router = build_router(state_with(repo(), dir.path()));
        let (status, body) = send(router, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "vacancy-recommender");
    }

    #[tokio::test]
    async fn test_recommend_returns_ranked_vacancies() {
        let dir = tempfile::tempdir().unwrap();
        let router = build_router(state_with(repo(), dir.path()));
        let (status, body) = send(
            router,
            "POST",
            "/recommend",
            Some(json!({"student_skills": "html, css", "top_n": 3})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let first = &body["recommendations"][0];
        assert_eq!(first["vacancy_id"], 10);
        assert_eq!(first["match_percentage"], 67);
        assert_eq!(first["skills_matched"], 2);
        assert_eq!(first["total_skills_required"], 3);
    }

    #[tokio::test]
    async fn test_recommend_accepts_skill_list() {
        let dir = tempfile::tempdir().unwrap();
        let router = build_router(state_with(repo(), dir.path()));
        let (status, body) = send(
            router,
            "POST",
            "/recommend",
            Some(json!({"student_skills": ["Python", "SQL"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recommendations"][0]["vacancy_id"], 11);
        assert_eq!(body["recommendations"][0]["match_percentage"], 100);
    }

    #[tokio::test]
    async fn test_recommend_rejects_blank_or_missing_skills() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(repo(), dir.path());
        for payload in [
            json!({}),
            json!({"student_skills": "   "}),
            json!({"student_skills": ["", " "]}),
        ] {
            let (status, body) =
                send(build_router(state.clone()), "POST", "/recommend", Some(payload)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn test_model_status_and_retrain() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(repo(), dir.path());

        let (status, body) = send(build_router(state.clone()), "GET", "/api/v1/model/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "stale");
        assert_eq!(body["generation"], Value::Null);
        assert_eq!(body["circuit"]["mode"], "closed");

        let (status, body) = send(build_router(state.clone()), "POST", "/api/v1/model/retrain", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["retrained"], true);
        assert_eq!(body["state"], "fresh");
        assert_eq!(body["corpus_size"], 2);
    }

    #[tokio::test]
    async fn test_retrain_without_any_model_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo();
        repo.set_failing(true);
        let router = build_router(state_with(repo, dir.path()));

        let (status, body) = send(router, "POST", "/api/v1/model/retrain", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "MODEL_UNAVAILABLE");
    }
}
