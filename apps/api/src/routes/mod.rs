pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::tailoring::handlers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/tailor", post(handlers::handle_tailor))
        .route("/api/v1/select", post(handlers::handle_select))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::tailoring::test_support::{test_settings, ScriptedLlm, RESUME_YAML, SCORES_JSON};

    fn app(llm: ScriptedLlm) -> Router {
        build_router(AppState {
            llm: Arc::new(llm),
            settings: test_settings(),
        })
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_reports_ok() {
        let response = app(ScriptedLlm::new())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_select_returns_items_skills_and_filtered_yaml() {
        let (status, body) = post_json(
            app(ScriptedLlm::new()),
            "/api/v1/select",
            json!({
                "resume_yaml": RESUME_YAML,
                "scores": SCORES_JSON,
                "options": {"min_items": 5},
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["metrics"]["items_selected"], 5);
        assert_eq!(body["metrics"]["total_scored"], 7);
        let skills: Vec<&str> = body["skills"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["name"].as_str().unwrap())
            .collect();
        assert_eq!(skills, vec!["Rust", "Python"]);

        let filtered: serde_yaml::Value =
            serde_yaml::from_str(body["filtered_yaml"].as_str().unwrap()).unwrap();
        assert_eq!(filtered["work"].as_sequence().unwrap().len(), 2);
        assert_eq!(filtered["basics"]["name"].as_str(), Some("Ada Lovelace"));
    }

    #[tokio::test]
    async fn test_select_accepts_inline_score_object() {
        let scores: Value = serde_json::from_str(SCORES_JSON).unwrap();
        let (status, body) = post_json(
            app(ScriptedLlm::new()),
            "/api/v1/select",
            json!({"resume_yaml": RESUME_YAML, "scores": scores, "top_skills": 1}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["skills"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_select_rejects_malformed_scores() {
        let (status, body) = post_json(
            app(ScriptedLlm::new()),
            "/api/v1/select",
            json!({"resume_yaml": RESUME_YAML, "scores": "not json at all"}),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "UNPROCESSABLE_ENTITY");
    }

    #[tokio::test]
    async fn test_select_rejects_non_mapping_resume() {
        let (status, body) = post_json(
            app(ScriptedLlm::new()),
            "/api/v1/select",
            json!({"resume_yaml": "- just\n- a list\n", "scores": SCORES_JSON}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_tailor_rejects_empty_job_description() {
        let (status, body) = post_json(
            app(ScriptedLlm::new()),
            "/api/v1/tailor",
            json!({"resume_yaml": RESUME_YAML, "job_description": "   "}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_tailor_falls_back_to_original_when_llm_is_down() {
        let (status, body) = post_json(
            app(ScriptedLlm::new()),
            "/api/v1/tailor",
            json!({"resume_yaml": RESUME_YAML, "job_description": "Senior Rust engineer"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["strategy"], "original");
        assert_eq!(body["tailored_yaml"], RESUME_YAML);
        assert_eq!(body["attempts"].as_array().unwrap().len(), 2);
    }
}
