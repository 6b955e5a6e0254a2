//! HTTP surface
//!
//! - `POST /` - push webhook (202 accepted, 400 on undecodable body, 413 over the size limit)
//! - `GET /` - liveness
//! - `GET /status` - server info and active config snapshot
//! - `POST /reload` - reload config from disk

pub mod config;
pub mod stats;
pub mod webhook;

use axum::{Router, extract::DefaultBodyLimit, routing};

use crate::SharedState;

pub use config::reload_config_endpoint;
pub use stats::{root, status};
pub use webhook::handle_webhook;

/// Largest accepted webhook body. Push events for big merges run to a few hundred KiB.
pub const MAX_WEBHOOK_BODY_BYTES: usize = 4 * 1024 * 1024;

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", routing::get(root).post(handle_webhook))
        .route("/status", routing::get(status))
        .route("/reload", routing::post(reload_config_endpoint))
        .layer(DefaultBodyLimit::max(MAX_WEBHOOK_BODY_BYTES))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppState;
    use crate::store::ConfigStore;
    use crate::test_utils::{RecordingRunner, config_with, rule};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_state(runner: Arc<RecordingRunner>) -> SharedState {
        let config = config_with(vec![rule("demo", &["build", "deploy"])]);
        let store = Arc::new(ConfigStore::with_config("config.json", config));
        Arc::new(AppState::new(store, runner))
    }

    fn webhook_request(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .header("X-Gitlab-Event", "Push Hook")
            .body(body.into())
            .unwrap()
    }

    async fn wait_for_calls(runner: &RecordingRunner, count: usize) -> Vec<String> {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let calls = runner.calls();
                if calls.len() >= count {
                    return calls;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn root_returns_200() {
        let app = build_router(test_state(Arc::new(RecordingRunner::new())));

        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn push_is_accepted_and_commands_run() {
        let runner = Arc::new(RecordingRunner::new());
        let app = build_router(test_state(Arc::clone(&runner)));

        let body = serde_json::json!({
            "object_kind": "push",
            "ref": "refs/heads/main",
            "repository": { "name": "demo" }
        });
        let response = app
            .oneshot(webhook_request(serde_json::to_vec(&body).unwrap()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(wait_for_calls(&runner, 2).await, vec!["build", "deploy"]);
    }

    #[tokio::test]
    async fn accepted_delivery_finishes_before_shutdown_completes() {
        let runner = Arc::new(RecordingRunner::new());
        let state = test_state(Arc::clone(&runner));

        let response = build_router(Arc::clone(&state))
            .oneshot(webhook_request(r#"{"repository":{"name":"demo"}}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        assert!(state.wait_for_deliveries(Duration::from_secs(5)).await);
        assert_eq!(state.deliveries_in_flight(), 0);
        assert_eq!(runner.calls(), vec!["build", "deploy"]);
    }

    #[tokio::test]
    async fn oversized_body_returns_413_and_runs_nothing() {
        let runner = Arc::new(RecordingRunner::new());
        let state = test_state(Arc::clone(&runner));

        let padding = "x".repeat(MAX_WEBHOOK_BODY_BYTES);
        let body = format!(r#"{{"repository":{{"name":"demo"}},"padding":"{padding}"}}"#);
        let response = build_router(Arc::clone(&state))
            .oneshot(webhook_request(body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(state.wait_for_deliveries(Duration::from_secs(1)).await);
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn body_under_the_limit_is_accepted() {
        let runner = Arc::new(RecordingRunner::new());
        let app = build_router(test_state(Arc::clone(&runner)));

        // Larger than axum's 2 MB default.
        let padding = "x".repeat(3 * 1024 * 1024);
        let body = format!(r#"{{"repository":{{"name":"demo"}},"padding":"{padding}"}}"#);
        let response = app.oneshot(webhook_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(wait_for_calls(&runner, 2).await, vec!["build", "deploy"]);
    }

    #[tokio::test]
    async fn malformed_body_returns_400_and_runs_nothing() {
        let runner = Arc::new(RecordingRunner::new());
        let app = build_router(test_state(Arc::clone(&runner)));

        let response = app
            .oneshot(webhook_request("{\"repository\": {\"name\": "))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_repository_name_returns_400() {
        let runner = Arc::new(RecordingRunner::new());
        let app = build_router(test_state(Arc::clone(&runner)));

        let response = app
            .oneshot(webhook_request(r#"{"ref":"refs/heads/main"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_repository_is_still_accepted() {
        let runner = Arc::new(RecordingRunner::new());
        let app = build_router(test_state(Arc::clone(&runner)));

        let response = app
            .oneshot(webhook_request(r#"{"repository":{"name":"other"}}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn status_reports_active_snapshot() {
        let app = build_router(test_state(Arc::new(RecordingRunner::new())));

        let request = Request::builder().uri("/status").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["config"]["generation"], 1);
        assert_eq!(json["config"]["repositories"], serde_json::json!(["demo"]));
        assert_eq!(json["server"]["name"], "push_hook_runner");
        assert_eq!(json["server"]["deliveries_in_flight"], 0);
    }

    #[tokio::test]
    async fn reload_endpoint_swaps_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"Logfile":"x.log","Port":8080,"Repositories":[{"Name":"first","Commands":["a"]}]}"#,
        )
        .unwrap();
        let store = Arc::new(ConfigStore::load(&path).await.unwrap());
        let runner = Arc::new(RecordingRunner::new());
        let state = Arc::new(AppState::new(Arc::clone(&store), runner));

        std::fs::write(
            &path,
            r#"{"Logfile":"x.log","Port":8080,"Repositories":[{"Name":"second","Commands":["b"]}]}"#,
        )
        .unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/reload")
            .body(Body::empty())
            .unwrap();
        let response = build_router(Arc::clone(&state)).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["generation"], 2);
        assert_eq!(store.current().config.repository_names(), vec!["second"]);
    }

    #[tokio::test]
    async fn failed_reload_returns_500_and_keeps_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"Logfile":"x.log","Port":8080,"Repositories":[{"Name":"first","Commands":["a"]}]}"#,
        )
        .unwrap();
        let store = Arc::new(ConfigStore::load(&path).await.unwrap());
        let state = Arc::new(AppState::new(
            Arc::clone(&store),
            Arc::new(RecordingRunner::new()),
        ));

        std::fs::write(&path, "{").unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/reload")
            .body(Body::empty())
            .unwrap();
        let response = build_router(state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["status"], "error");
        assert_eq!(json["generation"], 1);
        assert_eq!(store.current().config.repository_names(), vec!["first"]);
    }
}
