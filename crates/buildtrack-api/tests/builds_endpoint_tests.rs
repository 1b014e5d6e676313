//! Integration tests for `src/routes/builds.rs`
//!
//! Routes tested:
//! - `POST /api/v1/builds`       — trigger a build
//! - `GET  /api/v1/builds`       — list recent builds
//! - `GET  /api/v1/builds/{id}`  — fetch one build

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use buildtrack_core::config::WebhookAuth;
use buildtrack_core::{BuildId, BuildStage, BuildStatus, Environment};
use buildtrack_db::BuildRepo;
use serde_json::json;

mod common;
use common::{
    CALLBACK_URL, FailingRepo, FrozenRepo, Outcome, ScriptedDispatcher, TestApp, get, post_json,
    router_over, send,
};

fn parse_id(value: &serde_json::Value) -> BuildId {
    value.as_str().unwrap().parse().unwrap()
}

// ============================================================================
// Trigger
// ============================================================================

#[tokio::test]
async fn test_trigger_without_ci_stays_queued() {
    let app = TestApp::unconfigured();

    let (status, body) = app
        .send(post_json(
            "/api/v1/builds",
            &json!({ "environment": "dev", "base_url": "https://x.example" }),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let id = parse_id(&body["build_id"]);

    let stored = app.repo.get(id).await.unwrap();
    assert_eq!(stored.status, BuildStatus::Queued);
    assert_eq!(stored.stage, BuildStage::Pending);
    assert_eq!(stored.progress, 0);
    assert_eq!(stored.environment, Environment::Dev);
    assert_eq!(stored.base_url, "https://x.example");
}

#[tokio::test]
async fn test_trigger_dispatches_and_marks_building() {
    let ci = ScriptedDispatcher::new(Outcome::Accept);
    let app = TestApp::new(Some(ci.clone()), WebhookAuth::Open);

    let (status, body) = app
        .send(post_json(
            "/api/v1/builds",
            &json!({ "environment": "prod", "base_url": "https://api.example.com" }),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Build triggered successfully");
    let id = parse_id(&body["build_id"]);

    let stored = app.repo.get(id).await.unwrap();
    assert_eq!(stored.status, BuildStatus::Building);
    assert_eq!(stored.stage, BuildStage::Pending);
    assert_eq!(stored.progress, 0);

    let requests = ci.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].build_id, id);
    assert_eq!(requests[0].environment, Environment::Prod);
    assert_eq!(requests[0].base_url, "https://api.example.com");
    assert_eq!(requests[0].callback_url, CALLBACK_URL);
}

#[tokio::test]
async fn test_trigger_dispatch_failure_reports_build_id() {
    for outcome in [Outcome::Reject, Outcome::Unreachable] {
        let ci = ScriptedDispatcher::new(outcome);
        let app = TestApp::new(Some(ci.clone()), WebhookAuth::Open);

        let (status, body) = app
            .send(post_json(
                "/api/v1/builds",
                &json!({ "environment": "qa", "base_url": "https://qa.example.com" }),
            ))
            .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());
        let id = parse_id(&body["build_id"]);

        let stored = app.repo.get(id).await.unwrap();
        assert_eq!(stored.status, BuildStatus::Failed);
        assert_eq!(stored.stage, BuildStage::Pending);
        assert_eq!(ci.calls(), 1);
    }
}

#[tokio::test]
async fn test_trigger_succeeds_when_building_patch_fails() {
    let repo = Arc::new(FrozenRepo::default());
    let ci = ScriptedDispatcher::new(Outcome::Accept);
    let router = router_over(repo.clone(), Some(ci.clone()), WebhookAuth::Open);

    let (status, body) = send(
        router,
        post_json(
            "/api/v1/builds",
            &json!({ "environment": "staging", "base_url": "https://s.example.com" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Build triggered successfully");
    let id = parse_id(&body["build_id"]);
    assert_eq!(repo.get(id).await.unwrap().status, BuildStatus::Queued);
    assert_eq!(ci.calls(), 1);
}

#[tokio::test]
async fn test_trigger_dispatch_failure_when_failed_patch_fails() {
    let repo = Arc::new(FrozenRepo::default());
    let ci = ScriptedDispatcher::new(Outcome::Unreachable);
    let router = router_over(repo.clone(), Some(ci.clone()), WebhookAuth::Open);

    let (status, body) = send(
        router,
        post_json(
            "/api/v1/builds",
            &json!({ "environment": "dev", "base_url": "https://d.example.com" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to connect to CI");
    let id = parse_id(&body["build_id"]);
    assert_eq!(repo.get(id).await.unwrap().status, BuildStatus::Queued);
    assert_eq!(repo.inner.len().await, 1);
}

#[tokio::test]
async fn test_trigger_rejects_invalid_input_without_side_effects() {
    let ci = ScriptedDispatcher::new(Outcome::Accept);
    let app = TestApp::new(Some(ci.clone()), WebhookAuth::Open);

    let bodies = [
        json!({ "base_url": "https://x.example" }),
        json!({ "environment": "dev" }),
        json!({ "environment": "", "base_url": "https://x.example" }),
        json!({ "environment": "production", "base_url": "https://x.example" }),
        json!({ "environment": "dev", "base_url": "not a url" }),
    ];
    for body in &bodies {
        let (status, response) = app.send(post_json("/api/v1/builds", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);
        assert!(response["error"].is_string());
    }

    let request = Request::builder()
        .uri("/api/v1/builds")
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(app.repo.is_empty().await);
    assert_eq!(ci.calls(), 0);
}

#[tokio::test]
async fn test_trigger_store_failure_is_500_without_id() {
    let ci = ScriptedDispatcher::new(Outcome::Accept);
    let router = router_over(Arc::new(FailingRepo::default()), Some(ci.clone()), WebhookAuth::Open);

    let (status, body) = send(
        router,
        post_json(
            "/api/v1/builds",
            &json!({ "environment": "dev", "base_url": "https://x.example" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.get("build_id").is_none());
    assert_eq!(ci.calls(), 0);
}

#[tokio::test]
async fn test_trigger_publishes_insert() {
    let app = TestApp::unconfigured();
    let mut rx = app.repo.changes().subscribe();

    let (_, body) = app
        .send(post_json(
            "/api/v1/builds",
            &json!({ "environment": "dev", "base_url": "https://x.example" }),
        ))
        .await;
    let id = parse_id(&body["build_id"]);

    let change = rx.recv().await.unwrap();
    assert_eq!(change.build_id(), id);
}

// ============================================================================
// Read API
// ============================================================================

#[tokio::test]
async fn test_list_newest_first_with_limit() {
    let app = TestApp::unconfigured();
    let first = app.seed().await;
    let second = app.seed().await;
    let third = app.seed().await;

    let (status, body) = app.send(get("/api/v1/builds")).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<BuildId> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|b| parse_id(&b["id"]))
        .collect();
    assert_eq!(ids, vec![third.id, second.id, first.id]);

    let (_, body) = app.send(get("/api/v1/builds?limit=2")).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    // Clamped to at least one.
    let (_, body) = app.send(get("/api/v1/builds?limit=0")).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_get_build() {
    let app = TestApp::unconfigured();
    let build = app.seed().await;

    let (status, body) = app.send(get(&format!("/api/v1/builds/{}", build.id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_id(&body["id"]), build.id);
    assert_eq!(body["environment"], "staging");
    assert_eq!(body["status"], "queued");
    assert_eq!(body["stage"], "pending");
    assert_eq!(body["progress"], 0);
    assert!(body["artifact_url"].is_null());

    let (status, _) = app
        .send(get(&format!("/api/v1/builds/{}", BuildId::new())))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send(get("/api/v1/builds/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
