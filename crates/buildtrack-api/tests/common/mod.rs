//! Test helpers for driving the API router in-process.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use buildtrack_api::services::{BuildDispatcher, StatusReceiver};
use buildtrack_api::{AppState, routes};
use buildtrack_core::build::BuildPatch;
use buildtrack_core::config::WebhookAuth;
use buildtrack_core::dispatch::{CiDispatcher, DispatchError, DispatchRequest};
use buildtrack_core::{Build, BuildId, BuildStatus, Environment};
use buildtrack_db::{BuildRepo, ChangeFeed, DbError, DbResult, MemoryBuildRepo};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::util::ServiceExt;

pub const CALLBACK_URL: &str = "https://builds.example.com/webhooks/build-status";
pub const SECRET: &str = "s3cret";

/// How the scripted CI target answers.
#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    Accept,
    Reject,
    Unreachable,
}

/// CI target that records requests and answers with a fixed outcome.
pub struct ScriptedDispatcher {
    outcome: Outcome,
    pub requests: Mutex<Vec<DispatchRequest>>,
}

impl ScriptedDispatcher {
    pub fn new(outcome: Outcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl CiDispatcher for ScriptedDispatcher {
    fn name(&self) -> String {
        "scripted".to_string()
    }

    async fn dispatch(&self, request: &DispatchRequest) -> Result<(), DispatchError> {
        self.requests.lock().unwrap().push(request.clone());
        match self.outcome {
            Outcome::Accept => Ok(()),
            Outcome::Reject => Err(DispatchError::Rejected {
                status: 422,
                body: "Unprocessable Entity".to_string(),
            }),
            Outcome::Unreachable => Err(DispatchError::Unreachable(
                "connection refused".to_string(),
            )),
        }
    }
}

/// Store whose every operation fails.
#[derive(Default)]
pub struct FailingRepo {
    feed: ChangeFeed,
}

fn unavailable() -> DbError {
    DbError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl BuildRepo for FailingRepo {
    async fn create(&self, _environment: Environment, _base_url: &str) -> DbResult<Build> {
        Err(unavailable())
    }

    async fn get(&self, _id: BuildId) -> DbResult<Build> {
        Err(unavailable())
    }

    async fn list_recent(&self, _limit: i64) -> DbResult<Vec<Build>> {
        Err(unavailable())
    }

    async fn update(
        &self,
        _id: BuildId,
        _patch: &BuildPatch,
        _expected_status: Option<BuildStatus>,
    ) -> DbResult<Build> {
        Err(unavailable())
    }

    async fn ping(&self) -> DbResult<()> {
        Err(unavailable())
    }

    fn changes(&self) -> &ChangeFeed {
        &self.feed
    }
}

/// In-memory store that records builds but refuses every update.
#[derive(Default)]
pub struct FrozenRepo {
    pub inner: MemoryBuildRepo,
}

#[async_trait]
impl BuildRepo for FrozenRepo {
    async fn create(&self, environment: Environment, base_url: &str) -> DbResult<Build> {
        self.inner.create(environment, base_url).await
    }

    async fn get(&self, id: BuildId) -> DbResult<Build> {
        self.inner.get(id).await
    }

    async fn list_recent(&self, limit: i64) -> DbResult<Vec<Build>> {
        self.inner.list_recent(limit).await
    }

    async fn update(
        &self,
        _id: BuildId,
        _patch: &BuildPatch,
        _expected_status: Option<BuildStatus>,
    ) -> DbResult<Build> {
        Err(unavailable())
    }

    async fn ping(&self) -> DbResult<()> {
        Ok(())
    }

    fn changes(&self) -> &ChangeFeed {
        self.inner.changes()
    }
}

/// A router over an in-memory store.
pub struct TestApp {
    pub repo: Arc<MemoryBuildRepo>,
    pub router: Router,
}

impl TestApp {
    pub fn new(ci: Option<Arc<ScriptedDispatcher>>, auth: WebhookAuth) -> Self {
        let repo = Arc::new(MemoryBuildRepo::new());
        let router = router_over(repo.clone(), ci, auth);
        Self { repo, router }
    }

    /// No CI target, open webhook.
    pub fn unconfigured() -> Self {
        Self::new(None, WebhookAuth::Open)
    }

    pub fn with_secret() -> Self {
        Self::new(None, WebhookAuth::from_secret(Some(SECRET.to_string())))
    }

    pub async fn seed(&self) -> Build {
        self.repo
            .create(Environment::Staging, "https://staging.example.com")
            .await
            .unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        send(self.router.clone(), request).await
    }
}

pub fn router_over(
    repo: Arc<dyn BuildRepo>,
    ci: Option<Arc<ScriptedDispatcher>>,
    auth: WebhookAuth,
) -> Router {
    let ci = ci.map(|ci| ci as Arc<dyn CiDispatcher>);
    let state = AppState::new(
        repo.clone(),
        BuildDispatcher::new(repo.clone(), ci, CALLBACK_URL),
        StatusReceiver::new(repo, auth),
    );
    routes::router(state)
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("GET")
        .body(Body::empty())
        .unwrap()
}

/// Send a request and decode the JSON body (`Null` when empty or not JSON).
pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}
