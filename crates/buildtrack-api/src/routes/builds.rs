//! Build endpoints.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use buildtrack_core::validate::TriggerRequest;
use buildtrack_core::{Build, BuildId};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_builds).post(trigger_build))
        .route("/{id}", get(get_build))
}

#[derive(Debug, Serialize)]
struct TriggerResponse {
    success: bool,
    build_id: BuildId,
    message: &'static str,
}

async fn trigger_build(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<TriggerResponse>, ApiError> {
    let request: TriggerRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON: {}", e)))?;
    let new = request.validate()?;

    let triggered = state.dispatcher.trigger(new).await?;
    Ok(Json(TriggerResponse {
        success: true,
        build_id: triggered.build.id,
        message: triggered.message(),
    }))
}

#[derive(Debug, Deserialize)]
struct ListBuildsQuery {
    limit: Option<i64>,
}

async fn list_builds(
    State(state): State<AppState>,
    Query(query): Query<ListBuildsQuery>,
) -> Result<Json<Vec<Build>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let builds = state.repo.list_recent(limit).await?;
    Ok(Json(builds))
}

async fn get_build(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Build>, ApiError> {
    let id: BuildId = id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid build id: {}", id)))?;
    let build = state.repo.get(id).await?;
    Ok(Json(build))
}
