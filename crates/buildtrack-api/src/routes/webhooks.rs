//! Status webhook for the CI runner.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use buildtrack_core::Build;
use serde::Serialize;

use crate::AppState;
use crate::error::ApiError;
use crate::services::Credentials;

pub fn router() -> Router<AppState> {
    Router::new().route("/build-status", post(build_status))
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    success: bool,
    build: Build,
}

async fn build_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<StatusResponse>, ApiError> {
    let build = state
        .receiver
        .update_status(credentials(&headers), &body)
        .await?;
    Ok(Json(StatusResponse {
        success: true,
        build,
    }))
}

fn credentials(headers: &HeaderMap) -> Credentials<'_> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    Credentials {
        secret: header("x-webhook-secret"),
        signature: header("x-hub-signature-256"),
    }
}
