//! API routes.

pub mod builds;
pub mod health;
pub mod webhooks;

use crate::AppState;
use crate::ws::ws_handler;
use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};

/// Build the main API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_router())
        .nest("/webhooks", webhooks::router())
        .route("/ws", get(ws_handler))
        .merge(health::router())
        .with_state(state)
}

fn api_router() -> Router<AppState> {
    Router::new().nest("/builds", builds::router())
}

/// Answer pre-flight requests from any origin.
pub fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
