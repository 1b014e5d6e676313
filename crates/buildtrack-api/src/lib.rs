//! API server for BuildTrack.
//!
//! Provides the trigger and read endpoints, the CI status webhook, and a
//! WebSocket change feed.

pub mod error;
pub mod routes;
pub mod services;
pub mod state;
pub mod ws;

pub use state::AppState;
