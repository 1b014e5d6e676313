//! Services behind the HTTP handlers.

pub mod builds;
pub mod github;
pub mod status;

pub use builds::{BuildDispatcher, Triggered};
pub use github::GitHubDispatcher;
pub use status::{Credentials, StatusReceiver};
