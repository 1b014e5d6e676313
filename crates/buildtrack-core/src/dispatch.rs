//! Hand-off of builds to an external CI system.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{BuildId, Environment};

/// Payload the CI system receives for a new build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub build_id: BuildId,
    pub environment: Environment,
    pub base_url: String,
    /// Where the CI runner posts status updates for this build.
    pub callback_url: String,
}

/// Why a dispatch did not go through.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The CI system answered but refused the job.
    #[error("CI rejected dispatch ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// The CI system could not be reached.
    #[error("CI unreachable: {0}")]
    Unreachable(String),
}

/// Sends builds to an external CI system.
///
/// Implementations make exactly one attempt per call; retrying is the
/// caller's decision.
#[async_trait]
pub trait CiDispatcher: Send + Sync {
    /// Human-readable name of the target, for logs.
    fn name(&self) -> String;

    /// Ask the CI system to run the build. `Ok` means it acknowledged.
    async fn dispatch(&self, request: &DispatchRequest) -> Result<(), DispatchError>;
}
