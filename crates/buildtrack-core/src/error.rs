//! Error types for BuildTrack.

use thiserror::Error;

use crate::BuildId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("build not found: {0}")]
    NotFound(BuildId),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store error: {0}")]
    Store(String),

    /// Dispatch to the external CI system failed after the build record was
    /// created. The id is carried so callers can report the orphaned record.
    #[error("dispatch failed for build {build_id}: {message}")]
    Dispatch { build_id: BuildId, message: String },
}

impl Error {
    /// The build id attached to this error, if the record already exists.
    pub fn build_id(&self) -> Option<BuildId> {
        match self {
            Error::Dispatch { build_id, .. } => Some(*build_id),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
