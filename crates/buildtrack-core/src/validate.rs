//! Validation of inbound requests.
//!
//! Request bodies are deserialized loosely (every field optional, enums as
//! strings) so that missing or unknown values surface as validation errors
//! instead of opaque decode failures.

use serde::Deserialize;
use url::Url;

use crate::build::BuildPatch;
use crate::{BuildId, BuildStage, BuildStatus, Environment, Error, Result};

/// Raw body of a trigger request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TriggerRequest {
    pub environment: Option<String>,
    pub base_url: Option<String>,
}

/// A trigger request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBuild {
    pub environment: Environment,
    /// The caller's URL as supplied (trimmed); it parsed as absolute.
    pub base_url: String,
}

impl TriggerRequest {
    pub fn validate(&self) -> Result<NewBuild> {
        let (Some(environment), Some(base_url)) = (
            non_empty(self.environment.as_deref()),
            non_empty(self.base_url.as_deref()),
        ) else {
            return Err(Error::Validation(
                "missing required fields: environment and base_url".to_string(),
            ));
        };

        let environment = environment.parse::<Environment>().map_err(Error::Validation)?;
        Url::parse(base_url)
            .map_err(|e| Error::Validation(format!("invalid base_url format: {}", e)))?;

        Ok(NewBuild {
            environment,
            base_url: base_url.to_string(),
        })
    }
}

/// Raw body of a status callback from the CI runner.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusUpdateRequest {
    pub build_id: Option<String>,
    pub status: Option<String>,
    pub stage: Option<String>,
    pub progress: Option<i64>,
    pub artifact_url: Option<String>,
    #[serde(alias = "github_run_id")]
    pub external_run_id: Option<String>,
    /// When present, the update only applies if the stored status matches.
    pub expected_status: Option<String>,
}

/// A status callback that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub build_id: BuildId,
    pub patch: BuildPatch,
    pub expected_status: Option<BuildStatus>,
}

impl StatusUpdateRequest {
    pub fn validate(&self) -> Result<StatusUpdate> {
        let (Some(build_id), Some(status), Some(stage), Some(progress)) = (
            non_empty(self.build_id.as_deref()),
            non_empty(self.status.as_deref()),
            non_empty(self.stage.as_deref()),
            self.progress,
        ) else {
            return Err(Error::Validation(
                "missing required fields: build_id, status, stage and progress".to_string(),
            ));
        };

        let build_id = build_id
            .parse::<BuildId>()
            .map_err(|e| Error::Validation(format!("invalid build_id: {}", e)))?;
        let status = status.parse::<BuildStatus>().map_err(Error::Validation)?;
        let stage = stage.parse::<BuildStage>().map_err(Error::Validation)?;
        let progress = check_progress(progress)?;
        let expected_status = non_empty(self.expected_status.as_deref())
            .map(|s| s.parse::<BuildStatus>().map_err(Error::Validation))
            .transpose()?;

        Ok(StatusUpdate {
            build_id,
            patch: BuildPatch {
                status: Some(status),
                stage: Some(stage),
                progress: Some(progress),
                artifact_url: non_empty(self.artifact_url.as_deref()).map(str::to_string),
                external_run_id: non_empty(self.external_run_id.as_deref()).map(str::to_string),
            },
            expected_status,
        })
    }
}

/// Progress outside 0..=100 is rejected, never clamped.
pub fn check_progress(progress: i64) -> Result<u8> {
    if !(0..=100).contains(&progress) {
        return Err(Error::Validation(
            "progress must be between 0 and 100".to_string(),
        ));
    }
    Ok(progress as u8)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
