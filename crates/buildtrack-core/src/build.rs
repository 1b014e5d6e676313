//! The build record and its lifecycle enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::BuildId;

/// Target environment a build is produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Qa,
    Staging,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Qa => "qa",
            Environment::Staging => "staging",
            Environment::Prod => "prod",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" => Ok(Environment::Dev),
            "qa" => Ok(Environment::Qa),
            "staging" => Ok(Environment::Staging),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("unknown environment: {}", s)),
        }
    }
}

/// Overall build status.
///
/// `queued → building → {success, failed}`; `failed` is also reachable
/// straight from `queued` when dispatch fails. Nothing enforces the order:
/// the external CI system is trusted to report transitions sensibly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    Queued,
    Building,
    Success,
    Failed,
}

impl BuildStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStatus::Queued => "queued",
            BuildStatus::Building => "building",
            BuildStatus::Success => "success",
            BuildStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BuildStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(BuildStatus::Queued),
            "building" => Ok(BuildStatus::Building),
            "success" => Ok(BuildStatus::Success),
            "failed" => Ok(BuildStatus::Failed),
            _ => Err(format!("unknown build status: {}", s)),
        }
    }
}

/// Sub-phase of a build while it is `building`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStage {
    Pending,
    Checkout,
    Dependencies,
    Build,
    Upload,
    Complete,
}

impl BuildStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStage::Pending => "pending",
            BuildStage::Checkout => "checkout",
            BuildStage::Dependencies => "dependencies",
            BuildStage::Build => "build",
            BuildStage::Upload => "upload",
            BuildStage::Complete => "complete",
        }
    }
}

impl std::fmt::Display for BuildStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BuildStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BuildStage::Pending),
            "checkout" => Ok(BuildStage::Checkout),
            "dependencies" => Ok(BuildStage::Dependencies),
            "build" => Ok(BuildStage::Build),
            "upload" => Ok(BuildStage::Upload),
            "complete" => Ok(BuildStage::Complete),
            _ => Err(format!("unknown build stage: {}", s)),
        }
    }
}

/// A tracked build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Build {
    pub id: BuildId,
    pub environment: Environment,
    pub base_url: String,
    pub status: BuildStatus,
    pub stage: BuildStage,
    /// Percent complete, always within 0..=100.
    pub progress: u8,
    pub artifact_url: Option<String>,
    pub external_run_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Field changes applied to an existing build.
///
/// `None` leaves the stored value untouched; the optional URL and run id are
/// therefore never cleared once set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildPatch {
    pub status: Option<BuildStatus>,
    pub stage: Option<BuildStage>,
    pub progress: Option<u8>,
    pub artifact_url: Option<String>,
    pub external_run_id: Option<String>,
}

impl BuildPatch {
    /// Patch applied after the CI system accepted a dispatch.
    pub fn dispatched() -> Self {
        Self {
            status: Some(BuildStatus::Building),
            ..Default::default()
        }
    }

    /// Patch applied after the CI system rejected or could not be reached.
    pub fn dispatch_failed() -> Self {
        Self {
            status: Some(BuildStatus::Failed),
            stage: Some(BuildStage::Pending),
            ..Default::default()
        }
    }

    /// Apply this patch to a build in place. Does not touch `updated_at`;
    /// stores refresh it themselves.
    pub fn apply_to(&self, build: &mut Build) {
        if let Some(status) = self.status {
            build.status = status;
        }
        if let Some(stage) = self.stage {
            build.stage = stage;
        }
        if let Some(progress) = self.progress {
            build.progress = progress;
        }
        if let Some(url) = &self.artifact_url {
            build.artifact_url = Some(url.clone());
        }
        if let Some(run_id) = &self.external_run_id {
            build.external_run_id = Some(run_id.clone());
        }
    }
}
