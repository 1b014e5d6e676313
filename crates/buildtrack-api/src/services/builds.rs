//! Build triggering.

use std::sync::Arc;

use buildtrack_core::build::BuildPatch;
use buildtrack_core::dispatch::{CiDispatcher, DispatchError, DispatchRequest};
use buildtrack_core::validate::NewBuild;
use buildtrack_core::{Build, Error, Result};
use buildtrack_db::BuildRepo;
use tracing::{error, info, warn};

/// Creates build records and hands them to the CI system.
pub struct BuildDispatcher {
    repo: Arc<dyn BuildRepo>,
    ci: Option<Arc<dyn CiDispatcher>>,
    callback_url: String,
}

/// Result of a successful trigger.
#[derive(Debug, Clone)]
pub struct Triggered {
    pub build: Build,
    /// False when no CI target is configured and the build stays queued.
    pub dispatched: bool,
}

impl Triggered {
    pub fn message(&self) -> &'static str {
        if self.dispatched {
            "Build triggered successfully"
        } else {
            "Build queued; no CI target configured"
        }
    }
}

impl BuildDispatcher {
    /// `ci` of `None` means unconfigured: builds are recorded but never sent.
    pub fn new(
        repo: Arc<dyn BuildRepo>,
        ci: Option<Arc<dyn CiDispatcher>>,
        callback_url: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            ci,
            callback_url: callback_url.into(),
        }
    }

    pub fn callback_url(&self) -> &str {
        &self.callback_url
    }

    /// Record a new build and make one dispatch attempt.
    ///
    /// Once the record exists its id is always reported, including in
    /// `Error::Dispatch` when the CI system refuses or cannot be reached.
    pub async fn trigger(&self, new: NewBuild) -> Result<Triggered> {
        let build = self
            .repo
            .create(new.environment, &new.base_url)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to create build record");
                Error::from(e)
            })?;

        info!(
            build_id = %build.id,
            environment = %build.environment,
            base_url = %build.base_url,
            "Build created"
        );

        let Some(ci) = &self.ci else {
            warn!(build_id = %build.id, "No CI target configured, build stays queued");
            return Ok(Triggered {
                build,
                dispatched: false,
            });
        };

        let request = DispatchRequest {
            build_id: build.id,
            environment: build.environment,
            base_url: build.base_url.clone(),
            callback_url: self.callback_url.clone(),
        };

        match ci.dispatch(&request).await {
            Ok(()) => {
                info!(build_id = %build.id, target = %ci.name(), "Build dispatched");
                let build = match self
                    .repo
                    .update(build.id, &BuildPatch::dispatched(), None)
                    .await
                {
                    Ok(updated) => updated,
                    Err(e) => {
                        // CI is running the job; the record lags until the first callback.
                        error!(
                            build_id = %build.id,
                            error = %e,
                            "Build dispatched but could not be marked building"
                        );
                        build
                    }
                };
                Ok(Triggered {
                    build,
                    dispatched: true,
                })
            }
            Err(e) => {
                error!(build_id = %build.id, target = %ci.name(), error = %e, "Dispatch failed");
                if let Err(patch_err) = self
                    .repo
                    .update(build.id, &BuildPatch::dispatch_failed(), None)
                    .await
                {
                    error!(
                        build_id = %build.id,
                        error = %patch_err,
                        "Could not mark build failed, it stays queued"
                    );
                }
                Err(Error::Dispatch {
                    build_id: build.id,
                    message: failure_message(&e),
                })
            }
        }
    }
}

fn failure_message(err: &DispatchError) -> String {
    match err {
        DispatchError::Rejected { status, .. } => {
            format!("Failed to trigger CI workflow (status {})", status)
        }
        DispatchError::Unreachable(_) => "Failed to connect to CI".to_string(),
    }
}
