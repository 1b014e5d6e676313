//! Application state.

use buildtrack_config::ServerConfig;
use buildtrack_core::config::CiTarget;
use buildtrack_core::dispatch::CiDispatcher;
use buildtrack_db::BuildRepo;
use std::sync::Arc;

use crate::services::{BuildDispatcher, GitHubDispatcher, StatusReceiver};

/// Path the CI runner posts status callbacks to.
pub const CALLBACK_PATH: &str = "/webhooks/build-status";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn BuildRepo>,
    pub dispatcher: Arc<BuildDispatcher>,
    pub receiver: Arc<StatusReceiver>,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn BuildRepo>,
        dispatcher: BuildDispatcher,
        receiver: StatusReceiver,
    ) -> Self {
        Self {
            repo,
            dispatcher: Arc::new(dispatcher),
            receiver: Arc::new(receiver),
        }
    }

    /// Wire services from server configuration.
    pub fn from_config(repo: Arc<dyn BuildRepo>, config: &ServerConfig) -> Self {
        let ci: Option<Arc<dyn CiDispatcher>> = match &config.ci {
            CiTarget::Configured(github) => Some(Arc::new(GitHubDispatcher::new(github.clone()))),
            CiTarget::Unconfigured => None,
        };
        let callback_url = format!("{}{}", config.callback_base(), CALLBACK_PATH);

        Self::new(
            repo.clone(),
            BuildDispatcher::new(repo.clone(), ci, callback_url),
            StatusReceiver::new(repo, config.webhook.clone()),
        )
    }
}
