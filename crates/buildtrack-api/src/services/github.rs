//! GitHub `repository_dispatch` client.

use async_trait::async_trait;
use buildtrack_core::config::GitHubDispatchConfig;
use buildtrack_core::dispatch::{CiDispatcher, DispatchError, DispatchRequest};
use serde::Serialize;
use tracing::debug;

const USER_AGENT: &str = "BuildTrack";

/// Dispatches builds as `repository_dispatch` events on a GitHub repository.
pub struct GitHubDispatcher {
    client: reqwest::Client,
    config: GitHubDispatchConfig,
}

#[derive(Serialize)]
struct DispatchBody<'a> {
    event_type: &'a str,
    client_payload: &'a DispatchRequest,
}

impl GitHubDispatcher {
    pub fn new(config: GitHubDispatchConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn dispatch_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/dispatches",
            self.config.api_base.trim_end_matches('/'),
            urlencoding::encode(&self.config.owner),
            urlencoding::encode(&self.config.repo),
        )
    }
}

#[async_trait]
impl CiDispatcher for GitHubDispatcher {
    fn name(&self) -> String {
        format!("github:{}", self.config.full_name())
    }

    async fn dispatch(&self, request: &DispatchRequest) -> Result<(), DispatchError> {
        let body = DispatchBody {
            event_type: &self.config.event_type,
            client_payload: request,
        };

        let response = self
            .client
            .post(self.dispatch_url())
            .header("Accept", "application/vnd.github+json")
            .header(
                "Authorization",
                format!("Bearer {}", self.config.token.expose()),
            )
            .header("User-Agent", USER_AGENT)
            .json(&body)
            .send()
            .await
            .map_err(|e| DispatchError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }

        debug!(build_id = %request.build_id, status = %status, "GitHub accepted dispatch");
        Ok(())
    }
}
