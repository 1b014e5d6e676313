//! Service configuration handed to the dispatcher and the status receiver.

use crate::secret::SecretString;

/// Default GitHub REST API base URL.
pub const GITHUB_API_BASE: &str = "https://api.github.com";

/// Default `event_type` sent with a repository dispatch.
pub const DEFAULT_EVENT_TYPE: &str = "flutter_build";

/// Where triggered builds are sent for execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CiTarget {
    /// No CI system configured. Triggered builds stay `queued`.
    #[default]
    Unconfigured,
    /// Dispatch through GitHub's `repository_dispatch` API.
    Configured(GitHubDispatchConfig),
}

impl CiTarget {
    /// Build a target from optional parts; configured only when all of
    /// token, owner and repo are present and non-empty.
    pub fn from_parts(
        token: Option<String>,
        owner: Option<String>,
        repo: Option<String>,
        event_type: Option<String>,
    ) -> Self {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        match (present(token), present(owner), present(repo)) {
            (Some(token), Some(owner), Some(repo)) => {
                let mut config = GitHubDispatchConfig::new(token, owner, repo);
                if let Some(event_type) = present(event_type) {
                    config.event_type = event_type;
                }
                CiTarget::Configured(config)
            }
            _ => CiTarget::Unconfigured,
        }
    }
}

/// Credentials and coordinates for GitHub repository dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct GitHubDispatchConfig {
    pub token: SecretString,
    pub owner: String,
    pub repo: String,
    /// `event_type` the workflow listens for.
    pub event_type: String,
    /// API base URL, overridable for GitHub Enterprise.
    pub api_base: String,
}

impl GitHubDispatchConfig {
    pub fn new(
        token: impl Into<SecretString>,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            owner: owner.into(),
            repo: repo.into(),
            event_type: DEFAULT_EVENT_TYPE.to_string(),
            api_base: GITHUB_API_BASE.to_string(),
        }
    }

    /// `owner/repo`, for logs.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// How status callbacks are authenticated.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum WebhookAuth {
    /// Any caller may post status updates.
    #[default]
    Open,
    /// Callers must present this shared secret.
    SharedSecret(SecretString),
}

impl WebhookAuth {
    pub fn from_secret(secret: Option<String>) -> Self {
        match secret.filter(|s| !s.is_empty()) {
            Some(secret) => WebhookAuth::SharedSecret(SecretString::new(secret)),
            None => WebhookAuth::Open,
        }
    }
}
