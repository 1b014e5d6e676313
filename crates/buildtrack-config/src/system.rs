//! Server configuration parsing.
//!
//! ```kdl
//! server { listen "0.0.0.0:3000"; public-url "https://builds.example.com" }
//! store "postgres" { url "postgres://buildtrack@localhost/buildtrack" }
//! github { token "ghp_..."; owner "acme"; repo "mobile-app"; event-type "flutter_build" }
//! webhook { secret "s3cret" }
//! ```

use crate::{ConfigError, ConfigResult};
use buildtrack_core::config::{CiTarget, GitHubDispatchConfig, WebhookAuth};
use kdl::{KdlDocument, KdlNode};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use url::Url;

/// Record store backend.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreConfig {
    /// PostgreSQL; the URL may still come from `DATABASE_URL`.
    Postgres { url: Option<String> },
    /// Process-local store, lost on restart.
    Memory,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Postgres { url: None }
    }
}

/// Everything the server needs at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    /// Externally reachable base URL, used to build callback URLs.
    pub public_url: Option<String>,
    pub store: StoreConfig,
    pub ci: CiTarget,
    pub webhook: WebhookAuth,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 3000)),
            public_url: None,
            store: StoreConfig::default(),
            ci: CiTarget::Unconfigured,
            webhook: WebhookAuth::Open,
        }
    }
}

impl ServerConfig {
    /// Read and parse a KDL file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        parse_system_config(&text)
    }

    /// Base URL the CI runner should call back on.
    pub fn callback_base(&self) -> String {
        match &self.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}", self.listen),
        }
    }

    /// Layer overrides on top of this configuration. Set fields win.
    pub fn apply_overrides(mut self, overrides: ConfigOverrides) -> ConfigResult<Self> {
        if let Some(listen) = overrides.listen {
            self.listen = parse_listen(&listen)?;
        }
        if let Some(public_url) = overrides.public_url {
            self.public_url = Some(parse_public_url(&public_url)?);
        }
        if let Some(store) = overrides.store {
            let file_url = match &self.store {
                StoreConfig::Postgres { url } => url.clone(),
                StoreConfig::Memory => None,
            };
            self.store = parse_store_kind(&store, file_url)?;
        }
        if let Some(database_url) = overrides.database_url {
            if let StoreConfig::Postgres { url } = &mut self.store {
                *url = Some(database_url);
            }
        }

        let current = match &self.ci {
            CiTarget::Configured(config) => Some(config.clone()),
            CiTarget::Unconfigured => None,
        };
        let api_base = current.as_ref().map(|c| c.api_base.clone());
        let ci = CiTarget::from_parts(
            overrides
                .github_token
                .or_else(|| current.as_ref().map(|c| c.token.expose().to_string())),
            overrides
                .github_owner
                .or_else(|| current.as_ref().map(|c| c.owner.clone())),
            overrides
                .github_repo
                .or_else(|| current.as_ref().map(|c| c.repo.clone())),
            overrides
                .github_event_type
                .or_else(|| current.as_ref().map(|c| c.event_type.clone())),
        );
        self.ci = match (ci, api_base) {
            (CiTarget::Configured(mut config), Some(api_base)) => {
                config.api_base = api_base;
                CiTarget::Configured(config)
            }
            (ci, _) => ci,
        };

        if let Some(secret) = overrides.webhook_secret.filter(|s| !s.is_empty()) {
            self.webhook = WebhookAuth::from_secret(Some(secret));
        }

        Ok(self)
    }
}

/// Values supplied through the environment or command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub listen: Option<String>,
    pub public_url: Option<String>,
    pub store: Option<String>,
    pub database_url: Option<String>,
    pub github_token: Option<String>,
    pub github_owner: Option<String>,
    pub github_repo: Option<String>,
    pub github_event_type: Option<String>,
    pub webhook_secret: Option<String>,
}

/// Parse server configuration from KDL text.
pub fn parse_system_config(kdl: &str) -> ConfigResult<ServerConfig> {
    let doc: KdlDocument = kdl.parse()?;
    let mut config = ServerConfig::default();
    let mut seen = HashSet::new();

    for node in doc.nodes() {
        let name = node.name().value();
        if matches!(name, "server" | "store" | "github" | "webhook") && !seen.insert(name) {
            return Err(ConfigError::Duplicate(format!("{} block", name)));
        }

        match name {
            "server" => parse_server(node, &mut config)?,
            "store" => config.store = parse_store(node)?,
            "github" => config.ci = CiTarget::Configured(parse_github(node)?),
            "webhook" => config.webhook = parse_webhook(node)?,
            _ => {} // Ignore unknown nodes
        }
    }

    Ok(config)
}

fn parse_server(node: &KdlNode, config: &mut ServerConfig) -> ConfigResult<()> {
    if let Some(listen) = get_child_string(node, "listen") {
        config.listen = parse_listen(&listen)?;
    }
    if let Some(public_url) = get_child_string(node, "public-url") {
        config.public_url = Some(parse_public_url(&public_url)?);
    }
    Ok(())
}

fn parse_store(node: &KdlNode) -> ConfigResult<StoreConfig> {
    let kind = get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField("store kind".to_string()))?;
    parse_store_kind(&kind, get_child_string(node, "url"))
}

fn parse_store_kind(kind: &str, url: Option<String>) -> ConfigResult<StoreConfig> {
    match kind {
        "postgres" => Ok(StoreConfig::Postgres { url }),
        "memory" => Ok(StoreConfig::Memory),
        other => Err(ConfigError::InvalidValue {
            field: "store".to_string(),
            message: format!("unknown store kind: {}", other),
        }),
    }
}

fn parse_github(node: &KdlNode) -> ConfigResult<GitHubDispatchConfig> {
    let required = |field: &str| {
        get_child_string(node, field)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingField(format!("github {}", field)))
    };

    let mut config =
        GitHubDispatchConfig::new(required("token")?, required("owner")?, required("repo")?);
    if let Some(event_type) = get_child_string(node, "event-type") {
        config.event_type = event_type;
    }
    if let Some(api_base) = get_child_string(node, "api-base") {
        config.api_base = parse_public_url(&api_base)?;
    }
    Ok(config)
}

fn parse_webhook(node: &KdlNode) -> ConfigResult<WebhookAuth> {
    match get_child_string(node, "secret") {
        Some(secret) if !secret.is_empty() => Ok(WebhookAuth::from_secret(Some(secret))),
        Some(_) => Err(ConfigError::InvalidValue {
            field: "webhook secret".to_string(),
            message: "must not be empty".to_string(),
        }),
        None => Ok(WebhookAuth::Open),
    }
}

fn parse_listen(value: &str) -> ConfigResult<SocketAddr> {
    value.parse().map_err(|e| ConfigError::InvalidValue {
        field: "listen".to_string(),
        message: format!("{}: {}", value, e),
    })
}

fn parse_public_url(value: &str) -> ConfigResult<String> {
    Url::parse(value).map_err(|e| ConfigError::InvalidValue {
        field: "url".to_string(),
        message: format!("{}: {}", value, e),
    })?;
    Ok(value.trim_end_matches('/').to_string())
}

// Helper functions for extracting values from KDL nodes

fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn get_child_string(node: &KdlNode, name: &str) -> Option<String> {
    node.children()?
        .nodes()
        .iter()
        .find(|child| child.name().value() == name)
        .and_then(get_first_string_arg)
}
