//! HTTP client for the BuildTrack API.

use anyhow::{Context, Result, anyhow};
use buildtrack_core::Build;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use url::Url;

pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

/// Answer to a trigger request, successful or not.
#[derive(Debug, Deserialize)]
pub struct TriggerReply {
    #[serde(default)]
    pub success: bool,
    pub build_id: Option<String>,
    pub message: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

impl ApiClient {
    pub fn new(api_url: &str) -> Result<Self> {
        let base = Url::parse(api_url).with_context(|| format!("invalid API URL: {}", api_url))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base,
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("invalid API path: {}", path))
    }

    /// WebSocket endpoint of the change feed.
    pub fn ws_url(&self) -> Result<Url> {
        let mut url = self.url("/ws")?;
        let scheme = match url.scheme() {
            "https" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme)
            .map_err(|_| anyhow!("cannot derive WebSocket URL from {}", self.base))?;
        Ok(url)
    }

    pub async fn trigger(&self, environment: &str, base_url: &str) -> Result<TriggerReply> {
        let url = self.url("/api/v1/builds")?;
        debug!(%url, "POST");
        let response = self
            .http
            .post(url)
            .json(&json!({ "environment": environment, "base_url": base_url }))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        serde_json::from_str(&text)
            .with_context(|| format!("unexpected response ({}): {}", status, text))
    }

    pub async fn list(&self, limit: u32) -> Result<Vec<Build>> {
        let mut url = self.url("/api/v1/builds")?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        self.get_json(url).await
    }

    pub async fn get(&self, id: &str) -> Result<Build> {
        let url = self.url(&format!("/api/v1/builds/{}", id))?;
        self.get_json(url).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(%url, "GET");
        let response = self.http.get(url).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|e| e.error)
                .unwrap_or(text);
            return Err(anyhow!("server returned {}: {}", status, message));
        }

        serde_json::from_str(&text).context("failed to decode response")
    }
}
