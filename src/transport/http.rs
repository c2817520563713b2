//! HttpTransport: reqwest-backed HalTransport.
//!
//! No retries, no authentication. Any non-2xx GET is reported as a
//! transport error; POST responses are returned whatever their status.

use super::{HalTransport, Headers, PostResponse};
use crate::error::{HalError, Result};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_ACCEPT: &str = "application/hal+json, application/json;q=0.9";
const ERROR_BODY_PREVIEW: usize = 200;

#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    pub timeout: Duration,
    pub user_agent: String,
    /// Accept header sent with every GET
    pub accept: String,
    /// Sent with every request; per-request headers override them
    pub default_headers: Headers,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: format!("hal-client/{}", env!("CARGO_PKG_VERSION")),
            accept: DEFAULT_ACCEPT.to_string(),
            default_headers: Headers::new(),
        }
    }
}

impl HttpTransportConfig {
    /// Defaults overridden by `HAL_CLIENT_TIMEOUT_SECS`, `HAL_CLIENT_USER_AGENT`
    /// and `HAL_CLIENT_ACCEPT`.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Ok(secs) = std::env::var("HAL_CLIENT_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .with_context(|| format!("HAL_CLIENT_TIMEOUT_SECS is not a number: {secs}"))?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Ok(agent) = std::env::var("HAL_CLIENT_USER_AGENT") {
            config.user_agent = agent;
        }
        if let Ok(accept) = std::env::var("HAL_CLIENT_ACCEPT") {
            config.accept = accept;
        }
        Ok(config)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: HttpTransportConfig,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .default_headers(to_header_map(&config.default_headers)?)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }
}

#[async_trait]
impl HalTransport for HttpTransport {
    async fn get(&self, uri: &str) -> Result<Value> {
        debug!(%uri, "GET");
        let response = self
            .client
            .get(uri)
            .header(ACCEPT, self.config.accept.as_str())
            .send()
            .await
            .with_context(|| format!("Failed to fetch {uri}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HalError::Transport(anyhow!(
                "GET {} returned {}: {}",
                uri,
                status,
                body.chars().take(ERROR_BODY_PREVIEW).collect::<String>()
            )));
        }

        let body = response
            .json::<Value>()
            .await
            .with_context(|| format!("Failed to parse response from {uri}"))?;
        Ok(body)
    }

    async fn post(&self, uri: &str, body: String, headers: &Headers) -> Result<PostResponse> {
        debug!(%uri, bytes = body.len(), "POST");
        let response = self
            .client
            .post(uri)
            .headers(to_header_map(headers)?)
            .body(body)
            .send()
            .await
            .with_context(|| format!("Failed to post to {uri}"))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {uri}"))?;

        Ok(PostResponse {
            status,
            headers,
            body,
        })
    }
}

fn to_header_map(headers: &Headers) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .with_context(|| format!("Invalid header name: {name}"))?;
        let value = HeaderValue::from_str(value)
            .with_context(|| format!("Invalid value for header {name}"))?;
        map.insert(name, value);
    }
    Ok(map)
}
