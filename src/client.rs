//! HalClient: entry point for browsing a HAL API from a known URL.

use crate::error::{HalError, Result};
use crate::representation::Representation;
use crate::transport::{
    with_hal_content_type, HalTransport, Headers, HttpTransport, HttpTransportConfig, PostResponse,
};
use anyhow::Context;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct HalClient {
    transport: Arc<dyn HalTransport>,
}

impl HalClient {
    pub fn new(transport: impl HalTransport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    pub fn from_arc(transport: Arc<dyn HalTransport>) -> Self {
        Self { transport }
    }

    /// Client over HTTP with the given transport configuration.
    pub fn http(config: HttpTransportConfig) -> Result<Self> {
        Ok(Self::new(HttpTransport::new(config)?))
    }

    pub fn transport(&self) -> &Arc<dyn HalTransport> {
        &self.transport
    }

    /// Fetch the representation at `url`. Relations followed from it use
    /// the same transport.
    pub async fn get(&self, url: &str) -> Result<Representation> {
        let url = absolute_url(url)?;
        debug!(%url, "fetching entry point");
        let body = self.transport.get(&url).await?;
        Representation::fetched(body, url, Arc::clone(&self.transport))
    }

    /// POST `body` to `url` as `application/hal+json` unless `headers`
    /// names another content type.
    pub async fn post(
        &self,
        url: &str,
        body: impl Into<String>,
        headers: &Headers,
    ) -> Result<PostResponse> {
        let body = body.into();
        let url = absolute_url(url)?;
        let headers = with_hal_content_type(headers);
        self.transport.post(&url, body, &headers).await
    }
}

impl std::fmt::Debug for HalClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HalClient").finish_non_exhaustive()
    }
}

fn absolute_url(url: &str) -> Result<String> {
    let parsed = url::Url::parse(url)
        .with_context(|| format!("not an absolute URL: {url}"))
        .map_err(HalError::Transport)?;
    Ok(parsed.to_string())
}
