//! HalTransport trait: the boundary between representations and the network.
//! Representations never talk HTTP themselves; every link fetch and POST goes
//! through an injected transport.

pub mod http;

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

pub use http::{HttpTransport, HttpTransportConfig};

pub const HAL_JSON: &str = "application/hal+json";

/// Request or response headers, keyed by header name.
pub type Headers = BTreeMap<String, String>;

#[async_trait]
pub trait HalTransport: Send + Sync {
    /// GET `uri` and return the parsed JSON body.
    async fn get(&self, uri: &str) -> Result<Value>;

    /// POST `body` to `uri` with exactly the given headers.
    async fn post(&self, uri: &str, body: String, headers: &Headers) -> Result<PostResponse>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: String,
}

impl PostResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }

    /// URI of a newly created resource, if the server sent one.
    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }

    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

pub(crate) fn header_value<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Caller headers plus `Content-Type: application/hal+json` unless the caller set one.
pub(crate) fn with_hal_content_type(headers: &Headers) -> Headers {
    let mut merged = headers.clone();
    if header_value(headers, "content-type").is_none() {
        merged.insert("Content-Type".to_string(), HAL_JSON.to_string());
    }
    merged
}
