//! Shared test transport: an in-memory HalTransport that records every call.
//!
//! GETs answer with a canned body when one was stubbed, otherwise with an
//! identity document whose self link is the requested URI. URIs registered
//! with `fail` produce a transport error.

#![allow(dead_code)]

use async_trait::async_trait;
use hal_client::{HalError, HalTransport, Headers, PostResponse, Result};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPost {
    pub uri: String,
    pub body: String,
    pub headers: Headers,
}

#[derive(Default)]
pub struct MockTransport {
    bodies: Mutex<HashMap<String, Value>>,
    failing: Mutex<HashSet<String>>,
    gets: Mutex<Vec<String>>,
    posts: Mutex<Vec<RecordedPost>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn stub(&self, uri: &str, body: Value) {
        self.bodies.lock().unwrap().insert(uri.to_string(), body);
    }

    pub fn fail(&self, uri: &str) {
        self.failing.lock().unwrap().insert(uri.to_string());
    }

    pub fn gets(&self) -> Vec<String> {
        self.gets.lock().unwrap().clone()
    }

    pub fn posts(&self) -> Vec<RecordedPost> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl HalTransport for MockTransport {
    async fn get(&self, uri: &str) -> Result<Value> {
        self.gets.lock().unwrap().push(uri.to_string());
        if self.failing.lock().unwrap().contains(uri) {
            return Err(HalError::Transport(anyhow::anyhow!("GET {uri} returned 503")));
        }
        let stubbed = self.bodies.lock().unwrap().get(uri).cloned();
        Ok(stubbed.unwrap_or_else(|| identity(uri)))
    }

    async fn post(&self, uri: &str, body: String, headers: &Headers) -> Result<PostResponse> {
        self.posts.lock().unwrap().push(RecordedPost {
            uri: uri.to_string(),
            body,
            headers: headers.clone(),
        });
        Ok(PostResponse {
            status: 201,
            headers: Headers::new(),
            body: String::new(),
        })
    }
}

/// `{"_links":{"self":{"href":uri}}}`
pub fn identity(uri: &str) -> Value {
    json!({ "_links": { "self": { "href": uri } } })
}

pub fn sample_document() -> Value {
    json!({
        "prop1": 1,
        "_links": {
            "self": { "href": "http://example.com/foo" },
            "link1": { "href": "http://example.com/bar" },
            "link2": { "href": "http://example.com/people{?name}", "templated": true },
            "link3": [
                { "href": "http://example.com/link3-a" },
                { "href": "http://example.com/link3-b" }
            ]
        },
        "_embedded": {
            "embed1": {
                "_links": { "self": { "href": "http://example.com/baz" } }
            }
        }
    })
}
