//! Request/response types and the executor seam
//!
//! The pagination engine only ever talks to a [`RequestExecutor`]; the
//! reqwest-backed [`super::HttpClient`] is one implementation of it.

use crate::error::Result;
use crate::types::{JsonValue, Method};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use serde_json::Map;
use tracing::warn;
use url::Url;

/// A fully described outgoing request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    /// HTTP method
    pub method: Method,
    /// Absolute URL without the query pairs below
    pub url: String,
    /// Query pairs; a name may repeat
    pub query: Vec<(String, String)>,
    /// Request headers
    pub headers: Vec<(String, String)>,
    /// JSON body
    pub body: Option<JsonValue>,
}

impl Request {
    /// Create a request for a URL
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            ..Default::default()
        }
    }

    /// Append a query pair
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Set JSON body
    #[must_use]
    pub fn json(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    /// Replace every pair named `key` with a single pair
    pub fn set_query(&mut self, key: &str, value: impl Into<String>) {
        self.query.retain(|(k, _)| k != key);
        self.query.push((key.to_string(), value.into()));
    }

    /// First value of a query parameter
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// URL including the query pairs
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        match Url::parse_with_params(&self.url, &self.query) {
            Ok(url) => url.to_string(),
            Err(_) => self.url.clone(),
        }
    }

    /// Write `value` into the body at a dotted JSON path.
    ///
    /// Intermediate objects are created as needed and sibling fields are kept.
    pub fn merge_body(&mut self, path: &str, value: JsonValue) {
        let path = path.strip_prefix("$.").unwrap_or(path);
        let parts: Vec<&str> = path.split('.').filter(|p| !p.is_empty()).collect();
        let Some((last, parents)) = parts.split_last() else {
            return;
        };

        let body = self
            .body
            .get_or_insert_with(|| JsonValue::Object(Map::new()));
        let mut current = ensure_object(body, "$");
        for part in parents {
            let child = current
                .entry((*part).to_string())
                .or_insert_with(|| JsonValue::Object(Map::new()));
            current = ensure_object(child, part);
        }
        current.insert((*last).to_string(), value);
    }
}

fn ensure_object<'a>(value: &'a mut JsonValue, at: &str) -> &'a mut Map<String, JsonValue> {
    if !value.is_object() {
        warn!("Replacing non-object body value at '{at}' to write a pagination parameter");
        *value = JsonValue::Object(Map::new());
    }
    match value {
        JsonValue::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}

/// A completed response
#[derive(Debug, Clone, Default)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw body
    pub body: Bytes,
}

impl Response {
    /// Create a 200 response with a body
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self {
            status: 200,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Check for a 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes one request at a time.
///
/// Implementations raise an error on transport failure or a non-success
/// status. Retry policy, if any, belongs to the implementation.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    /// Perform the request
    async fn execute(&self, request: &Request) -> Result<Response>;
}
