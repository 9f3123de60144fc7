//! Loader types
//!
//! Declarative connector definition types for YAML parsing.

use crate::decode::DocumentFormat;
use crate::lookup::ChildLink;
use crate::pagination::PaginationSpec;
use crate::types::{JsonValue, Method};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Connector Definition
// ============================================================================

/// Top-level connector definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConnectorDefinition {
    /// Connector name
    pub name: String,
    /// Connector version
    #[serde(default = "default_version")]
    pub version: String,
    /// Base URL every endpoint template is joined onto
    pub base_url: String,
    /// HTTP client configuration
    #[serde(default)]
    pub http: HttpDefinition,
    /// Headers sent with every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Endpoint definitions
    pub endpoints: Vec<EndpointDefinition>,
    /// Named queries
    #[serde(default)]
    pub queries: Vec<QueryDefinition>,
}

impl ConnectorDefinition {
    /// Find an endpoint by name
    pub fn endpoint(&self, name: &str) -> Option<&EndpointDefinition> {
        self.endpoints.iter().find(|e| e.name == name)
    }

    /// Find a query by name
    pub fn query(&self, name: &str) -> Option<&QueryDefinition> {
        self.queries.iter().find(|q| q.name == name)
    }
}

fn default_version() -> String {
    "0.1.0".to_string()
}

// ============================================================================
// HTTP Definition
// ============================================================================

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HttpDefinition {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Maximum retries
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Rate limit (requests per second)
    #[serde(default)]
    pub rate_limit_rps: Option<u32>,
    /// User agent
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for HttpDefinition {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
            rate_limit_rps: None,
            user_agent: None,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    3
}

// ============================================================================
// Endpoint Definition
// ============================================================================

/// One REST endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EndpointDefinition {
    /// Endpoint name, unique within the connector
    pub name: String,
    /// Endpoint template (`path?query`)
    pub template: String,
    /// HTTP method
    #[serde(default)]
    pub method: Method,
    /// Response document format
    #[serde(default)]
    pub format: DocumentFormat,
    /// Path to the records inside a page
    #[serde(default)]
    pub record_path: Option<String>,
    /// Request body for POST endpoints
    #[serde(default)]
    pub body: Option<JsonValue>,
    /// Endpoint specific headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Pagination configuration
    #[serde(default)]
    pub pagination: PaginationSpec,
    /// Endpoints that can be looked up from this one
    #[serde(default)]
    pub children: Vec<ChildLink>,
}

impl EndpointDefinition {
    /// Declared link to a child endpoint
    pub fn child(&self, name: &str) -> Option<&ChildLink> {
        self.children.iter().find(|c| c.endpoint == name)
    }
}

// ============================================================================
// Query Definition
// ============================================================================

/// A named extraction over a root endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct QueryDefinition {
    /// Query name
    pub name: String,
    /// Root endpoint
    pub endpoint: String,
    /// Template bindings for the root endpoint
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    /// Lookup chain, shallowest first
    #[serde(default)]
    pub lookups: Vec<String>,
    /// Wrap the deepest lookup results in an expand marker
    #[serde(default)]
    pub expand: bool,
    /// Flatten only the top level of the deepest lookup
    #[serde(default)]
    pub top_level_only: bool,
    /// Row cap of the result table
    #[serde(default)]
    pub max_rows: Option<usize>,
    /// Fetch every page (false fetches the first page only)
    #[serde(default = "default_live")]
    pub live: bool,
}

fn default_live() -> bool {
    true
}
