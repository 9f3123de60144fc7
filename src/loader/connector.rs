//! Compiled connector
//!
//! Binds a validated [`ConnectorDefinition`] to a request executor so its
//! endpoints can be opened as [`DataIterator`]s, both for root queries and
//! for nested lookups.

use super::parser::endpoint_map;
use super::types::{ConnectorDefinition, EndpointDefinition, HttpDefinition};
use crate::decode::transformer_for;
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RateLimiterConfig, Request, RequestExecutor};
use crate::iterator::{CancellationFlag, DataIterator};
use crate::lookup::{ChildLink, EndpointMap, EndpointSource};
use crate::pagination::PaginationStrategy;
use crate::template::TemplateCache;
use crate::types::StringMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// A connector ready to execute requests
pub struct Connector {
    definition: ConnectorDefinition,
    executor: Arc<dyn RequestExecutor>,
    templates: TemplateCache,
    endpoints: EndpointMap,
}

impl Connector {
    /// Compile a definition with the default HTTP client
    pub fn new(definition: ConnectorDefinition) -> Result<Self> {
        let client = HttpClient::with_config(http_config(&definition))?;
        Ok(Self::with_executor(definition, Arc::new(client)))
    }

    /// Compile a definition over a custom executor
    pub fn with_executor(definition: ConnectorDefinition, executor: Arc<dyn RequestExecutor>) -> Self {
        let endpoints = endpoint_map(&definition);
        Self {
            definition,
            executor,
            templates: TemplateCache::new(),
            endpoints,
        }
    }

    /// Underlying definition
    pub fn definition(&self) -> &ConnectorDefinition {
        &self.definition
    }

    /// Connector name
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Endpoints with their declared children
    pub fn endpoint_map(&self) -> &EndpointMap {
        &self.endpoints
    }

    /// Look up an endpoint definition
    pub fn endpoint(&self, name: &str) -> Result<&EndpointDefinition> {
        self.definition
            .endpoint(name)
            .ok_or_else(|| Error::unknown_endpoint(name))
    }

    /// Build the first request of an endpoint from template bindings
    pub fn build_request(&self, endpoint: &EndpointDefinition, bindings: &StringMap) -> Result<Request> {
        let template = self.templates.get_or_parse(&endpoint.template)?;
        let rendered = template.render(bindings)?;
        let url = rendered.join_url(&self.definition.base_url)?;

        let mut request = Request::new(endpoint.method, url.to_string());
        request.query = rendered.query;
        for (key, value) in &endpoint.headers {
            request.headers.push((key.clone(), value.clone()));
        }
        request.body = endpoint.body.clone();
        Ok(request)
    }

    /// Open an iterator over an endpoint
    pub fn open_endpoint(
        &self,
        endpoint: &EndpointDefinition,
        bindings: &StringMap,
        cancel: &CancellationFlag,
    ) -> Result<DataIterator> {
        let strategy = PaginationStrategy::from_spec(&endpoint.pagination)?;
        let request = self.build_request(endpoint, bindings)?;
        debug!(
            endpoint = %endpoint.name,
            url = %request.url,
            pagination = %strategy.pagination_type(),
            "Opening endpoint"
        );

        Ok(DataIterator::new(
            Arc::clone(&self.executor),
            transformer_for(endpoint.format),
            request,
            strategy,
            cancel.clone(),
        ))
    }
}

impl EndpointSource for Connector {
    fn child_link(&self, parent: &str, child: &str) -> Result<ChildLink> {
        let link = self
            .endpoint(parent)?
            .child(child)
            .cloned()
            .ok_or_else(|| Error::unknown_endpoint(child))?;
        self.endpoint(child)?;
        Ok(link)
    }

    fn open(
        &self,
        endpoint: &str,
        bindings: &StringMap,
        cancel: &CancellationFlag,
    ) -> Result<DataIterator> {
        self.open_endpoint(self.endpoint(endpoint)?, bindings, cancel)
    }

    fn record_path(&self, endpoint: &str) -> Option<String> {
        self.definition
            .endpoint(endpoint)
            .and_then(|e| e.record_path.clone())
    }
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("name", &self.definition.name)
            .field("endpoints", &self.endpoints.len())
            .finish_non_exhaustive()
    }
}

/// HTTP client configuration for a connector
fn http_config(definition: &ConnectorDefinition) -> HttpClientConfig {
    let HttpDefinition {
        timeout_secs,
        max_retries,
        rate_limit_rps,
        ref user_agent,
    } = definition.http;

    let mut builder = HttpClientConfig::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .max_retries(max_retries);
    builder = match rate_limit_rps {
        Some(0) => builder.no_rate_limit(),
        Some(rps) => builder.rate_limit(RateLimiterConfig::per_second(rps)),
        None => builder,
    };
    if let Some(agent) = user_agent {
        builder = builder.user_agent(agent);
    }
    for (key, value) in &definition.headers {
        builder = builder.header(key, value);
    }
    builder.build()
}
