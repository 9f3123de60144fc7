//! YAML parser for connector definitions
//!
//! Parses and validates connector YAML files.

use crate::error::{Error, Result};
use crate::loader::types::{ConnectorDefinition, EndpointDefinition, QueryDefinition};
use crate::lookup::{EndpointDescriptor, EndpointMap, LookupChain};
use crate::pagination::PaginationStrategy;
use crate::template;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Load a connector definition from a YAML file
pub fn load_connector(path: impl AsRef<Path>) -> Result<ConnectorDefinition> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "Failed to read connector file '{}': {}",
            path.display(),
            e
        ))
    })?;
    load_connector_from_str(&content)
}

/// Load a connector definition from a YAML string
pub fn load_connector_from_str(yaml: &str) -> Result<ConnectorDefinition> {
    let def: ConnectorDefinition = serde_yaml::from_str(yaml)?;

    validate_connector(&def)?;
    Ok(def)
}

/// Endpoint names mapped to their declared children
pub fn endpoint_map(def: &ConnectorDefinition) -> EndpointMap {
    def.endpoints
        .iter()
        .map(|endpoint| {
            let descriptor = endpoint
                .children
                .iter()
                .fold(EndpointDescriptor::new(&endpoint.name), |d, child| {
                    d.with_child(&child.endpoint)
                });
            (endpoint.name.clone(), descriptor)
        })
        .collect()
}

/// Validate a connector definition
fn validate_connector(def: &ConnectorDefinition) -> Result<()> {
    if def.name.is_empty() {
        return Err(Error::config("Connector name cannot be empty"));
    }

    if def.base_url.is_empty() {
        return Err(Error::config("Connector base_url cannot be empty"));
    }
    url::Url::parse(&def.base_url)
        .map_err(|e| Error::invalid_value("base_url", e.to_string()))?;

    if def.endpoints.is_empty() {
        return Err(Error::config("Connector must have at least one endpoint"));
    }

    let endpoint_names: HashSet<_> = def.endpoints.iter().map(|e| e.name.as_str()).collect();
    if endpoint_names.len() != def.endpoints.len() {
        return Err(Error::config("Duplicate endpoint names found"));
    }

    for endpoint in &def.endpoints {
        validate_endpoint(endpoint, &endpoint_names)?;
    }

    let query_names: HashSet<_> = def.queries.iter().map(|q| q.name.as_str()).collect();
    if query_names.len() != def.queries.len() {
        return Err(Error::config("Duplicate query names found"));
    }

    let endpoints = endpoint_map(def);
    for query in &def.queries {
        validate_query(query, &endpoints)?;
    }

    Ok(())
}

/// Validate an endpoint definition
fn validate_endpoint(endpoint: &EndpointDefinition, known: &HashSet<&str>) -> Result<()> {
    if endpoint.name.is_empty() {
        return Err(Error::config("Endpoint name cannot be empty"));
    }

    if endpoint.template.trim().is_empty() {
        return Err(Error::config(format!(
            "Endpoint '{}' template cannot be empty",
            endpoint.name
        )));
    }

    template::parse(&endpoint.template)?;

    PaginationStrategy::from_spec(&endpoint.pagination).map_err(|e| {
        Error::invalid_value(format!("endpoints.{}.pagination", endpoint.name), e.to_string())
    })?;

    for child in &endpoint.children {
        if !known.contains(child.endpoint.as_str()) {
            warn!(
                "Endpoint '{}' declares unknown child endpoint '{}'",
                endpoint.name, child.endpoint
            );
        }
    }

    Ok(())
}

/// Validate a query definition
fn validate_query(query: &QueryDefinition, endpoints: &EndpointMap) -> Result<()> {
    if query.name.is_empty() {
        return Err(Error::config("Query name cannot be empty"));
    }

    if !endpoints.contains_key(&query.endpoint) {
        return Err(Error::config(format!(
            "Query '{}' references unknown endpoint '{}'",
            query.name, query.endpoint
        )));
    }

    let field = format!("queries.{}.lookups", query.name);
    let chain = LookupChain::from_names(query.lookups.iter().map(String::as_str))
        .map_err(|e| Error::invalid_value(&field, e.to_string()))?;

    match chain.validate(&query.endpoint, endpoints) {
        Ok(()) => Ok(()),
        Err(e @ Error::UnknownEndpoint { .. }) => {
            warn!("Query '{}': {e}", query.name);
            Ok(())
        }
        Err(e) => Err(Error::invalid_value(field, e.to_string())),
    }
}
