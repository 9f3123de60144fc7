//! Endpoint template module
//!
//! Parses the declarative endpoint template grammar used by connector
//! definitions, renders parsed templates into request paths and query
//! pairs, and serializes them back to their persisted form.
//!
//! # Example
//!
//! ```rust,ignore
//! let template = template::parse("orgs/{Org}/repos?type={Type?:all}")?;
//! let rendered = template.render(&bindings)?;
//! ```

mod parser;
mod render;
mod types;

pub use parser::parse;
pub use types::{EndpointTemplate, RenderedEndpoint, TemplateComponent};

use crate::error::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Cache of parsed templates keyed by template string.
///
/// Parsed templates are immutable, so they are shared behind `Arc`.
#[derive(Debug, Default)]
pub struct TemplateCache {
    parsed: Mutex<HashMap<String, Arc<EndpointTemplate>>>,
}

impl TemplateCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the parsed template, parsing it on first use
    pub fn get_or_parse(&self, template: &str) -> Result<Arc<EndpointTemplate>> {
        let mut parsed = self
            .parsed
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(hit) = parsed.get(template) {
            return Ok(Arc::clone(hit));
        }
        let fresh = Arc::new(parse(template)?);
        parsed.insert(template.to_string(), Arc::clone(&fresh));
        Ok(fresh)
    }

    /// Number of cached templates
    pub fn len(&self) -> usize {
        self.parsed
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests;
