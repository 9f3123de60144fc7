//! Lookup configuration types
//!
//! Endpoint relationships, the validated lookup chain and the expand marker
//! attached onto records.

use crate::error::{Error, Result};
use crate::types::JsonValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Deepest lookup chain supported
pub const MAX_DEPTH: usize = 5;

/// Key of an expand marker object
pub const EXPAND_KEY: &str = "$expand";

/// An endpoint and the lookup endpoints reachable from it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointDescriptor {
    /// Endpoint name
    pub name: String,
    /// Declared child endpoint names
    pub children: Vec<String>,
}

impl EndpointDescriptor {
    /// Create a descriptor without children
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Declare a child endpoint
    #[must_use]
    pub fn with_child(mut self, child: impl Into<String>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Check whether `child` is a declared child
    pub fn has_child(&self, child: &str) -> bool {
        self.children.iter().any(|c| c == child)
    }
}

/// Endpoint descriptors by name
pub type EndpointMap = BTreeMap<String, EndpointDescriptor>;

/// How a child endpoint joins onto a parent record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildLink {
    /// Child endpoint name
    pub endpoint: String,
    /// Path of the entities inside a parent record the results attach to
    #[serde(default = "default_match_path")]
    pub match_path: String,
    /// Child template variable -> path inside the matched entity
    #[serde(default)]
    pub bind: BTreeMap<String, String>,
}

fn default_match_path() -> String {
    "$".to_string()
}

impl ChildLink {
    /// Link attaching onto the whole parent record
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            match_path: default_match_path(),
            bind: BTreeMap::new(),
        }
    }

    /// Set the match path
    #[must_use]
    pub fn at(mut self, match_path: impl Into<String>) -> Self {
        self.match_path = match_path.into();
        self
    }

    /// Bind a child variable to a path inside the match
    #[must_use]
    pub fn bind(mut self, variable: impl Into<String>, path: impl Into<String>) -> Self {
        self.bind.insert(variable.into(), path.into());
        self
    }
}

/// Ordered lookup endpoints, each a declared child of the one before.
///
/// Replacing or clearing the entry at a depth drops every deeper entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupChain {
    entries: Vec<String>,
}

impl LookupChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a chain from names, shallowest first
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut chain = Self::new();
        for name in names {
            chain.select(chain.len(), name)?;
        }
        Ok(chain)
    }

    /// Selected names, shallowest first
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Number of selected levels
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether nothing is selected
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Name selected at a depth
    pub fn get(&self, depth: usize) -> Option<&str> {
        self.entries.get(depth).map(String::as_str)
    }

    /// Select `name` at `depth`, dropping every deeper entry
    pub fn select(&mut self, depth: usize, name: impl Into<String>) -> Result<()> {
        if depth >= MAX_DEPTH {
            return Err(Error::InvalidLookupChain {
                depth,
                message: format!("lookups nest at most {MAX_DEPTH} levels"),
            });
        }
        if depth > self.entries.len() {
            return Err(Error::InvalidLookupChain {
                depth,
                message: format!("level {} is not selected", self.entries.len()),
            });
        }
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::InvalidLookupChain {
                depth,
                message: "endpoint name is empty".to_string(),
            });
        }
        self.entries.truncate(depth);
        self.entries.push(name);
        Ok(())
    }

    /// Clear the entry at `depth` and everything deeper
    pub fn clear(&mut self, depth: usize) {
        self.entries.truncate(depth);
    }

    /// Check every entry is a declared child of its parent
    pub fn validate(&self, root: &str, endpoints: &EndpointMap) -> Result<()> {
        let mut parent = root;
        for (depth, name) in self.entries.iter().enumerate() {
            let descriptor = endpoints
                .get(parent)
                .ok_or_else(|| Error::unknown_endpoint(parent))?;
            if !descriptor.has_child(name) {
                return Err(Error::InvalidLookupChain {
                    depth,
                    message: format!("'{name}' is not a child of '{parent}'"),
                });
            }
            if !endpoints.contains_key(name) {
                return Err(Error::unknown_endpoint(name.as_str()));
            }
            parent = name;
        }
        Ok(())
    }
}

/// Number of chain levels that can be shown for selection.
///
/// Level 0 is visible when the root endpoint exists; level *i* is visible
/// when every shallower level names a declared, existing child.
pub fn visible_depth(chain: &LookupChain, root: &str, endpoints: &EndpointMap) -> usize {
    if !endpoints.contains_key(root) {
        return 0;
    }
    let mut visible = 1;
    let mut parent = root;
    for name in chain.entries() {
        let resolved = endpoints.get(parent).is_some_and(|d| d.has_child(name))
            && endpoints.contains_key(name.as_str());
        if !resolved || visible == MAX_DEPTH {
            break;
        }
        visible += 1;
        parent = name;
    }
    visible
}

/// Endpoints selectable at `depth`; empty when the level is not visible
pub fn available_children(
    chain: &LookupChain,
    root: &str,
    endpoints: &EndpointMap,
    depth: usize,
) -> Vec<String> {
    if depth >= visible_depth(chain, root, endpoints) {
        return Vec::new();
    }
    let parent = match depth {
        0 => root,
        _ => match chain.get(depth - 1) {
            Some(name) => name,
            None => return Vec::new(),
        },
    };
    endpoints
        .get(parent)
        .map(|d| {
            d.children
                .iter()
                .filter(|c| endpoints.contains_key(c.as_str()))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// Lookup results that a later stage flattens into the parent row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpandMarker {
    /// Nesting levels to collapse; 0 flattens fully
    pub levels: u32,
    /// Attached records
    pub items: Vec<JsonValue>,
}

impl ExpandMarker {
    /// Create a marker
    pub fn new(levels: u32, items: Vec<JsonValue>) -> Self {
        Self { levels, items }
    }

    /// JSON form `{"$expand": {"levels": n, "items": [...]}}`
    pub fn into_value(self) -> JsonValue {
        let mut inner = serde_json::Map::new();
        inner.insert("levels".to_string(), JsonValue::from(self.levels));
        inner.insert("items".to_string(), JsonValue::Array(self.items));
        let mut outer = serde_json::Map::new();
        outer.insert(EXPAND_KEY.to_string(), JsonValue::Object(inner));
        JsonValue::Object(outer)
    }

    /// Read a marker back from its JSON form
    pub fn from_value(value: &JsonValue) -> Option<Self> {
        let map = value.as_object()?;
        if map.len() != 1 {
            return None;
        }
        serde_json::from_value(map.get(EXPAND_KEY)?.clone()).ok()
    }

    /// Check whether a value is an expand marker
    pub fn is_marker(value: &JsonValue) -> bool {
        value
            .as_object()
            .is_some_and(|m| m.len() == 1 && m.contains_key(EXPAND_KEY))
    }
}

/// Counters from resolving lookups
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupStats {
    /// Nested queries executed
    pub queries: usize,
    /// Nested records attached
    pub records: usize,
    /// Lookups skipped
    pub skipped: usize,
}

impl LookupStats {
    /// Add another set of counters
    pub fn merge(&mut self, other: LookupStats) {
        self.queries += other.queries;
        self.records += other.records;
        self.skipped += other.skipped;
    }
}
