//! Nested lookup module
//!
//! A lookup is a correlated query against a child endpoint whose results are
//! attached onto each record of the parent result.
//!
//! # Overview
//!
//! - [`LookupChain`] - the selected endpoints, one per depth, validated
//!   against the declared parent/child links
//! - [`build_lookup_query`] - turns a chain into nested [`LookupQuery`] levels
//! - [`LookupResolver`] - runs the nested queries depth first and attaches
//!   the results, optionally wrapped in an [`ExpandMarker`]

mod matcher;
mod query;
mod resolver;
mod types;

pub use matcher::{bind_variables, match_entities};
pub use query::{build_lookup_query, LookupOptions, LookupQuery};
pub use resolver::{EndpointSource, LookupResolver};
pub use types::{
    available_children, visible_depth, ChildLink, EndpointDescriptor, EndpointMap, ExpandMarker,
    LookupChain, LookupStats, EXPAND_KEY, MAX_DEPTH,
};
