//! YAML Loader module
//!
//! Parse connector definitions from YAML files.
//!
//! # Overview
//!
//! The loader module provides:
//! - `ConnectorDefinition` - Declarative connector definition
//! - `EndpointDefinition` - Endpoint template, pagination and lookup children
//! - `QueryDefinition` - Named extraction with a lookup chain
//! - `Connector` - A validated definition bound to an HTTP executor

mod connector;
mod parser;
mod types;

pub use connector::Connector;
pub use parser::{endpoint_map, load_connector, load_connector_from_str};
pub use types::{ConnectorDefinition, EndpointDefinition, HttpDefinition, QueryDefinition};
