//! CLI module
//!
//! Command-line interface for running connectors.
//!
//! # Commands
//!
//! - `parse-template` - Show the components of an endpoint template
//! - `validate` - Validate a connector definition
//! - `endpoints` - List endpoints, pagination and lookup children
//! - `run` - Run a named or ad hoc query

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::{RunOptions, Runner};
