//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Paginated REST extraction with nested lookups
#[derive(Parser, Debug)]
#[command(name = "resttab")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Connector definition file (YAML)
    #[arg(short, long, global = true)]
    pub connector: Option<PathBuf>,

    /// Output format of messages on stdout
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse an endpoint template and print its components
    ParseTemplate {
        /// Template string, e.g. `orgs/{Org}/repos?type={Type?:all}`
        template: String,
    },

    /// Validate connector definition
    Validate,

    /// List endpoints with their pagination and lookup children
    Endpoints,

    /// Run a query
    Run {
        /// Named query from the connector definition
        #[arg(short, long, conflicts_with = "endpoint")]
        query: Option<String>,

        /// Root endpoint for an ad hoc query
        #[arg(short, long)]
        endpoint: Option<String>,

        /// Template binding `NAME=VALUE` (repeatable)
        #[arg(short, long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,

        /// Lookup endpoint, shallowest first (repeatable)
        #[arg(short, long = "lookup")]
        lookups: Vec<String>,

        /// Maximum number of top-level rows
        #[arg(long)]
        max_rows: Option<usize>,

        /// Fetch only the first page of every query
        #[arg(long)]
        preview: bool,

        /// Expand the deepest lookup into rows
        #[arg(long)]
        expand: bool,

        /// Flatten only the top level of the deepest lookup
        #[arg(long)]
        top_level_only: bool,

        /// Write the table to a file (`.parquet` or JSON lines)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}

/// Parse `NAME=VALUE`
fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    if key.is_empty() {
        return Err(format!("empty name in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
