//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::engine::{QueryRequest, QueryRunner, RunConfig, RunStats, TableSink};
use crate::error::{Error, Result, ResultExt};
use crate::iterator::CancellationFlag;
use crate::loader::{load_connector, Connector, ConnectorDefinition};
use crate::lookup::{LookupChain, LookupOptions};
use crate::output::{flatten_rows, write_table};
use crate::template;
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::warn;

/// Options of the `run` command
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Named query
    pub query: Option<String>,
    /// Root endpoint of an ad hoc query
    pub endpoint: Option<String>,
    /// Template bindings
    pub params: Vec<(String, String)>,
    /// Lookup chain
    pub lookups: Vec<String>,
    /// Row cap
    pub max_rows: Option<usize>,
    /// First page only
    pub preview: bool,
    /// Expand the deepest lookup
    pub expand: bool,
    /// Flatten only the top level of the deepest lookup
    pub top_level_only: bool,
    /// Output file
    pub output: Option<PathBuf>,
}

/// CLI runner
pub struct Runner {
    cli: Cli,
    cancel: CancellationFlag,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self {
            cli,
            cancel: CancellationFlag::new(),
        }
    }

    /// Flag that cancels a running query
    pub fn cancel_flag(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::ParseTemplate { template } => self.parse_template(template),
            Commands::Validate => self.validate(),
            Commands::Endpoints => self.endpoints(),
            Commands::Run {
                query,
                endpoint,
                params,
                lookups,
                max_rows,
                preview,
                expand,
                top_level_only,
                output,
            } => {
                let options = RunOptions {
                    query: query.clone(),
                    endpoint: endpoint.clone(),
                    params: params.clone(),
                    lookups: lookups.clone(),
                    max_rows: *max_rows,
                    preview: *preview,
                    expand: *expand,
                    top_level_only: *top_level_only,
                    output: output.clone(),
                };
                self.run_query(&options).await.map(|_| ())
            }
        }
    }

    /// Load connector definition
    fn load_connector(&self) -> Result<ConnectorDefinition> {
        let path = self
            .cli
            .connector
            .as_ref()
            .ok_or_else(|| Error::config("Connector file not specified (use -c flag)"))?;
        load_connector(path)
    }

    /// Parse a template and print its components
    fn parse_template(&self, input: &str) -> Result<()> {
        let parsed = template::parse(input)?;
        let query: serde_json::Map<String, Value> = parsed
            .query
            .iter()
            .map(|(name, component)| -> Result<(String, Value)> {
                Ok((name.clone(), serde_json::to_value(component)?))
            })
            .collect::<Result<_>>()?;

        self.output_message(&json!({
            "type": "TEMPLATE",
            "template": parsed.to_string(),
            "path": parsed.path,
            "query": query,
            "required": parsed.required_variables(),
        }));
        Ok(())
    }

    /// Validate connector definition
    fn validate(&self) -> Result<()> {
        let connector = self.load_connector()?;

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!(
                    "Connector '{}' v{} is valid with {} endpoints and {} queries",
                    connector.name,
                    connector.version,
                    connector.endpoints.len(),
                    connector.queries.len()
                )
            }
        }));

        Ok(())
    }

    /// List endpoints
    fn endpoints(&self) -> Result<()> {
        let connector = self.load_connector()?;

        for endpoint in &connector.endpoints {
            let children: Vec<&str> = endpoint
                .children
                .iter()
                .map(|c| c.endpoint.as_str())
                .collect();
            self.output_message(&json!({
                "type": "ENDPOINT",
                "name": endpoint.name,
                "template": endpoint.template,
                "method": endpoint.method.to_string(),
                "format": endpoint.format,
                "pagination": endpoint.pagination.pagination_type.to_string(),
                "children": children,
            }));
        }
        Ok(())
    }

    /// Run a named or ad hoc query
    pub async fn run_query(&self, options: &RunOptions) -> Result<RunStats> {
        let definition = self.load_connector()?;
        let (request, query_max_rows, query_live) = build_request(&definition, options)?;

        let connector = Connector::new(definition)?;
        match request.chain.validate(&request.endpoint, connector.endpoint_map()) {
            Ok(()) => {}
            Err(e @ Error::UnknownEndpoint { .. }) => warn!("{e}"),
            Err(e) => return Err(e),
        }

        let live = query_live && !options.preview;
        let mut sink = match options.max_rows.or(query_max_rows) {
            Some(max) => TableSink::with_max_rows(max),
            None => TableSink::new(),
        };

        let runner = QueryRunner::new(&connector, self.cancel.clone())
            .with_config(RunConfig::new().with_live_mode(live));
        let stats = runner.run(&request, &mut sink).await?;

        let rows = flatten_rows(sink.rows());
        match &options.output {
            Some(path) => {
                write_table(path, &rows)
                    .with_context(|| format!("Writing table to '{}'", path.display()))?;
            }
            None => {
                for row in &rows {
                    self.output_message(&json!({"type": "RECORD", "record": row}));
                }
            }
        }

        self.output_message(&json!({
            "type": "STATS",
            "stats": {
                "endpoint": request.endpoint,
                "rows": stats.rows,
                "flattened_rows": rows.len(),
                "pages": stats.pages,
                "lookup_queries": stats.lookups.queries,
                "lookup_records": stats.lookups.records,
                "lookups_skipped": stats.lookups.skipped,
                "capped": stats.capped,
                "cancelled": stats.cancelled,
                "duration_ms": stats.duration_ms,
            }
        }));

        Ok(stats)
    }

    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// Query request plus the named query's row cap and live flag
fn build_request(
    definition: &ConnectorDefinition,
    options: &RunOptions,
) -> Result<(QueryRequest, Option<usize>, bool)> {
    if let Some(name) = &options.query {
        let query = definition
            .query(name)
            .ok_or_else(|| Error::config(format!("Query '{name}' is not defined")))?;
        let mut request = QueryRequest::from_definition(query)?;
        for (key, value) in &options.params {
            request.params.insert(key.clone(), value.clone());
        }
        return Ok((request, query.max_rows, query.live));
    }

    let endpoint = options
        .endpoint
        .as_deref()
        .ok_or_else(|| Error::config("Either --query or --endpoint is required"))?;
    let chain = LookupChain::from_names(options.lookups.iter().map(String::as_str))?;
    let request = options
        .params
        .iter()
        .fold(QueryRequest::new(endpoint), |r, (k, v)| r.param(k, v))
        .with_chain(chain)
        .with_options(LookupOptions {
            expand: options.expand,
            top_level_only: options.top_level_only,
        });
    Ok((request, None, true))
}
