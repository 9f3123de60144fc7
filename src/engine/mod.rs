//! Execution engine module
//!
//! Main read loop of a query run.
//!
//! # Overview
//!
//! The engine module provides:
//! - `QueryRunner` - Drives the root iterator, resolves lookups per record
//!   and feeds the sink
//! - `Sink` / `TableSink` - Bounded destination of result rows
//! - `RunConfig` / `RunStats` - Run configuration and statistics

mod types;

pub use types::{QueryRequest, RunConfig, RunStats, Sink, SinkStatus, TableSink};

use crate::error::Result;
use crate::iterator::CancellationFlag;
use crate::lookup::{build_lookup_query, EndpointSource, LookupResolver};
use std::time::Instant;
use tracing::{debug, info};

/// Runs one query against an endpoint source
pub struct QueryRunner<'a> {
    /// Where endpoints are opened
    source: &'a dyn EndpointSource,
    /// Cooperative cancellation
    cancel: CancellationFlag,
    /// Run configuration
    config: RunConfig,
}

impl<'a> QueryRunner<'a> {
    /// Create a new runner
    pub fn new(source: &'a dyn EndpointSource, cancel: CancellationFlag) -> Self {
        Self {
            source,
            cancel,
            config: RunConfig::default(),
        }
    }

    /// Set run configuration
    #[must_use]
    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Cancellation flag shared with every iterator of the run
    pub fn cancel_flag(&self) -> &CancellationFlag {
        &self.cancel
    }

    /// Run a query to completion, the sink filling up, or cancellation.
    ///
    /// Pages are fetched strictly one at a time; the next page is requested
    /// only after every record of the current page and its lookups are done.
    pub async fn run(&self, request: &QueryRequest, sink: &mut dyn Sink) -> Result<RunStats> {
        let start = Instant::now();
        let mut stats = RunStats::new();

        info!(
            endpoint = %request.endpoint,
            lookups = request.chain.len(),
            live = self.config.live,
            "Starting query"
        );

        let lookup = build_lookup_query(&request.chain, request.options);
        let resolver =
            LookupResolver::new(self.source, self.cancel.clone()).with_live_mode(self.config.live);
        let record_path = self.source.record_path(&request.endpoint);

        let mut iter = self
            .source
            .open(&request.endpoint, &request.params, &self.cancel)?;
        iter.set_live_mode(self.config.live);

        'pages: while iter.has_next() {
            let Some(document) = iter.next().await? else {
                continue;
            };
            let records = iter
                .transformer()
                .records(&document, record_path.as_deref());
            debug!(
                page = iter.pages_fetched(),
                records = records.len(),
                "Processing page"
            );

            for mut record in records {
                if self.cancel.is_cancelled() {
                    break 'pages;
                }
                if let Some(query) = &lookup {
                    let resolved = resolver
                        .resolve(&mut record, &request.endpoint, query)
                        .await?;
                    stats.lookups.merge(resolved);
                    if self.cancel.is_cancelled() {
                        break 'pages;
                    }
                }

                let status = sink.append(record);
                if status.is_stored() {
                    stats.rows += 1;
                }
                if status.is_full() {
                    stats.capped = true;
                    break 'pages;
                }
            }
        }

        iter.close();
        stats.pages = iter.pages_fetched();
        stats.cancelled = self.cancel.is_cancelled();
        stats.set_duration(start.elapsed().as_millis() as u64);

        info!(
            endpoint = %request.endpoint,
            rows = stats.rows,
            pages = stats.pages,
            lookup_queries = stats.lookups.queries,
            capped = stats.capped,
            cancelled = stats.cancelled,
            "Completed query in {}ms",
            stats.duration_ms
        );

        Ok(stats)
    }
}
