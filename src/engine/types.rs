//! Engine types
//!
//! Sinks, run configuration and statistics for the query runner.

use crate::error::Result;
use crate::loader::QueryDefinition;
use crate::lookup::{LookupChain, LookupOptions, LookupStats};
use crate::types::{JsonValue, StringMap};

// ============================================================================
// Sinks
// ============================================================================

/// Outcome of appending a row to a [`Sink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkStatus {
    /// Row stored, more rows fit
    Ready,
    /// Row stored, the sink is now full
    Full,
    /// Row dropped, the sink was already full
    Rejected,
}

impl SinkStatus {
    /// Check whether the row was stored
    pub fn is_stored(self) -> bool {
        matches!(self, Self::Ready | Self::Full)
    }

    /// Check whether the runner must stop producing rows
    pub fn is_full(self) -> bool {
        matches!(self, Self::Full | Self::Rejected)
    }
}

/// Destination of top-level result rows
pub trait Sink: Send {
    /// Append one row
    fn append(&mut self, row: JsonValue) -> SinkStatus;
}

/// In-memory table with an optional row cap
#[derive(Debug, Clone, Default)]
pub struct TableSink {
    rows: Vec<JsonValue>,
    max_rows: Option<usize>,
}

impl TableSink {
    /// Create an unbounded table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table holding at most `max_rows` rows
    pub fn with_max_rows(max_rows: usize) -> Self {
        Self {
            rows: Vec::new(),
            max_rows: Some(max_rows),
        }
    }

    /// Row cap, if any
    pub fn max_rows(&self) -> Option<usize> {
        self.max_rows
    }

    /// Stored rows
    pub fn rows(&self) -> &[JsonValue] {
        &self.rows
    }

    /// Take the stored rows
    pub fn into_rows(self) -> Vec<JsonValue> {
        self.rows
    }

    /// Number of stored rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if no row is stored
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Check if the row cap is reached
    pub fn is_full(&self) -> bool {
        self.max_rows.is_some_and(|max| self.rows.len() >= max)
    }
}

impl Sink for TableSink {
    fn append(&mut self, row: JsonValue) -> SinkStatus {
        if self.is_full() {
            return SinkStatus::Rejected;
        }
        self.rows.push(row);
        if self.is_full() {
            SinkStatus::Full
        } else {
            SinkStatus::Ready
        }
    }
}

// ============================================================================
// Query Request
// ============================================================================

/// Root endpoint, bindings and lookup chain of one run
#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    /// Root endpoint name
    pub endpoint: String,
    /// Template bindings of the root endpoint
    pub params: StringMap,
    /// Nested lookups, shallowest first
    pub chain: LookupChain,
    /// Flags applied to the deepest lookup
    pub options: LookupOptions,
}

impl QueryRequest {
    /// Create a request for a root endpoint without lookups
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Bind a template variable
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Set the lookup chain
    #[must_use]
    pub fn with_chain(mut self, chain: LookupChain) -> Self {
        self.chain = chain;
        self
    }

    /// Set the deepest lookup flags
    #[must_use]
    pub fn with_options(mut self, options: LookupOptions) -> Self {
        self.options = options;
        self
    }

    /// Build a request from a named query
    pub fn from_definition(query: &QueryDefinition) -> Result<Self> {
        Ok(Self {
            endpoint: query.endpoint.clone(),
            params: query
                .params
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            chain: LookupChain::from_names(query.lookups.iter().map(String::as_str))?,
            options: LookupOptions {
                expand: query.expand,
                top_level_only: query.top_level_only,
            },
        })
    }
}

// ============================================================================
// Run Configuration
// ============================================================================

/// Configuration of a query run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Fetch every page; preview runs fetch only the first page per query
    pub live: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { live: true }
    }
}

impl RunConfig {
    /// Create a live run config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set live mode
    #[must_use]
    pub fn with_live_mode(mut self, live: bool) -> Self {
        self.live = live;
        self
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Statistics from a query run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Rows stored in the sink
    pub rows: usize,
    /// Pages fetched by the root iterator
    pub pages: u32,
    /// Nested lookup statistics
    pub lookups: LookupStats,
    /// The sink filled up before the data ran out
    pub capped: bool,
    /// The run was cancelled
    pub cancelled: bool,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl RunStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}
