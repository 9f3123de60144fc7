//! # resttab
//!
//! Turns paginated REST endpoints into tables.
//!
//! ## Features
//!
//! - **Endpoint Templates**: `orgs/{Org}/repos?type={Type?:all}` parsed once,
//!   rendered per request and serialized back unchanged
//! - **Pagination**: Seven conventions, from page counts to `Link` headers
//! - **Nested Lookups**: Child endpoints joined onto each record, up to five
//!   levels deep
//! - **Arrow Output**: Flattened rows as Arrow RecordBatches, Parquet or JSON lines
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use resttab::engine::{QueryRequest, QueryRunner, TableSink};
//! use resttab::iterator::CancellationFlag;
//! use resttab::loader::{load_connector, Connector};
//!
//! #[tokio::main]
//! async fn main() -> resttab::Result<()> {
//!     let connector = Connector::new(load_connector("tracker.yaml")?)?;
//!     let request = QueryRequest::new("projects").param("Org", "acme");
//!
//!     let mut sink = TableSink::with_max_rows(1000);
//!     QueryRunner::new(&connector, CancellationFlag::new())
//!         .run(&request, &mut sink)
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  QueryRunner: root DataIterator → records → LookupResolver → Sink│
//! └──────────────────────────────────────────────────────────────────┘
//!                                 │
//! ┌──────────┬────────────┬───────┴──────┬────────────┬─────────────┐
//! │ Template │ Pagination │   Iterator   │   Decode   │   Output    │
//! ├──────────┼────────────┼──────────────┼────────────┼─────────────┤
//! │ Parse    │ Page count │ has_next     │ JSON       │ Flatten     │
//! │ Render   │ Offsets    │ next         │ XML        │ Arrow       │
//! │ Display  │ Link header│ Cancellation │ Paths      │ Parquet     │
//! └──────────┴────────────┴──────────────┴────────────┴─────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Endpoint template grammar
pub mod template;

/// HTTP transport with retry and rate limiting
pub mod http;

/// Response documents and path extraction (JSON, XML)
pub mod decode;

/// Pagination strategies
pub mod pagination;

/// Sequential page iteration
pub mod iterator;

/// Nested lookup resolution
pub mod lookup;

/// YAML connector definitions
pub mod loader;

/// Query execution
pub mod engine;

/// Flattening and Arrow/Parquet output
pub mod output;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use engine::{QueryRequest, QueryRunner, TableSink};
pub use iterator::{CancellationFlag, DataIterator};
pub use loader::{load_connector, load_connector_from_str, Connector, ConnectorDefinition};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
