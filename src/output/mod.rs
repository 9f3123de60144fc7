//! Output module
//!
//! Turns result rows into tables.
//!
//! # Overview
//!
//! This module provides utilities for:
//! - Flattening expand markers into dotted columns
//! - Inferring Arrow schemas from rows and building RecordBatches
//! - Writing Parquet files and JSON lines

mod flatten;
mod schema;
mod writer;

pub use flatten::{flatten_row, flatten_rows};
pub use schema::{infer_schema, json_to_arrow};
pub use writer::{
    write_json_lines, write_parquet, write_table, OutputFormat, ParquetWriterConfig,
};

#[cfg(test)]
mod tests;
