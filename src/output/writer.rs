//! Table writers
//!
//! Parquet files through the Arrow writer, and JSON lines for anything else.

use super::schema::json_to_arrow;
use crate::error::{Error, Result};
use crate::types::JsonValue;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// File format of a written table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Apache Parquet
    Parquet,
    /// One JSON object per line
    JsonLines,
}

impl OutputFormat {
    /// Pick the format from a file extension; anything but `.parquet` is JSON lines
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("parquet") => Self::Parquet,
            _ => Self::JsonLines,
        }
    }
}

/// Configuration for Parquet writer
#[derive(Debug, Clone)]
pub struct ParquetWriterConfig {
    compression: Compression,
    row_group_size: usize,
}

impl Default for ParquetWriterConfig {
    fn default() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: 1024 * 1024,
        }
    }
}

impl ParquetWriterConfig {
    /// Create a new config with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set compression algorithm
    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Set row group size
    #[must_use]
    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Row group size
    pub fn row_group_size(&self) -> usize {
        self.row_group_size
    }

    fn build_properties(&self) -> WriterProperties {
        WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build()
    }
}

/// Write a RecordBatch to a Parquet file, returning the row count
pub fn write_parquet(
    path: impl AsRef<Path>,
    batch: &RecordBatch,
    config: &ParquetWriterConfig,
) -> Result<usize> {
    let path = path.as_ref();
    let file = File::create(path)
        .map_err(|e| Error::output(format!("Failed to create '{}': {e}", path.display())))?;

    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(config.build_properties()))?;
    writer.write(batch)?;
    writer.close()?;

    debug!(path = %path.display(), rows = batch.num_rows(), "Wrote Parquet file");
    Ok(batch.num_rows())
}

/// Write rows as JSON lines
pub fn write_json_lines<W: Write>(writer: W, rows: &[JsonValue]) -> Result<usize> {
    let mut writer = BufWriter::new(writer);
    for row in rows {
        serde_json::to_writer(&mut writer, row)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(rows.len())
}

/// Write a table to a file in the format its extension names
pub fn write_table(path: impl AsRef<Path>, rows: &[JsonValue]) -> Result<usize> {
    let path = path.as_ref();
    match OutputFormat::from_path(path) {
        OutputFormat::Parquet => {
            let batch = json_to_arrow(rows, None)?;
            if batch.num_columns() == 0 {
                return Err(Error::output("Parquet output needs at least one column"));
            }
            write_parquet(path, &batch, &ParquetWriterConfig::default())
        }
        OutputFormat::JsonLines => {
            let file = File::create(path).map_err(|e| {
                Error::output(format!("Failed to create '{}': {e}", path.display()))
            })?;
            write_json_lines(file, rows)
        }
    }
}
