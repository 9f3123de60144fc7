//! Response document module
//!
//! Supports: JSON, XML
//!
//! # Overview
//!
//! A [`ResponseTransformer`] parses a response body into a [`Document`],
//! reads pagination scalars out of it by JSON path or XPath, and lists the
//! records found at a record path.

mod decoders;
pub mod path;
mod types;

use std::sync::Arc;

pub use decoders::{JsonTransformer, XmlTransformer};
pub use types::{Document, DocumentFormat, PathKind, ResponseTransformer};

/// Default transformer for a document format
pub fn transformer_for(format: DocumentFormat) -> Arc<dyn ResponseTransformer> {
    match format {
        DocumentFormat::Json => Arc::new(JsonTransformer::new()),
        DocumentFormat::Xml => Arc::new(XmlTransformer::new()),
    }
}
