//! Decoder types and traits
//!
//! Defines the parsed document model and the transformer seam used by the
//! pagination engine to read records and pagination scalars.

use super::path;
use crate::error::Result;
use crate::types::JsonValue;
use serde::{Deserialize, Serialize};

/// Format of the response body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// JSON format (default)
    #[default]
    Json,
    /// XML format
    Xml,
}

/// Flavour of a scalar extraction path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Dotted JSON path (`$.meta.total`, `data[0].id`) or full JSONPath
    JsonPath,
    /// XPath subset (`/feed/total`, `//item/@id`, `count(//item)`)
    XPath,
}

/// A parsed response body.
///
/// XML documents are held as a JSON tree: `{root: {child: ..., "@attr": ...}}`,
/// repeated children become arrays and mixed text lives under `#text`.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Source format
    pub format: DocumentFormat,
    /// Document tree
    pub root: JsonValue,
}

impl Document {
    /// Wrap a JSON value
    pub fn json(root: JsonValue) -> Self {
        Self {
            format: DocumentFormat::Json,
            root,
        }
    }

    /// Wrap an XML-derived tree
    pub fn xml(root: JsonValue) -> Self {
        Self {
            format: DocumentFormat::Xml,
            root,
        }
    }
}

/// Turns response bodies into documents and reads values out of them
pub trait ResponseTransformer: Send + Sync {
    /// Format handled by this transformer
    fn format(&self) -> DocumentFormat;

    /// Parse a body; `None` for an empty body
    fn parse(&self, body: &[u8]) -> Result<Option<Document>>;

    /// Read a single value at a path; `None` when absent
    fn extract_scalar(&self, document: &Document, path: &str, kind: PathKind) -> Option<JsonValue> {
        path::extract_scalar(&document.root, path, kind)
    }

    /// Records of a page at a record path (whole document when unset)
    fn records(&self, document: &Document, record_path: Option<&str>) -> Vec<JsonValue>;
}
