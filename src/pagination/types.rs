//! Pagination types
//!
//! Declarative pagination configuration, per-run fetch state, and the view
//! of a fetched page that strategies read their scalars from.

use crate::decode::{Document, PathKind, ResponseTransformer};
use crate::types::JsonValue;
use regex::Regex;
use reqwest::header::{HeaderMap, LINK};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use url::Url;

/// Pagination convention of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaginationType {
    /// Single request
    #[default]
    None,
    /// Page number, stop after a reported page count
    PageCount,
    /// Page number, stop on the first empty page
    Page,
    /// Continuation offset handed back by the server
    Iteration,
    /// Follow `Link` response headers
    LinkIteration,
    /// Offset advanced by page size, stop at a reported total
    TotalCountAndOffset,
    /// Page number, stop at a reported total
    TotalCountAndPage,
}

impl fmt::Display for PaginationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaginationType::None => "NONE",
            PaginationType::PageCount => "PAGE_COUNT",
            PaginationType::Page => "PAGE",
            PaginationType::Iteration => "ITERATION",
            PaginationType::LinkIteration => "LINK_ITERATION",
            PaginationType::TotalCountAndOffset => "TOTAL_COUNT_AND_OFFSET",
            PaginationType::TotalCountAndPage => "TOTAL_COUNT_AND_PAGE",
        };
        f.write_str(name)
    }
}

/// Where a pagination value is read from or written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterKind {
    /// Query string parameter of the request
    #[serde(rename = "QUERY_PARAM")]
    QueryParam,
    /// Dotted JSON path (response document or request body)
    #[serde(rename = "JSON_PATH")]
    JsonPath,
    /// XPath into an XML response document
    #[serde(rename = "XPATH")]
    XPath,
    /// Relation name of a `Link` response header entry
    #[serde(rename = "LINK_HEADER_RELATION")]
    LinkHeaderRelation,
}

impl ParameterKind {
    /// Document path flavour for read roles
    pub fn path_kind(self) -> Option<PathKind> {
        match self {
            ParameterKind::JsonPath => Some(PathKind::JsonPath),
            ParameterKind::XPath => Some(PathKind::XPath),
            ParameterKind::QueryParam | ParameterKind::LinkHeaderRelation => None,
        }
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParameterKind::QueryParam => "QUERY_PARAM",
            ParameterKind::JsonPath => "JSON_PATH",
            ParameterKind::XPath => "XPATH",
            ParameterKind::LinkHeaderRelation => "LINK_HEADER_RELATION",
        };
        f.write_str(name)
    }
}

/// Names a pagination value and where it lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    /// Parameter name, path expression or link relation
    pub name: String,
    /// Location kind
    pub kind: ParameterKind,
}

impl ParameterDescriptor {
    /// Create a descriptor
    pub fn new(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Query parameter descriptor
    pub fn query(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::QueryParam)
    }

    /// JSON path descriptor
    pub fn json_path(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::JsonPath)
    }

    /// XPath descriptor
    pub fn xpath(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::XPath)
    }

    /// Link relation descriptor
    pub fn link_relation(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::LinkHeaderRelation)
    }
}

/// Pagination configuration of one endpoint.
///
/// Only the roles relevant to `pagination_type` may be set; see
/// [`super::PaginationStrategy::from_spec`] for validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PaginationSpec {
    /// Pagination convention
    #[serde(rename = "type", default)]
    pub pagination_type: PaginationType,
    /// Pages are numbered from zero
    #[serde(default)]
    pub zero_based_page_index: bool,
    /// Page size requested and used to advance offsets
    #[serde(default)]
    pub max_results_per_page: u32,
    /// Page number of the first request (defaults to 0 or 1)
    #[serde(default)]
    pub first_page_index: Option<i64>,

    /// Page number written on each request
    #[serde(default)]
    pub page_number: Option<ParameterDescriptor>,
    /// Page size written on each request
    #[serde(default)]
    pub page_size: Option<ParameterDescriptor>,
    /// Total page count read from the first response
    #[serde(default)]
    pub total_pages: Option<ParameterDescriptor>,
    /// Record count read from every response
    #[serde(default)]
    pub record_count: Option<ParameterDescriptor>,
    /// Has-more flag read from every response
    #[serde(default)]
    pub has_next: Option<ParameterDescriptor>,
    /// Continuation offset read from every response
    #[serde(default)]
    pub offset_read: Option<ParameterDescriptor>,
    /// Offset written on follow-up requests
    #[serde(default)]
    pub offset_write: Option<ParameterDescriptor>,
    /// Link header relation to follow
    #[serde(default)]
    pub link_relation: Option<ParameterDescriptor>,
    /// Total record count read from the first response
    #[serde(default)]
    pub total_count: Option<ParameterDescriptor>,
}

impl PaginationSpec {
    /// Create a spec of the given type with no roles set
    pub fn new(pagination_type: PaginationType) -> Self {
        Self {
            pagination_type,
            ..Default::default()
        }
    }

    /// All roles by name
    pub(crate) fn roles(&self) -> [(&'static str, Option<&ParameterDescriptor>); 9] {
        [
            ("page_number", self.page_number.as_ref()),
            ("page_size", self.page_size.as_ref()),
            ("total_pages", self.total_pages.as_ref()),
            ("record_count", self.record_count.as_ref()),
            ("has_next", self.has_next.as_ref()),
            ("offset_read", self.offset_read.as_ref()),
            ("offset_write", self.offset_write.as_ref()),
            ("link_relation", self.link_relation.as_ref()),
            ("total_count", self.total_count.as_ref()),
        ]
    }
}

/// Progress of one paginated run.
///
/// Advances once per successful fetch and is never rolled back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchState {
    /// Page number of the next request
    pub page: i64,
    /// Offset of the next request
    pub offset: u64,
    /// Continuation value read from the last response
    pub cursor: Option<JsonValue>,
    /// URL of the next request
    pub next_url: Option<String>,
    /// Last page number, once known
    pub last_page: Option<i64>,
    /// Total record count, once known
    pub total_count: Option<u64>,
    /// Completed fetches
    pub fetches: u32,
    /// No further request will be made
    pub done: bool,
}

impl FetchState {
    /// Create a state starting at a page number
    pub fn starting_at(page: i64) -> Self {
        Self {
            page,
            ..Default::default()
        }
    }

    /// Mark pagination as complete
    pub fn mark_done(&mut self) {
        self.done = true;
    }
}

/// What a strategy may inspect of a fetched page
#[derive(Clone, Copy)]
pub struct FetchedPage<'a> {
    /// Parsed document, `None` for an empty body
    pub document: Option<&'a Document>,
    /// Response headers
    pub headers: &'a HeaderMap,
    /// URL the page was fetched from
    pub url: &'a str,
    /// Transformer used for scalar extraction
    pub transformer: &'a dyn ResponseTransformer,
}

impl<'a> FetchedPage<'a> {
    /// Read a scalar for a JSON_PATH / XPATH descriptor
    pub fn scalar(&self, descriptor: &ParameterDescriptor) -> Option<JsonValue> {
        let kind = descriptor.kind.path_kind()?;
        let document = self.document?;
        self.transformer
            .extract_scalar(document, &descriptor.name, kind)
    }

    /// URL of the first `Link` entry with the relation, resolved against
    /// the page URL
    pub fn link(&self, relation: &str) -> Option<String> {
        let target = self
            .headers
            .get_all(LINK)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|header| parse_link_header(header, relation))?;

        match Url::parse(self.url).and_then(|base| base.join(&target)) {
            Ok(resolved) => Some(resolved.to_string()),
            Err(_) => Some(target),
        }
    }
}

static LINK_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([^>]*)>((?:\s*;\s*[^;,]+)*)").unwrap());

static REL_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\brel\s*=\s*(?:"([^"]*)"|([^\s;,"]+))"#).unwrap());

/// Parse a Link header (RFC 8288) and extract the URL for a relation.
///
/// `rel` may carry several space separated relations; matching ignores case.
pub fn parse_link_header(header: &str, relation: &str) -> Option<String> {
    LINK_ENTRY.captures_iter(header).find_map(|entry| {
        let url = entry.get(1)?.as_str().trim();
        let params = entry.get(2).map_or("", |m| m.as_str());
        let rel = REL_PARAM.captures(params)?;
        let rels = rel.get(1).or_else(|| rel.get(2))?.as_str();
        rels.split_whitespace()
            .any(|r| r.eq_ignore_ascii_case(relation))
            .then(|| url.to_string())
    })
}

/// Falsy: absent, null, false, 0, empty string, "false", "0", "no"
pub fn is_truthy(value: Option<&JsonValue>) -> bool {
    match value {
        None | Some(JsonValue::Null) => false,
        Some(JsonValue::Bool(b)) => *b,
        Some(JsonValue::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(JsonValue::String(s)) => {
            let s = s.trim();
            !(s.is_empty()
                || s.eq_ignore_ascii_case("false")
                || s == "0"
                || s.eq_ignore_ascii_case("no"))
        }
        Some(JsonValue::Array(a)) => !a.is_empty(),
        Some(JsonValue::Object(o)) => !o.is_empty(),
    }
}

/// Absent, null, empty string/array/object, or zero
pub fn is_empty_scalar(value: Option<&JsonValue>) -> bool {
    match value {
        None | Some(JsonValue::Null) => true,
        Some(JsonValue::String(s)) => {
            let s = s.trim();
            s.is_empty() || s.parse::<f64>().is_ok_and(|f| f == 0.0)
        }
        Some(JsonValue::Number(n)) => n.as_f64().is_some_and(|f| f == 0.0),
        Some(JsonValue::Array(a)) => a.is_empty(),
        Some(JsonValue::Object(o)) => o.is_empty(),
        Some(JsonValue::Bool(_)) => false,
    }
}

/// Integer view of a scalar, accepting numeric strings
pub fn as_integer(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// String form of a scalar for query parameters
pub fn scalar_to_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
