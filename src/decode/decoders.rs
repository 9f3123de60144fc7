//! Transformer implementations
//!
//! One transformer per response format. Both share the path evaluation in
//! [`super::path`]; XML bodies are first folded into a JSON tree.

use super::path::{json_nodes, xpath_nodes};
use super::types::{Document, DocumentFormat, ResponseTransformer};
use crate::error::{Error, Result};
use crate::types::JsonValue;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::Map;

// ============================================================================
// JSON Transformer
// ============================================================================

/// JSON response transformer
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTransformer;

impl JsonTransformer {
    /// Create a new JSON transformer
    pub fn new() -> Self {
        Self
    }
}

impl ResponseTransformer for JsonTransformer {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Json
    }

    fn parse(&self, body: &[u8]) -> Result<Option<Document>> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        let root: JsonValue = serde_json::from_slice(body)
            .map_err(|e| Error::decode(format!("Failed to parse JSON: {e}")))?;
        Ok(Some(Document::json(root)))
    }

    fn records(&self, document: &Document, record_path: Option<&str>) -> Vec<JsonValue> {
        match record_path {
            Some(path) => {
                let mut nodes = json_nodes(&document.root, path);
                if nodes.len() == 1 && nodes[0].is_array() {
                    match nodes.pop() {
                        Some(JsonValue::Array(items)) => items,
                        _ => Vec::new(),
                    }
                } else {
                    nodes.retain(|node| !node.is_null());
                    nodes
                }
            }
            None => match &document.root {
                JsonValue::Array(items) => items.clone(),
                other => vec![other.clone()],
            },
        }
    }
}

// ============================================================================
// XML Transformer
// ============================================================================

/// XML response transformer
///
/// Elements become objects, attributes become `@name` keys, repeated
/// children become arrays. Text of a leaf element is typed (numbers and
/// booleans); text mixed with child elements lives under `#text`.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlTransformer;

impl XmlTransformer {
    /// Create a new XML transformer
    pub fn new() -> Self {
        Self
    }
}

impl ResponseTransformer for XmlTransformer {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Xml
    }

    fn parse(&self, body: &[u8]) -> Result<Option<Document>> {
        let text = std::str::from_utf8(body).map_err(|e| Error::XmlParse {
            message: format!("Body is not UTF-8: {e}"),
        })?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        xml_to_json(text).map(|root| Some(Document::xml(root)))
    }

    fn records(&self, document: &Document, record_path: Option<&str>) -> Vec<JsonValue> {
        match record_path {
            Some(path) => xpath_nodes(&document.root, path)
                .into_iter()
                .cloned()
                .collect(),
            None => match document.root.as_object().and_then(|m| m.values().next()) {
                Some(JsonValue::Array(items)) => items.clone(),
                Some(element) => vec![element.clone()],
                None => Vec::new(),
            },
        }
    }
}

/// An element being built
struct Frame {
    name: String,
    children: Map<String, JsonValue>,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).to_string();
        let mut children = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| Error::XmlParse {
                message: format!("Bad attribute on <{name}>: {e}"),
            })?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
            let value = attr.unescape_value().map_err(|e| Error::XmlParse {
                message: format!("Bad attribute value on <{name}>: {e}"),
            })?;
            children.insert(format!("@{key}"), JsonValue::String(value.to_string()));
        }
        Ok(Self {
            name,
            children,
            text: String::new(),
        })
    }

    fn into_value(self) -> (String, JsonValue) {
        let text = self.text.trim();
        let value = if self.children.is_empty() {
            if text.is_empty() {
                JsonValue::Null
            } else {
                parse_text_value(text)
            }
        } else {
            let mut children = self.children;
            if !text.is_empty() {
                children.insert("#text".to_string(), JsonValue::String(text.to_string()));
            }
            JsonValue::Object(children)
        };
        (self.name, value)
    }
}

/// Insert a child, turning repeats into arrays
fn attach(parent: &mut Map<String, JsonValue>, name: String, value: JsonValue) {
    match parent.get_mut(&name) {
        Some(JsonValue::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = JsonValue::Array(vec![first, value]);
        }
        None => {
            parent.insert(name, value);
        }
    }
}

fn xml_to_json(xml: &str) -> Result<JsonValue> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<(String, JsonValue)> = None;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| Error::XmlParse {
            message: format!("At byte {}: {e}", reader.buffer_position()),
        })?;
        match event {
            Event::Start(e) => stack.push(Frame::open(&e)?),
            Event::Empty(e) => {
                let (name, value) = Frame::open(&e)?.into_value();
                match stack.last_mut() {
                    Some(parent) => attach(&mut parent.children, name, value),
                    None => root = Some((name, value)),
                }
            }
            Event::Text(t) => {
                if let Some(frame) = stack.last_mut() {
                    let text = t.unescape().map_err(|e| Error::XmlParse {
                        message: format!("Bad text in <{}>: {e}", frame.name),
                    })?;
                    frame.text.push_str(&text);
                }
            }
            Event::CData(c) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(_) => {
                let frame = stack.pop().ok_or_else(|| Error::XmlParse {
                    message: "Unexpected closing tag".to_string(),
                })?;
                let (name, value) = frame.into_value();
                match stack.last_mut() {
                    Some(parent) => attach(&mut parent.children, name, value),
                    None => root = Some((name, value)),
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(Error::XmlParse {
            message: format!("Missing closing tag for {}", open.name),
        });
    }

    let (name, value) = root.ok_or_else(|| Error::XmlParse {
        message: "Document has no root element".to_string(),
    })?;
    let mut document = Map::new();
    document.insert(name, value);
    Ok(JsonValue::Object(document))
}

/// Parse text content into appropriate JSON value
fn parse_text_value(text: &str) -> JsonValue {
    if let Ok(n) = text.parse::<i64>() {
        return JsonValue::Number(n.into());
    }

    if let Ok(n) = text.parse::<f64>() {
        if let Some(num) = serde_json::Number::from_f64(n) {
            return JsonValue::Number(num);
        }
    }

    match text {
        "true" => JsonValue::Bool(true),
        "false" => JsonValue::Bool(false),
        _ => JsonValue::String(text.to_string()),
    }
}
