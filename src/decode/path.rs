//! Path evaluation over document trees
//!
//! JSON paths use a fast dotted form (`meta.total`, `data[-1].id`) and fall
//! back to `jsonpath-rust` for wildcards, recursive descent and filters.
//! XPath supports the subset pagination configs need: child and descendant
//! steps, `*`, `@attr`, `text()`, numeric positions and `count(...)`.

use super::types::PathKind;
use crate::types::JsonValue;
use tracing::debug;

/// Read a single value at a path
pub fn extract_scalar(root: &JsonValue, path: &str, kind: PathKind) -> Option<JsonValue> {
    match kind {
        PathKind::JsonPath => json_nodes(root, path).into_iter().next(),
        PathKind::XPath => xpath_scalar(root, path),
    }
}

// ============================================================================
// JSON paths
// ============================================================================

/// Check whether a JSON path needs the full JSONPath engine
fn is_complex(path: &str) -> bool {
    path.contains('*') || path.contains("..") || path.contains("?(")
}

/// Nodes selected by a JSON path
pub fn json_nodes(root: &JsonValue, path: &str) -> Vec<JsonValue> {
    let path = path.trim();
    if is_complex(path) {
        return extract_with_jsonpath(root, path);
    }
    extract_simple_path(root, path).into_iter().collect()
}

/// Extract a value using simple dot-notation path
pub(crate) fn extract_simple_path(value: &JsonValue, path: &str) -> Option<JsonValue> {
    let path = path.strip_prefix('$').unwrap_or(path);
    let path = path.strip_prefix('.').unwrap_or(path);
    if path.is_empty() {
        return Some(value.clone());
    }

    let mut current = value;
    for part in path.split('.') {
        let (name, index) = match part.find('[') {
            Some(bracket) if part.ends_with(']') => {
                (&part[..bracket], Some(&part[bracket + 1..part.len() - 1]))
            }
            _ => (part, None),
        };

        if !name.is_empty() {
            current = current.get(name)?;
        }

        if let Some(index) = index {
            let index: i64 = index.trim().parse().ok()?;
            let JsonValue::Array(items) = current else {
                return None;
            };
            #[allow(clippy::cast_possible_wrap)]
            let idx = if index < 0 {
                items.len() as i64 + index
            } else {
                index
            };
            current = items.get(usize::try_from(idx).ok()?)?;
        }
    }

    Some(current.clone())
}

/// Extract nodes using jsonpath-rust
fn extract_with_jsonpath(value: &JsonValue, path: &str) -> Vec<JsonValue> {
    use jsonpath_rust::JsonPath;

    let jp = match JsonPath::try_from(path) {
        Ok(jp) => jp,
        Err(e) => {
            debug!("Invalid JSONPath '{path}': {e}");
            return Vec::new();
        }
    };

    match jp.find(value) {
        JsonValue::Array(nodes) => nodes,
        JsonValue::Null => Vec::new(),
        other => vec![other],
    }
}

// ============================================================================
// XPath subset
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Step {
    Child { name: String, position: Option<usize> },
    Descendant { name: String, position: Option<usize> },
    Attribute(String),
    Text,
    Current,
    Unsupported,
}

fn parse_step(token: &str, descendant: bool) -> Step {
    if token == "." {
        return Step::Current;
    }
    if token == "text()" {
        return Step::Text;
    }
    if let Some(attr) = token.strip_prefix('@') {
        return Step::Attribute(attr.to_string());
    }

    let (name, position) = match token.find('[') {
        Some(bracket) if token.ends_with(']') => {
            match token[bracket + 1..token.len() - 1].trim().parse::<usize>() {
                Ok(pos) if pos > 0 => (&token[..bracket], Some(pos)),
                _ => return Step::Unsupported,
            }
        }
        Some(_) => return Step::Unsupported,
        None => (token, None),
    };

    let name = name.to_string();
    if descendant {
        Step::Descendant { name, position }
    } else {
        Step::Child { name, position }
    }
}

fn parse_xpath(path: &str) -> Vec<Step> {
    let mut steps = Vec::new();
    let mut rest = path.trim();

    while !rest.is_empty() {
        let descendant = if let Some(r) = rest.strip_prefix("//") {
            rest = r;
            true
        } else if let Some(r) = rest.strip_prefix('/') {
            rest = r;
            false
        } else {
            false
        };

        let end = rest.find('/').unwrap_or(rest.len());
        let token = &rest[..end];
        rest = &rest[end..];
        if !token.is_empty() {
            steps.push(parse_step(token, descendant));
        }
    }

    steps
}

/// Expand arrays so each repeated element is its own node
fn push_node<'a>(value: &'a JsonValue, out: &mut Vec<&'a JsonValue>) {
    match value {
        JsonValue::Array(items) => out.extend(items.iter()),
        other => out.push(other),
    }
}

fn is_element_key(key: &str) -> bool {
    !key.starts_with('@') && !key.starts_with('#')
}

fn children<'a>(node: &'a JsonValue, name: &str, out: &mut Vec<&'a JsonValue>) {
    let JsonValue::Object(map) = node else {
        return;
    };
    if name == "*" {
        for (_, child) in map.iter().filter(|(k, _)| is_element_key(k)) {
            push_node(child, out);
        }
    } else if let Some(child) = map.get(name) {
        push_node(child, out);
    }
}

fn descendants<'a>(node: &'a JsonValue, name: &str, out: &mut Vec<&'a JsonValue>) {
    match node {
        JsonValue::Object(map) => {
            for (key, child) in map.iter().filter(|(k, _)| is_element_key(k)) {
                if name == "*" || key == name {
                    push_node(child, out);
                }
                descendants(child, name, out);
            }
        }
        JsonValue::Array(items) => {
            for item in items {
                descendants(item, name, out);
            }
        }
        _ => {}
    }
}

fn select_position<'a>(nodes: Vec<&'a JsonValue>, position: Option<usize>) -> Vec<&'a JsonValue> {
    match position {
        Some(pos) => nodes.into_iter().nth(pos - 1).into_iter().collect(),
        None => nodes,
    }
}

/// Nodes selected by an XPath expression
pub fn xpath_nodes<'a>(root: &'a JsonValue, path: &str) -> Vec<&'a JsonValue> {
    let mut context = vec![root];

    for step in parse_xpath(path) {
        let mut next = Vec::new();
        match &step {
            Step::Child { name, position } => {
                for &node in &context {
                    children(node, name, &mut next);
                }
                next = select_position(next, *position);
            }
            Step::Descendant { name, position } => {
                for &node in &context {
                    descendants(node, name, &mut next);
                }
                next = select_position(next, *position);
            }
            Step::Attribute(attr) => {
                let key = format!("@{attr}");
                next.extend(context.iter().filter_map(|&node| node.get(key.as_str())));
            }
            Step::Text => {
                for &node in &context {
                    match node {
                        JsonValue::Object(map) => next.extend(map.get("#text")),
                        JsonValue::Array(_) => {}
                        scalar => next.push(scalar),
                    }
                }
            }
            Step::Current => next = context.clone(),
            Step::Unsupported => {
                debug!("Unsupported XPath step in '{path}'");
                return Vec::new();
            }
        }
        context = next;
        if context.is_empty() {
            break;
        }
    }

    context
}

fn xpath_scalar(root: &JsonValue, path: &str) -> Option<JsonValue> {
    let trimmed = path.trim();
    if let Some(inner) = trimmed
        .strip_prefix("count(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return Some(JsonValue::from(xpath_nodes(root, inner).len()));
    }

    let node = xpath_nodes(root, trimmed).into_iter().next()?;
    match node {
        JsonValue::Object(map) if map.contains_key("#text") => map.get("#text").cloned(),
        other => Some(other.clone()),
    }
}
