//! Match path evaluation over mutable records
//!
//! Paths are dotted (`$`, `owner`, `items[*]`, `tasks.assignee`, `rows[0]`).
//! Arrays met on the way fan out to every element, and a terminal array
//! yields its elements.

use crate::decode::path::extract_simple_path;
use crate::pagination::scalar_to_string;
use crate::types::{JsonValue, StringMap};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
    All,
}

fn parse_segments(path: &str) -> Option<Vec<Segment>> {
    let path = path.trim();
    let path = path.strip_prefix('$').unwrap_or(path);
    let mut segments = Vec::new();

    for part in path.split('.').filter(|p| !p.is_empty()) {
        let (name, mut rest) = match part.find('[') {
            Some(bracket) => (&part[..bracket], &part[bracket..]),
            None => (part, ""),
        };
        if !name.is_empty() {
            segments.push(Segment::Key(name.to_string()));
        }
        while let Some(inner) = rest.strip_prefix('[') {
            let close = inner.find(']')?;
            let index = inner[..close].trim();
            segments.push(if index == "*" {
                Segment::All
            } else {
                Segment::Index(index.parse().ok()?)
            });
            rest = &inner[close + 1..];
        }
        if !rest.is_empty() {
            return None;
        }
    }
    Some(segments)
}

fn collect<'a>(value: &'a mut JsonValue, segments: &[Segment], out: &mut Vec<&'a mut JsonValue>) {
    let Some((segment, rest)) = segments.split_first() else {
        match value {
            JsonValue::Array(items) => out.extend(items.iter_mut()),
            JsonValue::Null => {}
            other => out.push(other),
        }
        return;
    };

    match (segment, value) {
        (Segment::Index(i), JsonValue::Array(items)) => {
            if let Some(item) = items.get_mut(*i) {
                collect(item, rest, out);
            }
        }
        (Segment::All, JsonValue::Array(items)) => {
            for item in items {
                collect(item, rest, out);
            }
        }
        (Segment::Key(_), JsonValue::Array(items)) => {
            for item in items {
                collect(item, segments, out);
            }
        }
        (Segment::Key(key), JsonValue::Object(map)) => {
            if let Some(child) = map.get_mut(key) {
                collect(child, rest, out);
            }
        }
        _ => {}
    }
}

/// Every entity a match path selects inside a record.
///
/// `None` when the path is malformed.
pub fn match_entities<'a>(record: &'a mut JsonValue, path: &str) -> Option<Vec<&'a mut JsonValue>> {
    let segments = parse_segments(path)?;
    let mut out = Vec::new();
    collect(record, &segments, &mut out);
    Some(out)
}

/// Template bindings read from a matched entity.
///
/// `None` when a bound path is absent or null. Arrays of scalars bind as a
/// comma separated list.
pub fn bind_variables(entity: &JsonValue, bind: &BTreeMap<String, String>) -> Option<StringMap> {
    let mut bindings = StringMap::new();
    for (variable, path) in bind {
        let value = extract_simple_path(entity, path)?;
        let text = match &value {
            JsonValue::Null => return None,
            JsonValue::Array(items) => items
                .iter()
                .map(scalar_to_string)
                .collect::<Vec<_>>()
                .join(","),
            other => scalar_to_string(other),
        };
        bindings.insert(variable.clone(), text);
    }
    Some(bindings)
}
