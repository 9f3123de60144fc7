//! Expand marker flattening
//!
//! Lookup results attached with `expand` are wrapped in an expand marker.
//! Flattening turns every marker into one output row per item, with the
//! item's fields as dotted columns prefixed by the lookup name. A marker
//! with `levels == 1` keeps nested objects of its items as values; with
//! `levels == 0` they are flattened into dotted columns as well.
//!
//! A marker without items keeps its parent row once, without item columns.

use crate::lookup::ExpandMarker;
use crate::types::{JsonObject, JsonValue};

/// Flatten every row of a result table
pub fn flatten_rows(rows: &[JsonValue]) -> Vec<JsonValue> {
    rows.iter().flat_map(flatten_row).collect()
}

/// Flatten one row into one or more rows
pub fn flatten_row(row: &JsonValue) -> Vec<JsonValue> {
    match row {
        JsonValue::Object(map) => flatten_object(map, "", false)
            .into_iter()
            .map(JsonValue::Object)
            .collect(),
        other => vec![other.clone()],
    }
}

fn flatten_object(map: &JsonObject, prefix: &str, deep: bool) -> Vec<JsonObject> {
    let mut rows = vec![JsonObject::new()];

    for (key, value) in map {
        let column = join(prefix, key);

        if let Some(marker) = ExpandMarker::from_value(value) {
            let expanded: Vec<JsonObject> = marker
                .items
                .iter()
                .flat_map(|item| flatten_item(item, &column, marker.levels == 0))
                .collect();
            rows = cross(rows, &expanded);
            continue;
        }

        match value {
            JsonValue::Object(nested) if deep => {
                let nested_rows = flatten_object(nested, &column, true);
                rows = cross(rows, &nested_rows);
            }
            _ => {
                for row in &mut rows {
                    row.insert(column.clone(), value.clone());
                }
            }
        }
    }

    rows
}

fn flatten_item(item: &JsonValue, column: &str, deep: bool) -> Vec<JsonObject> {
    match item {
        JsonValue::Object(map) => flatten_object(map, column, deep),
        other => {
            let mut row = JsonObject::new();
            row.insert(column.to_string(), other.clone());
            vec![row]
        }
    }
}

/// Every combination of a left and a right row; no right rows keeps the left
fn cross(left: Vec<JsonObject>, right: &[JsonObject]) -> Vec<JsonObject> {
    if right.is_empty() {
        return left;
    }
    let mut out = Vec::with_capacity(left.len() * right.len());
    for base in &left {
        for extra in right {
            let mut row = base.clone();
            row.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
            out.push(row);
        }
    }
    out
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}
