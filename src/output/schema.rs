//! Arrow schema inference and row to Arrow conversion
//!
//! Columns keep the order in which they first appear in the rows, so a
//! flattened table reads left to right like its source records.

use crate::error::{Error, Result};
use crate::types::JsonValue;
use arrow::array::{
    ArrayRef, BooleanArray, Float64Array, Int64Array, ListArray, NullArray, StringArray,
    StructArray,
};
use arrow::buffer::OffsetBuffer;
use arrow::datatypes::{DataType, Field, Fields, Schema};
use arrow::record_batch::RecordBatch;
use std::collections::HashMap;
use std::sync::Arc;

/// Infer an Arrow schema from result rows.
///
/// Every column is nullable. Conflicting types widen to Float64 for mixed
/// numbers and to Utf8 otherwise.
pub fn infer_schema(rows: &[JsonValue]) -> Schema {
    let mut order: Vec<String> = Vec::new();
    let mut types: HashMap<String, DataType> = HashMap::new();

    for row in rows {
        let JsonValue::Object(obj) = row else {
            continue;
        };
        for (key, value) in obj {
            let inferred = infer_type(value);
            match types.get_mut(key) {
                Some(existing) => *existing = merge_types(existing, &inferred),
                None => {
                    order.push(key.clone());
                    types.insert(key.clone(), inferred);
                }
            }
        }
    }

    let fields: Vec<Field> = order
        .into_iter()
        .map(|name| {
            let dtype = types.remove(&name).unwrap_or(DataType::Null);
            Field::new(name, dtype, true)
        })
        .collect();
    Schema::new(fields)
}

/// Convert rows to a RecordBatch, inferring the schema unless one is given
pub fn json_to_arrow(rows: &[JsonValue], schema: Option<&Schema>) -> Result<RecordBatch> {
    let schema = match schema {
        Some(schema) => schema.clone(),
        None => infer_schema(rows),
    };
    let schema = Arc::new(schema);

    if rows.is_empty() || schema.fields().is_empty() {
        return Ok(RecordBatch::new_empty(schema));
    }

    let columns = schema
        .fields()
        .iter()
        .map(|field| {
            let values: Vec<Option<&JsonValue>> = rows
                .iter()
                .map(|row| row.as_object().and_then(|obj| obj.get(field.name())))
                .collect();
            build_array(&values, field.data_type())
        })
        .collect::<Result<Vec<ArrayRef>>>()?;

    RecordBatch::try_new(schema, columns)
        .map_err(|e| Error::output(format!("Failed to create RecordBatch: {e}")))
}

fn infer_type(value: &JsonValue) -> DataType {
    match value {
        JsonValue::Null => DataType::Null,
        JsonValue::Bool(_) => DataType::Boolean,
        JsonValue::Number(n) if n.is_i64() => DataType::Int64,
        JsonValue::Number(_) => DataType::Float64,
        JsonValue::String(_) => DataType::Utf8,
        JsonValue::Array(items) => {
            let element = items
                .iter()
                .filter(|v| !v.is_null())
                .map(infer_type)
                .reduce(|a, b| merge_types(&a, &b))
                .unwrap_or(DataType::Null);
            DataType::List(Arc::new(Field::new("item", element, true)))
        }
        // Arrow structs need at least one child
        JsonValue::Object(obj) if obj.is_empty() => DataType::Utf8,
        JsonValue::Object(obj) => {
            let fields: Vec<Field> = obj
                .iter()
                .map(|(k, v)| Field::new(k, infer_type(v), true))
                .collect();
            DataType::Struct(Fields::from(fields))
        }
    }
}

fn merge_types(a: &DataType, b: &DataType) -> DataType {
    match (a, b) {
        (a, b) if a == b => a.clone(),
        (DataType::Null, other) | (other, DataType::Null) => other.clone(),
        (DataType::Int64, DataType::Float64) | (DataType::Float64, DataType::Int64) => {
            DataType::Float64
        }
        (DataType::List(x), DataType::List(y)) => DataType::List(Arc::new(Field::new(
            "item",
            merge_types(x.data_type(), y.data_type()),
            true,
        ))),
        _ => DataType::Utf8,
    }
}

fn build_array(values: &[Option<&JsonValue>], data_type: &DataType) -> Result<ArrayRef> {
    let array: ArrayRef = match data_type {
        DataType::Null => Arc::new(NullArray::new(values.len())),
        DataType::Boolean => Arc::new(
            values
                .iter()
                .map(|v| v.and_then(JsonValue::as_bool))
                .collect::<BooleanArray>(),
        ),
        DataType::Int64 => Arc::new(
            values
                .iter()
                .map(|v| v.and_then(JsonValue::as_i64))
                .collect::<Int64Array>(),
        ),
        DataType::Float64 => Arc::new(
            values
                .iter()
                .map(|v| v.and_then(JsonValue::as_f64))
                .collect::<Float64Array>(),
        ),
        DataType::List(field) => build_list_array(values, field)?,
        DataType::Struct(fields) => build_struct_array(values, fields)?,
        _ => Arc::new(
            values
                .iter()
                .map(|v| match v {
                    None | Some(JsonValue::Null) => None,
                    Some(JsonValue::String(s)) => Some(s.clone()),
                    Some(other) => Some(other.to_string()),
                })
                .collect::<StringArray>(),
        ),
    };
    Ok(array)
}

fn build_list_array(values: &[Option<&JsonValue>], field: &Arc<Field>) -> Result<ArrayRef> {
    let mut items: Vec<Option<&JsonValue>> = Vec::new();
    let mut offsets: Vec<i32> = vec![0];

    for value in values {
        if let Some(JsonValue::Array(array)) = value {
            items.extend(array.iter().map(Some));
        }
        let offset = i32::try_from(items.len())
            .map_err(|_| Error::output("List column too large for i32 offsets"))?;
        offsets.push(offset);
    }

    let child = build_array(&items, field.data_type())?;
    let list = ListArray::try_new(
        Arc::clone(field),
        OffsetBuffer::new(offsets.into()),
        child,
        None,
    )?;
    Ok(Arc::new(list))
}

fn build_struct_array(values: &[Option<&JsonValue>], fields: &Fields) -> Result<ArrayRef> {
    let children = fields
        .iter()
        .map(|field| {
            let child: Vec<Option<&JsonValue>> = values
                .iter()
                .map(|v| v.and_then(|v| v.as_object()).and_then(|o| o.get(field.name())))
                .collect();
            build_array(&child, field.data_type())
        })
        .collect::<Result<Vec<ArrayRef>>>()?;

    Ok(Arc::new(StructArray::try_new(fields.clone(), children, None)?))
}
