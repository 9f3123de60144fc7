//! Tests for output module

use super::*;
use crate::lookup::ExpandMarker;
use arrow::array::{Array, Float64Array, Int64Array, ListArray, StringArray, StructArray};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::fs::File;
use tempfile::tempdir;
use test_case::test_case;

fn marker(levels: u32, items: Vec<Value>) -> Value {
    ExpandMarker::new(levels, items).into_value()
}

// ============================================================================
// Flatten Tests
// ============================================================================

#[test]
fn test_flatten_plain_row_unchanged() {
    let row = json!({"id": 1, "owner": {"login": "ann"}, "tasks": [{"id": 10}]});
    assert_eq!(flatten_row(&row), vec![row.clone()]);
    assert_eq!(flatten_row(&json!(5)), vec![json!(5)]);
}

#[test]
fn test_flatten_full_levels() {
    let row = json!({
        "id": 1,
        "tasks": marker(0, vec![
            json!({"id": 10, "meta": {"x": 1}}),
            json!({"id": 11, "meta": {"x": 2}}),
        ])
    });

    assert_eq!(
        flatten_row(&row),
        vec![
            json!({"id": 1, "tasks.id": 10, "tasks.meta.x": 1}),
            json!({"id": 1, "tasks.id": 11, "tasks.meta.x": 2}),
        ]
    );
}

#[test]
fn test_flatten_top_level_only() {
    let row = json!({
        "id": 1,
        "tasks": marker(1, vec![json!({"id": 10, "meta": {"x": 1}})])
    });

    assert_eq!(
        flatten_row(&row),
        vec![json!({"id": 1, "tasks.id": 10, "tasks.meta": {"x": 1}})]
    );
}

#[test]
fn test_flatten_empty_marker_keeps_row() {
    let row = json!({"id": 1, "tasks": marker(0, vec![])});
    assert_eq!(flatten_row(&row), vec![json!({"id": 1})]);
}

#[test]
fn test_flatten_nested_markers() {
    let row = json!({
        "id": 1,
        "tasks": marker(0, vec![
            json!({"id": 10, "comments": marker(1, vec![json!({"text": "a"}), json!({"text": "b"})])}),
            json!({"id": 11, "comments": marker(1, vec![])}),
        ])
    });

    assert_eq!(
        flatten_row(&row),
        vec![
            json!({"id": 1, "tasks.id": 10, "tasks.comments.text": "a"}),
            json!({"id": 1, "tasks.id": 10, "tasks.comments.text": "b"}),
            json!({"id": 1, "tasks.id": 11}),
        ]
    );
}

#[test]
fn test_flatten_scalar_items_and_rows() {
    let rows = vec![
        json!({"id": 1, "tags": marker(0, vec![json!("a"), json!("b")])}),
        json!({"id": 2}),
    ];

    assert_eq!(
        flatten_rows(&rows),
        vec![
            json!({"id": 1, "tags": "a"}),
            json!({"id": 1, "tags": "b"}),
            json!({"id": 2}),
        ]
    );
}

// ============================================================================
// Schema Tests
// ============================================================================

#[test]
fn test_infer_schema_keeps_column_order() {
    let rows = vec![json!({"zeta": 1}), json!({"alpha": "a"}), json!({"zeta": 2, "mid": true})];
    let schema = infer_schema(&rows);

    let names: Vec<_> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    assert!(schema.fields().iter().all(|f| f.is_nullable()));
}

#[test_case(json!(1), json!(2), DataType::Int64 ; "ints")]
#[test_case(json!(1), json!(2.5), DataType::Float64 ; "mixed numbers")]
#[test_case(json!(null), json!("x"), DataType::Utf8 ; "null widens")]
#[test_case(json!(true), json!("x"), DataType::Utf8 ; "conflict to string")]
#[test_case(json!({}), json!({}), DataType::Utf8 ; "empty object")]
#[test_case(json!(null), json!(null), DataType::Null ; "all null")]
fn test_infer_column_type(a: Value, b: Value, expected: DataType) {
    let schema = infer_schema(&[json!({ "v": a }), json!({ "v": b })]);
    assert_eq!(schema.field_with_name("v").unwrap().data_type(), &expected);
}

#[test]
fn test_infer_list_element_type() {
    let schema = infer_schema(&[json!({"v": [1, 2]}), json!({"v": [1.5]})]);
    match schema.field_with_name("v").unwrap().data_type() {
        DataType::List(item) => assert_eq!(item.data_type(), &DataType::Float64),
        other => panic!("unexpected type {other}"),
    }
}

#[test]
fn test_json_to_arrow() {
    let rows = vec![
        json!({"id": 1, "score": 1.5, "name": "a", "tags": ["x", "y"], "owner": {"login": "ann"}}),
        json!({"id": 2, "score": null, "name": null, "tags": [], "owner": {"login": "bob"}}),
    ];
    let batch = json_to_arrow(&rows, None).unwrap();

    assert_eq!(batch.num_rows(), 2);
    assert_eq!(batch.num_columns(), 5);

    let ids = batch
        .column_by_name("id")
        .unwrap()
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    assert_eq!((ids.value(0), ids.value(1)), (1, 2));

    let scores = batch
        .column_by_name("score")
        .unwrap()
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap();
    assert!(scores.is_null(1));

    let names = batch
        .column_by_name("name")
        .unwrap()
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(names.value(0), "a");
    assert!(names.is_null(1));

    let tags = batch
        .column_by_name("tags")
        .unwrap()
        .as_any()
        .downcast_ref::<ListArray>()
        .unwrap();
    assert_eq!(tags.value_length(0), 2);
    assert_eq!(tags.value_length(1), 0);

    let owner = batch
        .column_by_name("owner")
        .unwrap()
        .as_any()
        .downcast_ref::<StructArray>()
        .unwrap();
    let login = owner
        .column_by_name("login")
        .unwrap()
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(login.value(1), "bob");
}

#[test]
fn test_json_to_arrow_conflicting_values_as_json_text() {
    let rows = vec![json!({"v": 1}), json!({"v": {"a": 1}})];
    let batch = json_to_arrow(&rows, None).unwrap();
    let values = batch
        .column(0)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(values.value(0), "1");
    assert_eq!(values.value(1), r#"{"a":1}"#);
}

#[test]
fn test_json_to_arrow_empty() {
    let batch = json_to_arrow(&[], None).unwrap();
    assert_eq!(batch.num_rows(), 0);
    assert_eq!(batch.num_columns(), 0);
}

// ============================================================================
// Writer Tests
// ============================================================================

#[test_case("out.parquet", OutputFormat::Parquet ; "parquet")]
#[test_case("OUT.PARQUET", OutputFormat::Parquet ; "parquet upper case")]
#[test_case("out.jsonl", OutputFormat::JsonLines ; "json lines")]
#[test_case("out", OutputFormat::JsonLines ; "no extension")]
fn test_output_format_from_path(path: &str, expected: OutputFormat) {
    assert_eq!(OutputFormat::from_path(path), expected);
}

#[test]
fn test_write_parquet_table() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rows.parquet");
    let rows = vec![
        json!({"id": 1, "tasks.id": 10}),
        json!({"id": 1, "tasks.id": 11}),
        json!({"id": 2}),
    ];

    let written = write_table(&path, &rows).unwrap();
    assert_eq!(written, 3);

    let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path).unwrap())
        .unwrap()
        .build()
        .unwrap();
    let total: usize = reader.map(|batch| batch.unwrap().num_rows()).sum();
    assert_eq!(total, 3);
}

#[test]
fn test_write_parquet_with_config() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("small.parquet");
    let batch = json_to_arrow(&[json!({"a": 1}), json!({"a": 2})], None).unwrap();
    let config = ParquetWriterConfig::new()
        .with_compression(parquet::basic::Compression::UNCOMPRESSED)
        .with_row_group_size(1);
    assert_eq!(config.row_group_size(), 1);

    assert_eq!(write_parquet(&path, &batch, &config).unwrap(), 2);

    let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(&path).unwrap()).unwrap();
    assert_eq!(builder.metadata().num_row_groups(), 2);
}

#[test]
fn test_write_parquet_without_columns_fails() {
    let dir = tempdir().unwrap();
    let err = write_table(dir.path().join("empty.parquet"), &[]).unwrap_err();
    assert!(matches!(err, crate::error::Error::Output { .. }));
}

#[test]
fn test_write_json_lines() {
    let mut buffer = Vec::new();
    let rows = vec![json!({"id": 1}), json!({"id": 2, "name": "b"})];

    assert_eq!(write_json_lines(&mut buffer, &rows).unwrap(), 2);
    assert_eq!(
        String::from_utf8(buffer).unwrap(),
        "{\"id\":1}\n{\"id\":2,\"name\":\"b\"}\n"
    );
}

#[test]
fn test_write_json_lines_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rows.jsonl");

    write_table(&path, &[json!({"id": 1})]).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"id\":1}\n");
}
