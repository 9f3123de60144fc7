//! Integration tests using mock HTTP server
//!
//! Tests the full end-to-end flow: YAML connector → paginated requests →
//! nested lookups → flattened rows → Parquet/JSON lines output

use clap::Parser;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use pretty_assertions::assert_eq;
use resttab::cli::{Cli, Runner};
use resttab::engine::{QueryRequest, QueryRunner, TableSink};
use resttab::iterator::CancellationFlag;
use resttab::loader::{load_connector_from_str, Connector};
use resttab::output::{flatten_rows, write_table};
use resttab::StringMap;
use serde_json::{json, Value};
use std::fs::File;
use tempfile::tempdir;
use wiremock::matchers::{body_json, body_partial_json, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TRACKER: &str = r#"
name: tracker
base_url: "{base}"
http: { max_retries: 0, rate_limit_rps: 0 }
headers:
  Accept: application/json
endpoints:
  - name: projects
    template: "orgs/{Org}/projects?state={State?:open}"
    record_path: data
    pagination:
      type: PAGE_COUNT
      page_number: { name: page, kind: QUERY_PARAM }
      total_pages: { name: meta.totalPages, kind: JSON_PATH }
    children:
      - endpoint: tasks
        bind: { Project: id }
  - name: tasks
    template: "projects/{Project}/tasks"
    record_path: items
    pagination:
      type: ITERATION
      offset_write: { name: cursor, kind: QUERY_PARAM }
      offset_read: { name: next_cursor, kind: JSON_PATH }
    children:
      - endpoint: comments
        bind: { Task: id }
  - name: comments
    template: "tasks/{Task}/comments.xml"
    format: xml
    record_path: /comments/comment
queries:
  - name: board
    endpoint: projects
    params: { Org: acme }
    lookups: [tasks, comments]
    expand: true
"#;

fn tracker_yaml(server: &MockServer) -> String {
    TRACKER.replace("{base}", &server.uri())
}

fn tracker(server: &MockServer) -> Connector {
    Connector::new(load_connector_from_str(&tracker_yaml(server)).unwrap()).unwrap()
}

async fn mount_tracker(server: &MockServer) {
    for page in 1..=2 {
        Mock::given(method("GET"))
            .and(path("/orgs/acme/projects"))
            .and(query_param("page", page.to_string()))
            .and(query_param_is_missing("state"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "meta": {"totalPages": 2},
                "data": [{"id": page, "name": format!("project-{page}")}]
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/projects/1/tasks"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": 10}],
            "next_cursor": "c2"
        })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/1/tasks"))
        .and(query_param("cursor", "c2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [{"id": 11}]})))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/2/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/tasks/10/comments.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<comments><comment id="c1"><text>looks good</text></comment></comments>"#,
        ))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tasks/11/comments.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<comments/>"))
        .mount(server)
        .await;
}

async fn run_board(connector: &Connector) -> (Vec<Value>, resttab::engine::RunStats) {
    let definition = connector.definition().query("board").unwrap();
    let request = QueryRequest::from_definition(definition).unwrap();

    let mut sink = TableSink::new();
    let stats = QueryRunner::new(connector, CancellationFlag::new())
        .run(&request, &mut sink)
        .await
        .unwrap();
    (sink.into_rows(), stats)
}

// ============================================================================
// End-to-End Query Tests
// ============================================================================

#[tokio::test]
async fn test_nested_lookups_flatten_into_rows() {
    let server = MockServer::start().await;
    mount_tracker(&server).await;
    let connector = tracker(&server);

    let (rows, stats) = run_board(&connector).await;

    assert_eq!(rows.len(), 2);
    assert_eq!(stats.rows, 2);
    assert_eq!(stats.pages, 2);
    assert_eq!(stats.lookups.queries, 4);
    assert_eq!(stats.lookups.records, 3);
    assert!(!stats.capped);

    assert_eq!(
        flatten_rows(&rows),
        vec![
            json!({
                "id": 1,
                "name": "project-1",
                "tasks.id": 10,
                "tasks.comments.@id": "c1",
                "tasks.comments.text": "looks good"
            }),
            json!({"id": 1, "name": "project-1", "tasks.id": 11}),
            json!({"id": 2, "name": "project-2"}),
        ]
    );
}

#[tokio::test]
async fn test_nested_lookups_to_parquet() {
    let server = MockServer::start().await;
    mount_tracker(&server).await;
    let connector = tracker(&server);
    let (rows, _) = run_board(&connector).await;

    let dir = tempdir().unwrap();
    let file = dir.path().join("board.parquet");
    assert_eq!(write_table(&file, &flatten_rows(&rows)).unwrap(), 3);

    let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&file).unwrap()).unwrap();
    let schema = reader.schema().clone();
    let names: Vec<_> = schema.fields().iter().map(|f| f.name().clone()).collect();
    assert_eq!(
        names,
        vec!["id", "name", "tasks.comments.@id", "tasks.comments.text", "tasks.id"]
    );

    let total: usize = reader.build().unwrap().map(|b| b.unwrap().num_rows()).sum();
    assert_eq!(total, 3);
}

#[tokio::test]
async fn test_cli_run_writes_json_lines() {
    let server = MockServer::start().await;
    mount_tracker(&server).await;

    let dir = tempdir().unwrap();
    let connector_file = dir.path().join("tracker.yaml");
    std::fs::write(&connector_file, tracker_yaml(&server)).unwrap();
    let output = dir.path().join("board.jsonl");

    let cli = Cli::try_parse_from([
        "resttab",
        "-c",
        connector_file.to_str().unwrap(),
        "run",
        "-q",
        "board",
        "-o",
        output.to_str().unwrap(),
    ])
    .unwrap();
    Runner::new(cli).run().await.unwrap();

    let lines: Vec<Value> = std::fs::read_to_string(&output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["tasks.comments.text"], json!("looks good"));
    assert_eq!(lines[2], json!({"id": 2, "name": "project-2"}));
}

#[tokio::test]
async fn test_cli_missing_query_fails() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let connector_file = dir.path().join("tracker.yaml");
    std::fs::write(&connector_file, tracker_yaml(&server)).unwrap();

    let cli = Cli::try_parse_from([
        "resttab",
        "-c",
        connector_file.to_str().unwrap(),
        "run",
        "-q",
        "nope",
    ])
    .unwrap();
    let err = Runner::new(cli).run().await.unwrap_err();
    assert!(err.is_configuration());
}

// ============================================================================
// Pagination Tests
// ============================================================================

fn single_endpoint(server: &MockServer, endpoint: &str) -> Connector {
    let yaml = format!(
        "name: single\nbase_url: \"{}\"\nhttp: {{ max_retries: 0, rate_limit_rps: 0 }}\nendpoints:\n{}",
        server.uri(),
        endpoint
    );
    Connector::new(load_connector_from_str(&yaml).unwrap()).unwrap()
}

async fn collect(connector: &Connector, endpoint: &str) -> (Vec<Value>, u32) {
    let mut sink = TableSink::new();
    let stats = QueryRunner::new(connector, CancellationFlag::new())
        .run(&QueryRequest::new(endpoint), &mut sink)
        .await
        .unwrap();
    (sink.into_rows(), stats.pages)
}

#[tokio::test]
async fn test_page_count_fetches_every_page() {
    let server = MockServer::start().await;
    for page in 1..=3 {
        Mock::given(method("GET"))
            .and(path("/reports"))
            .and(query_param("page", page.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "totalPages": 3,
                "rows": [{"page": page}]
            })))
            .expect(1)
            .mount(&server)
            .await;
    }
    let connector = single_endpoint(
        &server,
        r"
  - name: reports
    template: reports
    record_path: rows
    pagination:
      type: PAGE_COUNT
      page_number: { name: page, kind: QUERY_PARAM }
      total_pages: { name: totalPages, kind: JSON_PATH }
",
    );

    let endpoint = connector.endpoint("reports").unwrap();
    let mut iter = connector
        .open_endpoint(endpoint, &StringMap::new(), &CancellationFlag::new())
        .unwrap();
    let mut pages = Vec::new();
    while iter.has_next() {
        if let Some(doc) = iter.next().await.unwrap() {
            pages.push(doc.root["rows"][0]["page"].clone());
        }
    }
    iter.close();

    assert_eq!(pages, vec![json!(1), json!(2), json!(3)]);
    assert_eq!(iter.pages_fetched(), 3);
}

#[tokio::test]
async fn test_iteration_writes_offset_into_post_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_json(json!({"filter": {"state": "open"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": [{"id": "a"}],
            "next": 2
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_json(json!({"filter": {"state": "open"}, "paging": {"offset": 2}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": [{"id": "b"}],
            "next": 3
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_partial_json(json!({"paging": {"offset": 3}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hits": [{"id": "c"}]})))
        .expect(1)
        .mount(&server)
        .await;

    let connector = single_endpoint(
        &server,
        r"
  - name: search
    template: search
    method: POST
    body: { filter: { state: open } }
    record_path: hits
    pagination:
      type: ITERATION
      offset_write: { name: paging.offset, kind: JSON_PATH }
      offset_read: { name: next, kind: JSON_PATH }
",
    );

    let (rows, pages) = collect(&connector, "search").await;
    assert_eq!(pages, 3);
    assert_eq!(rows, vec![json!({"id": "a"}), json!({"id": "b"}), json!({"id": "c"})]);
}

#[tokio::test]
async fn test_total_count_and_offset() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/events"))
        .and(query_param_is_missing("offset"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 5, "events": [1, 2]})))
        .expect(1)
        .mount(&server)
        .await;
    for (offset, events) in [("2", json!([3, 4])), ("4", json!([5]))] {
        Mock::given(method("GET"))
            .and(path("/events"))
            .and(query_param("offset", offset))
            .and(query_param("limit", "2"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"total": 5, "events": events})),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let connector = single_endpoint(
        &server,
        r"
  - name: events
    template: events
    record_path: events
    pagination:
      type: TOTAL_COUNT_AND_OFFSET
      max_results_per_page: 2
      page_size: { name: limit, kind: QUERY_PARAM }
      offset_write: { name: offset, kind: QUERY_PARAM }
      total_count: { name: total, kind: JSON_PATH }
",
    );

    let (rows, pages) = collect(&connector, "events").await;
    assert_eq!(pages, 3);
    assert_eq!(rows, (1..=5).map(|i| json!(i)).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_link_iteration_follows_relative_links() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/commits"))
        .and(query_param_is_missing("page"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Link", r#"<commits?page=2>; rel="next", </v1/commits?page=9>; rel="last""#)
                .set_body_json(json!([{"sha": "a1"}])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/commits"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Link", r#"</v1/commits?page=9>; rel="last""#)
                .set_body_json(json!([{"sha": "b2"}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let connector = single_endpoint(
        &server,
        r"
  - name: commits
    template: v1/commits
    pagination:
      type: LINK_ITERATION
      link_relation: { name: next, kind: LINK_HEADER_RELATION }
",
    );

    let (rows, pages) = collect(&connector, "commits").await;
    assert_eq!(pages, 2);
    assert_eq!(rows, vec![json!({"sha": "a1"}), json!({"sha": "b2"})]);
}

#[tokio::test]
async fn test_xml_total_count_and_page() {
    let server = MockServer::start().await;
    let pages = [
        r#"<feed><total>3</total><item id="1"/><item id="2"/></feed>"#,
        r#"<feed><total>3</total><item id="3"/></feed>"#,
    ];
    for (page, body) in pages.iter().enumerate() {
        Mock::given(method("GET"))
            .and(path("/feed"))
            .and(query_param("p", (page + 1).to_string()))
            .and(query_param("size", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_string(*body))
            .expect(1)
            .mount(&server)
            .await;
    }

    let connector = single_endpoint(
        &server,
        r"
  - name: feed
    template: feed
    format: xml
    record_path: /feed/item
    pagination:
      type: TOTAL_COUNT_AND_PAGE
      max_results_per_page: 2
      page_number: { name: p, kind: QUERY_PARAM }
      page_size: { name: size, kind: QUERY_PARAM }
      total_count: { name: /feed/total, kind: XPATH }
",
    );

    let (rows, pages) = collect(&connector, "feed").await;
    assert_eq!(pages, 2);
    assert_eq!(
        rows,
        vec![json!({"@id": "1"}), json!({"@id": "2"}), json!({"@id": "3"})]
    );
}

#[tokio::test]
async fn test_fetch_error_fails_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .mount(&server)
        .await;

    let connector = single_endpoint(&server, "\n  - name: broken\n    template: broken\n");
    let mut sink = TableSink::new();
    let err = QueryRunner::new(&connector, CancellationFlag::new())
        .run(&QueryRequest::new("broken"), &mut sink)
        .await
        .unwrap_err();

    assert!(err.is_fetch(), "{err}");
    assert!(sink.is_empty());
}
