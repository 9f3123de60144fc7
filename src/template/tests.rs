//! Tests for endpoint template module

use super::*;
use crate::error::Error;
use crate::types::StringMap;
use pretty_assertions::assert_eq;
use test_case::test_case;

fn bindings(pairs: &[(&str, &str)]) -> StringMap {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

// ============================================================================
// Parsing Tests
// ============================================================================

#[test]
fn test_parse_path_with_placeholder() {
    let parsed = parse("static/{Parent}/{Child:placeholder}").unwrap();

    assert_eq!(
        parsed.path,
        vec![
            TemplateComponent::literal("static"),
            TemplateComponent::variable("Parent"),
            TemplateComponent::variable("Child").with_default("placeholder"),
        ]
    );
    assert!(parsed.path[1].required);
    assert!(!parsed.path[2].required);
    assert!(parsed.query.is_empty());
}

#[test]
fn test_parse_extension_suffix() {
    let parsed = parse("static/{Parent}/{Child}.json").unwrap();

    assert_eq!(parsed.path.len(), 3);
    let child = &parsed.path[2];
    assert_eq!(child.variable_name.as_deref(), Some("Child"));
    assert!(child.required);
    assert_eq!(child.extension_suffix.as_deref(), Some(".json"));
}

#[test]
fn test_parse_query_components() {
    let parsed = parse("?static=1&var1={First}&var2={Second & Third?,:val1,val2,...}").unwrap();

    assert!(parsed.path.is_empty());
    assert_eq!(
        parsed.query_names().collect::<Vec<_>>(),
        vec!["static", "var1", "var2"]
    );

    let fixed = parsed.query_param("static").unwrap();
    assert_eq!(fixed.literal_text.as_deref(), Some("1"));
    assert!(fixed.required);

    let first = parsed.query_param("var1").unwrap();
    assert_eq!(first.variable_name.as_deref(), Some("First"));
    assert!(first.required);
    assert!(!first.split);

    let second = parsed.query_param("var2").unwrap();
    assert_eq!(second.variable_name.as_deref(), Some("Second & Third"));
    assert!(!second.required);
    assert!(second.split);
    assert_eq!(second.default_value.as_deref(), Some("val1,val2,..."));
}

#[test]
fn test_parse_optional_marker() {
    let parsed = parse("items/{Id?}").unwrap();
    let id = &parsed.path[1];
    assert!(!id.required);
    assert!(id.default_value.is_none());
}

#[test]
fn test_parse_leading_slash_is_ignored() {
    assert_eq!(parse("/users/{Id}").unwrap(), parse("users/{Id}").unwrap());
}

#[test]
fn test_parse_split_flag_without_default() {
    let parsed = parse("search?ids={Ids,}").unwrap();
    let ids = parsed.query_param("ids").unwrap();
    assert!(ids.split);
    assert!(ids.required);
}

#[test]
fn test_parse_flag_only_query_key() {
    let parsed = parse("export?pretty").unwrap();
    assert_eq!(
        parsed.query_param("pretty"),
        Some(&TemplateComponent::literal(""))
    );
}

#[test]
fn test_parse_escapes() {
    let parsed = parse(r"files/{Path\:Part}/a\/b?q={Filter:x\}y}").unwrap();

    assert_eq!(
        parsed.path,
        vec![
            TemplateComponent::literal("files"),
            TemplateComponent::variable("Path:Part"),
            TemplateComponent::literal("a/b"),
        ]
    );
    assert_eq!(
        parsed.query_param("q").unwrap().default_value.as_deref(),
        Some("x}y")
    );
}

#[test]
fn test_parse_is_idempotent() {
    let template = "a/{B}/c?d={E?:f}&g=h";
    assert_eq!(parse(template).unwrap(), parse(template).unwrap());
}

#[test_case("a/{b" ; "unclosed brace")]
#[test_case("a/b}" ; "unmatched close")]
#[test_case("a/{b{c}}" ; "nested brace")]
#[test_case("a/{}" ; "empty name")]
#[test_case("a\\" ; "dangling escape")]
#[test_case("v{Version}" ; "variable not at segment start")]
#[test_case("{A}{B}" ; "two variables in one segment")]
#[test_case("{A?x}" ; "junk after flags")]
#[test_case("?={A}" ; "query without name")]
fn test_parse_malformed(template: &str) {
    let err = parse(template).unwrap_err();
    assert!(matches!(err, Error::TemplateSyntax { .. }), "{err}");
    assert!(err.is_configuration());
}

// ============================================================================
// Serialization Tests
// ============================================================================

#[test_case("static/{Parent}/{Child:placeholder}")]
#[test_case("static/{Parent}/{Child}.json")]
#[test_case("?static=1&var1={First}&var2={Second & Third?,:val1,val2,...}")]
#[test_case(r"files/{Path\:Part}/a\/b?q={Filter:x\}y}")]
#[test_case("search?ids={Ids?,}&fmt=json")]
fn test_display_round_trip(template: &str) {
    let parsed = parse(template).unwrap();
    let serialized = parsed.to_string();
    assert_eq!(parse(&serialized).unwrap(), parsed, "{serialized}");
}

#[test]
fn test_display_form() {
    let parsed = parse("/users/{Id}.json?expand={Expand?}&v=2").unwrap();
    assert_eq!(parsed.to_string(), "users/{Id}.json?expand={Expand?}&v=2");
}

// ============================================================================
// Rendering Tests
// ============================================================================

#[test]
fn test_render_path_and_query() {
    let parsed = parse("orgs/{Org}/repos/{Repo?}?type={Type?:all}&ids={Ids,}&fmt=json").unwrap();

    let rendered = parsed
        .render(&bindings(&[("Org", "acme"), ("Ids", "1, 2,3")]))
        .unwrap();

    assert_eq!(rendered.segments, vec!["orgs", "acme", "repos"]);
    assert_eq!(
        rendered.query,
        vec![
            ("ids".to_string(), "1".to_string()),
            ("ids".to_string(), "2".to_string()),
            ("ids".to_string(), "3".to_string()),
            ("fmt".to_string(), "json".to_string()),
        ]
    );
}

#[test]
fn test_render_suffix() {
    let parsed = parse("items/{Id}.json").unwrap();
    let rendered = parsed.render(&bindings(&[("Id", "42")])).unwrap();
    assert_eq!(rendered.segments, vec!["items", "42.json"]);
}

#[test]
fn test_render_missing_required() {
    let parsed = parse("orgs/{Org}").unwrap();
    let err = parsed.render(&StringMap::new()).unwrap_err();
    assert!(matches!(err, Error::UndefinedVariable { ref variable } if variable == "Org"));
}

#[test]
fn test_render_empty_binding_counts_as_unbound() {
    let parsed = parse("items?q={Q?}").unwrap();
    let rendered = parsed.render(&bindings(&[("Q", "")])).unwrap();
    assert!(rendered.query.is_empty());
}

#[test]
fn test_join_url_encodes_segments() {
    let rendered = RenderedEndpoint {
        segments: vec!["orgs".to_string(), "a b".to_string()],
        query: Vec::new(),
    };

    let url = rendered.join_url("https://api.example.com/v1/").unwrap();
    assert_eq!(url.as_str(), "https://api.example.com/v1/orgs/a%20b");

    let url = rendered.join_url("https://api.example.com").unwrap();
    assert_eq!(url.as_str(), "https://api.example.com/orgs/a%20b");
}

#[test]
fn test_join_url_rejects_non_base() {
    let rendered = RenderedEndpoint::default();
    assert!(rendered.join_url("mailto:someone@example.com").is_err());
}

// ============================================================================
// Cache Tests
// ============================================================================

#[test]
fn test_cache_reuses_parsed_template() {
    let cache = TemplateCache::new();
    assert!(cache.is_empty());

    let first = cache.get_or_parse("a/{B}").unwrap();
    let second = cache.get_or_parse("a/{B}").unwrap();

    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);
    assert!(cache.get_or_parse("a/{B").is_err());
    assert_eq!(cache.len(), 1);
}
