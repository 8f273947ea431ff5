//! Tests for in-memory matching.

use serde_json::{json, Value};

use super::*;
use crate::fixtures::{device_type, parse};

// ==================== Test Helpers ====================

fn matcher(query: &str) -> FilterMatcher {
    FilterMatcher::compile(&parse(query), &device_type(), None).unwrap()
}

fn matcher_ignoring_case(query: &str) -> FilterMatcher {
    FilterMatcher::compile(&parse(query), &device_type(), Some(CaseFolding::Unicode)).unwrap()
}

fn compile_error(query: &str) -> FilterError {
    FilterMatcher::compile(&parse(query), &device_type(), None).unwrap_err()
}

fn matches(query: &str, doc: &Value) -> bool {
    matcher(query).matches(doc).unwrap()
}

fn device() -> Value {
    json!({
        "id": 1,
        "controllerId": "dev-1",
        "name": "Sensor A",
        "description": null,
        "updateStatus": "IN_SYNC",
        "requestAttributes": true,
        "size": 120,
        "rating": 4.5,
        "lastSeen": "2024-03-01T10:00:00Z",
        "address": {"city": "Berlin", "zip": "10115"},
        "assignedDs": {"id": 7, "name": "firmware", "version": "1.2"},
        "tags": [{"id": 1, "name": "y", "colour": "red"}, {"id": 2, "name": "z", "colour": "blue"}],
        "actions": [],
        "aliases": ["alpha", "beta"],
        "attributes": {"hwRevision": "2", "vendor": "acme"}
    })
}

// ==================== Scalar Tests ====================

#[test]
fn test_status_equality_selects_matching_objects() {
    let docs = vec![json!({"name": "closed"}), json!({"name": "open"})];
    let matched = matcher(r#"name == "closed""#).filter(&docs).unwrap();
    assert_eq!(matched, vec![&docs[0]]);
}

#[test]
fn test_not_equal_is_null_safe() {
    assert!(matches("description != x", &device()));
    assert!(matches("description != x", &json!({})));
    assert!(!matches(r#"name != "Sensor A""#, &device()));
}

#[test]
fn test_null_comparisons() {
    assert!(matches("description == null", &device()));
    assert!(!matches("name == null", &device()));
    assert!(matches("name != null", &device()));
}

#[test]
fn test_ordering_on_numbers_is_numeric() {
    assert!(matches("size > 99", &device()));
    assert!(matches("size >= 120", &device()));
    assert!(!matches("size < 120", &device()));
    assert!(matches("rating <= 4.5", &device()));
    assert!(matches("rating > 4", &device()));
}

#[test]
fn test_ordering_never_matches_null() {
    let doc = json!({"size": null});
    assert!(!matches("size > 1", &doc));
    assert!(!matches("size < 1", &doc));
}

#[test]
fn test_ordering_on_timestamps() {
    assert!(matches("lastSeen > 2024-01-01T00:00:00Z", &device()));
    assert!(matches("lastSeen < 1735689600000", &device()));
}

#[test]
fn test_boolean_and_enum_coercion() {
    assert!(matches("requestAttributes == true", &device()));
    assert!(matches("requestAttributes == TRUE", &device()));
    assert!(matches("status == in_sync", &device()));
    assert!(matches("status in (pending, in_sync)", &device()));
    assert!(!matches("status != in_sync", &device()));
}

#[test]
fn test_membership() {
    assert!(matches("controllerId in (dev-1, dev-2)", &device()));
    assert!(!matches("controllerId not in (dev-1, dev-2)", &device()));
    assert!(matches("controllerId in dev-1", &device()));
    assert!(matches("description not in (a, b)", &device()));
}

#[test]
fn test_like_wildcards() {
    let doc = |name: &str| json!({"name": name});
    assert!(matches(r#"name like "a*b""#, &doc("axxxb")));
    assert!(matches(r#"name like "a*b""#, &doc("ab")));
    assert!(!matches(r#"name like "a*b""#, &doc("a")));
    assert!(matches(r#"name like "a\*b""#, &doc("a*b")));
    assert!(!matches(r#"name like "a\*b""#, &doc("axb")));
    assert!(!matches(r#"name like "*""#, &json!({})));
    assert!(matches(r#"name not like "*""#, &json!({})));
}

#[test]
fn test_ignore_case_folds_strings() {
    assert!(!matcher(r#"name == "sensor a""#).matches(&device()).unwrap());
    assert!(matcher_ignoring_case(r#"name == "sensor a""#).matches(&device()).unwrap());
    assert!(matcher_ignoring_case(r#"name like "SENS*""#).matches(&device()).unwrap());
}

#[test]
fn test_ascii_folding_leaves_non_ascii_letters() {
    let ascii = |query: &str| FilterMatcher::compile(&parse(query), &device_type(), Some(CaseFolding::Ascii)).unwrap();
    let doc = json!({"name": "Éclair", "attributes": {"Émetteur": "x"}});
    assert!(ascii("name == ÉCLAIR").matches(&doc).unwrap());
    assert!(!ascii("name == éclair").matches(&doc).unwrap());
    assert!(matcher_ignoring_case("name == éclair").matches(&doc).unwrap());
    assert!(ascii("attribute.ÉMETTEUR == x").matches(&doc).unwrap());
    assert!(!ascii("attribute.émetteur == x").matches(&doc).unwrap());
}

// ==================== Nested Path Tests ====================

#[test]
fn test_reference_and_embedded_paths() {
    assert!(matches("assignedDs.name == firmware", &device()));
    assert!(matches("address.city == Berlin", &device()));
    assert!(!matches("assignedDs.version == 2.0", &device()));
}

#[test]
fn test_null_mid_path_reads_as_null() {
    let doc = json!({"assignedDs": null});
    assert!(!matches("assignedDs.name == firmware", &doc));
    assert!(matches("assignedDs.name != firmware", &doc));
    assert!(matches("assignedDs.name == null", &doc));
}

// ==================== Collection Tests ====================

#[test]
fn test_collection_in_is_existential() {
    assert!(matches(r#"tag in ("x", "y")"#, &device()));
    assert!(!matches(r#"tag not in ("x", "y")"#, &device()));
}

#[test]
fn test_collection_negation_is_universal() {
    assert!(matches("tag != x", &device()));
    assert!(!matches("tag != y", &device()));
    assert!(matches("tag.colour not like gr*", &device()));
}

#[test]
fn test_empty_collection() {
    let doc = json!({"tags": []});
    assert!(!matches("tag == y", &doc));
    assert!(matches("tag != y", &doc));
    assert!(!matches(r#"tag like "*""#, &doc));
    assert!(matches(r#"tag not like "*""#, &doc));
    assert!(matches("tag != y", &json!({})));
}

#[test]
fn test_wildcard_queries_are_complements_on_collections() {
    let docs = vec![
        json!({"tags": []}),
        json!({"tags": [{"name": "a"}]}),
        json!({"tags": [{"name": null}]}),
        json!({"tags": [{"name": null}, {"name": "b"}]}),
        json!({}),
    ];
    let with = matcher(r#"tag like "*""#).filter(&docs).unwrap();
    let without = matcher(r#"tag not like "*""#).filter(&docs).unwrap();
    assert_eq!(with.len() + without.len(), docs.len());
    for doc in &docs {
        assert_ne!(with.contains(&doc), without.contains(&doc));
    }
}

#[test]
fn test_value_collection() {
    assert!(matches("alias == beta", &device()));
    assert!(matches("alias not in (gamma, delta)", &device()));
    assert!(!matches("alias != alpha", &device()));
}

#[test]
fn test_positive_null_on_collection_needs_an_element() {
    assert!(!matches("action.status == null", &device()));
    let doc = json!({"actions": [{"status": null, "weight": 1}]});
    assert!(matches("action.status == null", &doc));
}

#[test]
fn test_conjunction_may_match_different_elements() {
    assert!(matches("tag == y and tag == z", &device()));
    assert!(!matches("tag == y and tag == q", &device()));
}

// ==================== Map Tests ====================

#[test]
fn test_map_entry_equality() {
    assert!(matches("attribute.hwRevision == 2", &device()));
    assert!(!matches("attribute.hwRevision == 3", &device()));
    assert!(matches("attribute.hwRevision != 3", &device()));
}

/// Negative operators against a map that lacks the key do not match. This is
/// the current policy and may be revisited.
#[test]
fn test_map_missing_key_never_matches_negative_operators() {
    let doc = json!({"attributes": {}});
    assert!(!matches("attribute.hwRevision != 2", &doc));
    assert!(!matches("attribute.hwRevision not in (1, 2)", &doc));
    assert!(!matches(r#"attribute.hwRevision not like "1*""#, &doc));
    assert!(!matches("attribute.hwRevision == 2", &doc));
}

#[test]
fn test_map_missing_key_reads_as_null_for_null_comparisons() {
    let doc = json!({"attributes": {}});
    assert!(matches("attribute.hwRevision == null", &doc));
    assert!(!matches("attribute.hwRevision != null", &doc));
    assert!(matches("attribute.vendor != null", &device()));
}

#[test]
fn test_map_key_case_follows_ignore_case() {
    assert!(!matches("attribute.HWREVISION == 2", &device()));
    assert!(matcher_ignoring_case("attribute.HWREVISION == 2").matches(&device()).unwrap());
}

// ==================== Logical Tests ====================

#[test]
fn test_disjunction_of_conjunctions() {
    let doc = json!({"size": 3, "rating": 99.0});
    assert!(matches("(size == 1 and rating == 2) or size == 3", &doc));
    assert!(!matches("(size == 1 and rating == 2) or size == 4", &doc));
}

// ==================== Error Tests ====================

#[test]
fn test_ordering_on_boolean_is_rejected() {
    assert!(matches!(
        compile_error("requestAttributes > true"),
        FilterError::UnsupportedOperator { .. }
    ));
}

#[test]
fn test_like_on_number_is_rejected() {
    assert!(matches!(compile_error("size like 1*"), FilterError::UnsupportedOperator { .. }));
}

#[test]
fn test_unknown_enum_value_lists_names() {
    match compile_error("status == done") {
        FilterError::TypeCoercion { allowed, key, .. } => {
            assert_eq!(key, "status");
            assert_eq!(allowed, vec!["registered", "pending", "in_sync", "error"]);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_bad_number_literal() {
    assert!(matches!(compile_error("size == big"), FilterError::TypeCoercion { .. }));
}

#[test]
fn test_unresolved_key_fails_at_compile_time() {
    let filter = FilterParser::parse_unresolved("colour == red").unwrap();
    assert!(matches!(
        FilterMatcher::compile(&filter, &device_type(), None),
        Err(FilterError::UnsupportedField { .. })
    ));
}

#[test]
fn test_object_value_of_wrong_shape_is_an_error() {
    let doc = json!({"assignedDs": "firmware"});
    assert!(matcher("assignedDs.name == firmware").matches(&doc).is_err());
    let doc = json!({"size": "lots"});
    assert!(matches!(
        matcher("size == 1").matches(&doc),
        Err(FilterError::TypeCoercion { .. })
    ));
}
