//! Tests for pagination module

use super::*;
use crate::query::{OperationQuery, Query};
use crate::types::Direction;
use pretty_assertions::assert_eq;
use serde_json::json;

// ============================================================================
// PageInfo Model Tests
// ============================================================================

#[test]
fn test_cursor_forward() {
    let info = CursorForward::new(true, Some("c2".to_string()));
    assert!(info.can_load_more());
    assert!(!info.can_load_previous());
    assert!(info.can_load(Direction::Forward));
    assert!(!info.can_load(Direction::Backward));
}

#[test]
fn test_cursor_reverse_never_loads_more() {
    let info = CursorReverse::new(true, Some("c0".to_string()));
    assert!(!info.can_load_more());
    assert!(info.can_load_previous());
}

#[test]
fn test_cursor_bidirectional() {
    let info = CursorBidirectional {
        has_next: false,
        end_cursor: None,
        has_previous: true,
        start_cursor: Some("s".to_string()),
    };
    assert!(!info.can_load(Direction::Forward));
    assert!(info.can_load(Direction::Backward));
}

#[test]
fn test_offset_models() {
    let forward = OffsetForward {
        offset: 20,
        can_load_next: true,
    };
    assert!(forward.can_load_more());
    assert!(!forward.can_load_previous());

    let reverse = OffsetReverse {
        offset: 0,
        can_load_previous: false,
    };
    assert!(!reverse.can_load_more());
    assert!(!reverse.can_load_previous());
}

// ============================================================================
// Path Extraction Tests
// ============================================================================

#[test]
fn test_extract_path() {
    let body = json!({"feed": {"pageInfo": {"endCursor": "abc"}, "edges": [{"id": 1}, {"id": 2}]}});

    assert_eq!(
        extract_path(&body, "$.feed.pageInfo.endCursor"),
        Some(&json!("abc"))
    );
    assert_eq!(extract_path(&body, "feed.edges.1.id"), Some(&json!(2)));
    assert_eq!(extract_path(&body, "feed.missing"), None);
    assert_eq!(extract_path(&body, "$"), Some(&body));
}

#[test]
fn test_extract_cursor() {
    let body = json!({"a": "x", "b": 7, "c": "", "d": null});
    assert_eq!(extract_cursor(&body, "a"), Some("x".to_string()));
    assert_eq!(extract_cursor(&body, "b"), Some("7".to_string()));
    assert_eq!(extract_cursor(&body, "c"), None);
    assert_eq!(extract_cursor(&body, "d"), None);
}

#[test]
fn test_extract_cursor_value_keeps_type() {
    let body = json!({"a": "x", "b": 20, "c": "", "d": true});
    assert_eq!(extract_cursor_value(&body, "a"), Some(json!("x")));
    assert_eq!(extract_cursor_value(&body, "b"), Some(json!(20)));
    assert_eq!(extract_cursor_value(&body, "c"), None);
    assert_eq!(extract_cursor_value(&body, "d"), None);
}

#[test]
fn test_extract_flag_defaults_false() {
    let body = json!({"yes": true, "text": "true"});
    assert!(extract_flag(&body, "yes"));
    assert!(!extract_flag(&body, "text"));
    assert!(!extract_flag(&body, "missing"));
}

#[test]
fn test_page_extraction_data() {
    let initial = json!(1);
    let page = json!(2);
    let a = PageExtraction::<serde_json::Value, serde_json::Value>::Initial(&initial);
    let b = PageExtraction::<serde_json::Value, serde_json::Value>::Paginated(&page);
    assert!(a.is_initial());
    assert!(!b.is_initial());
    assert_eq!(a.data(), &json!(1));
    assert_eq!(b.data(), &json!(2));
}

// ============================================================================
// JsonCursorPagination Tests
// ============================================================================

fn relay_strategy() -> JsonCursorPagination {
    JsonCursorPagination::new("FeedPage")
        .with_variable("first", 2)
        .with_forward(CursorPaths::relay_forward("feed"))
        .with_backward(CursorPaths::relay_backward("feed"))
}

fn relay_page(has_next: bool, end: &str, has_previous: bool, start: &str) -> serde_json::Value {
    json!({
        "feed": {
            "edges": [],
            "pageInfo": {
                "hasNextPage": has_next,
                "endCursor": end,
                "hasPreviousPage": has_previous,
                "startCursor": start,
            }
        }
    })
}

#[test]
fn test_relay_paths() {
    let paths = CursorPaths::relay_forward("data.feed.");
    assert_eq!(paths.flag_path, "data.feed.pageInfo.hasNextPage");
    assert_eq!(paths.cursor_param, "after");

    let paths = CursorPaths::relay_backward("");
    assert_eq!(paths.cursor_path, "pageInfo.startCursor");
    assert_eq!(paths.cursor_param, "before");
}

#[test]
fn test_json_strategy_extract() {
    let strategy = relay_strategy();
    let page = relay_page(true, "c4", false, "c3");

    let info = strategy.extract(PageExtraction::Paginated(&page));
    assert_eq!(
        info,
        JsonPageInfo {
            has_next: true,
            end_cursor: Some(json!("c4")),
            has_previous: false,
            start_cursor: Some(json!("c3")),
        }
    );
}

#[test]
fn test_json_strategy_next_query() {
    let strategy = relay_strategy();
    let page = relay_page(true, "c4", true, "c3");
    let info = strategy.extract(PageExtraction::Initial(&page));

    let next = strategy.next_query(&info).unwrap();
    assert_eq!(next.operation_name(), "FeedPage");
    assert_eq!(
        serde_json::Value::Object(next.variables()),
        json!({"first": 2, "after": "c4"})
    );

    let previous = strategy.previous_query(&info).unwrap();
    assert_eq!(
        serde_json::Value::Object(previous.variables()),
        json!({"first": 2, "before": "c3"})
    );
}

#[test]
fn test_json_strategy_numeric_cursor() {
    let strategy = JsonCursorPagination::new("FeedPage")
        .with_variable("limit", 20)
        .with_forward(CursorPaths::new("hasNext", "next", "offset"));
    let page = json!({"hasNext": true, "next": 20});
    let info = strategy.extract(PageExtraction::Initial(&page));

    let next = strategy.next_query(&info).unwrap();
    assert_eq!(
        serde_json::Value::Object(next.variables()),
        json!({"limit": 20, "offset": 20})
    );
    assert_eq!(
        next.page_key(),
        OperationQuery::<serde_json::Value>::new("FeedPage")
            .variable("limit", 20)
            .variable("offset", 20)
            .page_key()
    );
}

#[test]
fn test_json_strategy_without_backward() {
    let strategy = JsonCursorPagination::new("FeedPage")
        .with_forward(CursorPaths::relay_forward("feed"));
    let page = relay_page(true, "c4", true, "c3");
    let info = strategy.extract(PageExtraction::Initial(&page));

    assert!(!info.can_load_previous());
    assert!(strategy.previous_query(&info).is_none());
    assert!(strategy.next_query(&info).is_some());
}

#[test]
fn test_json_strategy_missing_cursor() {
    let strategy = relay_strategy();
    let page = json!({"feed": {"pageInfo": {"hasNextPage": true}}});
    let info = strategy.extract(PageExtraction::Initial(&page));

    assert!(info.can_load_more());
    assert!(strategy.next_query(&info).is_none());
}

#[test]
fn test_json_strategy_deserialize() {
    let yaml = r#"
page_operation: FeedPage
base_variables:
  first: 10
forward:
  flag_path: feed.pageInfo.hasNextPage
  cursor_path: feed.pageInfo.endCursor
  cursor_param: after
"#;
    let strategy: JsonCursorPagination = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(strategy.page_operation, "FeedPage");
    assert_eq!(strategy.base_variables.get("first"), Some(&json!(10)));
    assert!(strategy.forward.is_some());
    assert!(strategy.backward.is_none());
}
