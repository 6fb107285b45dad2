//! Pagination types and traits
//!
//! Defines the page-info abstraction the coordinator derives continuation
//! state from, and the pluggable extraction/resolution policy.

use crate::query::Query;
use crate::types::Direction;
use serde_json::Value;
use std::sync::Arc;

/// Continuation state derived from one page of data
///
/// Implementations are plain values; the cursor fields are opaque to the
/// coordinator and only read by the resolvers.
pub trait PageInfo: Send + Sync + 'static {
    /// Whether a further page can be loaded after this one
    fn can_load_more(&self) -> bool;

    /// Whether an earlier page can be loaded before this one
    fn can_load_previous(&self) -> bool;

    /// Whether a page can be loaded in `direction`
    fn can_load(&self, direction: Direction) -> bool {
        match direction {
            Direction::Forward => self.can_load_more(),
            Direction::Backward => self.can_load_previous(),
        }
    }
}

/// The page a [`PageInfo`] is extracted from
#[derive(Debug)]
pub enum PageExtraction<'a, I, P> {
    /// Result of the initial query
    Initial(&'a I),
    /// Result of a follow-up query
    Paginated(&'a P),
}

impl<I, P> Clone for PageExtraction<'_, I, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I, P> Copy for PageExtraction<'_, I, P> {}

impl<I, P> PageExtraction<'_, I, P> {
    /// Whether this is the initial page
    pub fn is_initial(&self) -> bool {
        matches!(self, Self::Initial(_))
    }
}

impl<'a, T> PageExtraction<'a, T, T> {
    /// Borrow the page when both queries share a data type
    pub fn data(&self) -> &'a T {
        match *self {
            Self::Initial(data) | Self::Paginated(data) => data,
        }
    }
}

/// Extracts continuation state from a page
pub type PageInfoExtractor<I, P, Info> =
    Arc<dyn Fn(PageExtraction<'_, I, P>) -> Info + Send + Sync>;

/// Resolves the follow-up query for a direction, `None` when exhausted
pub type PageResolver<Info, Q> = Arc<dyn Fn(&Info) -> Option<Q> + Send + Sync>;

/// A complete page-info policy: extraction plus both resolvers
///
/// `I` and `P` are the initial and follow-up page data types.
pub trait PaginationStrategy<I, P>: Send + Sync + 'static {
    /// Page info model produced by this strategy
    type Info: PageInfo;

    /// Follow-up query type
    type Query: Query<Data = P>;

    /// Extract page info from a page
    fn extract(&self, page: PageExtraction<'_, I, P>) -> Self::Info;

    /// Query for the page after `info`
    fn next_query(&self, info: &Self::Info) -> Option<Self::Query>;

    /// Query for the page before `info`
    fn previous_query(&self, info: &Self::Info) -> Option<Self::Query>;
}

/// Extract a JSON value from a dotted path (`$.` prefix optional)
pub fn extract_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    if path.is_empty() || path == "$" {
        return Some(value);
    }

    let mut current = value;
    for part in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Extract a cursor at a dotted path, keeping its JSON type
///
/// Only non-empty strings and numbers count as cursors.
pub fn extract_cursor_value(value: &Value, path: &str) -> Option<Value> {
    match extract_path(value, path)? {
        Value::String(s) if s.is_empty() => None,
        cursor @ (Value::String(_) | Value::Number(_)) => Some(cursor.clone()),
        _ => None,
    }
}

/// Extract a cursor at a dotted path as a string
pub fn extract_cursor(value: &Value, path: &str) -> Option<String> {
    extract_cursor_value(value, path).map(|cursor| match cursor {
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Extract a boolean flag at a dotted path, `false` when missing
pub fn extract_flag(value: &Value, path: &str) -> bool {
    extract_path(value, path)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}
