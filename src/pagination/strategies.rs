//! Page info models and strategies
//!
//! Ready-made [`PageInfo`] models for the common pagination patterns, plus
//! a JSON-path driven cursor strategy for `serde_json::Value` pages.

use super::types::{
    extract_cursor_value, extract_flag, PageExtraction, PageInfo, PaginationStrategy,
};
use crate::query::{OperationQuery, Variables};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Cursor Pagination
// ============================================================================

/// Forward-only cursor pagination (Relay `hasNextPage` / `endCursor`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CursorForward {
    /// Whether a next page exists
    pub has_next: bool,
    /// Cursor of the last edge
    pub end_cursor: Option<String>,
}

impl CursorForward {
    /// Create forward cursor info
    pub fn new(has_next: bool, end_cursor: Option<String>) -> Self {
        Self {
            has_next,
            end_cursor,
        }
    }
}

impl PageInfo for CursorForward {
    fn can_load_more(&self) -> bool {
        self.has_next
    }

    fn can_load_previous(&self) -> bool {
        false
    }
}

/// Backward-only cursor pagination (Relay `hasPreviousPage` / `startCursor`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CursorReverse {
    /// Whether a previous page exists
    pub has_previous: bool,
    /// Cursor of the first edge
    pub start_cursor: Option<String>,
}

impl CursorReverse {
    /// Create reverse cursor info
    pub fn new(has_previous: bool, start_cursor: Option<String>) -> Self {
        Self {
            has_previous,
            start_cursor,
        }
    }
}

impl PageInfo for CursorReverse {
    fn can_load_more(&self) -> bool {
        false
    }

    fn can_load_previous(&self) -> bool {
        self.has_previous
    }
}

/// Cursor pagination in both directions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CursorBidirectional {
    /// Whether a next page exists
    pub has_next: bool,
    /// Cursor of the last edge
    pub end_cursor: Option<String>,
    /// Whether a previous page exists
    pub has_previous: bool,
    /// Cursor of the first edge
    pub start_cursor: Option<String>,
}

impl PageInfo for CursorBidirectional {
    fn can_load_more(&self) -> bool {
        self.has_next
    }

    fn can_load_previous(&self) -> bool {
        self.has_previous
    }
}

// ============================================================================
// Offset Pagination
// ============================================================================

/// Forward offset pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct OffsetForward {
    /// Offset of the next page
    pub offset: u64,
    /// Whether a next page exists
    pub can_load_next: bool,
}

impl PageInfo for OffsetForward {
    fn can_load_more(&self) -> bool {
        self.can_load_next
    }

    fn can_load_previous(&self) -> bool {
        false
    }
}

/// Reverse offset pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct OffsetReverse {
    /// Offset of the previous page
    pub offset: u64,
    /// Whether a previous page exists
    pub can_load_previous: bool,
}

impl PageInfo for OffsetReverse {
    fn can_load_more(&self) -> bool {
        false
    }

    fn can_load_previous(&self) -> bool {
        self.can_load_previous
    }
}

// ============================================================================
// JSON Cursor Strategy
// ============================================================================

/// Page info read from JSON pages
///
/// Cursors keep their JSON type, so a numeric offset is bound back as a
/// number on the follow-up query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JsonPageInfo {
    /// Whether a next page exists
    pub has_next: bool,
    /// Cursor bound on the next query
    pub end_cursor: Option<Value>,
    /// Whether a previous page exists
    pub has_previous: bool,
    /// Cursor bound on the previous query
    pub start_cursor: Option<Value>,
}

impl PageInfo for JsonPageInfo {
    fn can_load_more(&self) -> bool {
        self.has_next
    }

    fn can_load_previous(&self) -> bool {
        self.has_previous
    }
}

/// Where to find one direction's flag and cursor, and which variable carries it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPaths {
    /// Path to the "has more in this direction" flag
    pub flag_path: String,
    /// Path to the cursor value
    pub cursor_path: String,
    /// Variable the cursor is bound to on the follow-up query
    pub cursor_param: String,
}

impl CursorPaths {
    /// Create cursor paths
    pub fn new(
        flag_path: impl Into<String>,
        cursor_path: impl Into<String>,
        cursor_param: impl Into<String>,
    ) -> Self {
        Self {
            flag_path: flag_path.into(),
            cursor_path: cursor_path.into(),
            cursor_param: cursor_param.into(),
        }
    }

    /// Relay forward defaults: `pageInfo.hasNextPage`, `pageInfo.endCursor`, `after`
    pub fn relay_forward(prefix: &str) -> Self {
        Self::new(
            join(prefix, "pageInfo.hasNextPage"),
            join(prefix, "pageInfo.endCursor"),
            "after",
        )
    }

    /// Relay backward defaults: `pageInfo.hasPreviousPage`, `pageInfo.startCursor`, `before`
    pub fn relay_backward(prefix: &str) -> Self {
        Self::new(
            join(prefix, "pageInfo.hasPreviousPage"),
            join(prefix, "pageInfo.startCursor"),
            "before",
        )
    }
}

fn join(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        path.to_string()
    } else {
        format!("{}.{path}", prefix.trim_end_matches('.'))
    }
}

/// Cursor pagination over JSON pages
///
/// Page info is read from dotted paths; the follow-up query is the page
/// operation with the base variables plus the direction's cursor variable.
/// A direction without paths is unsupported and never loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonCursorPagination {
    /// Operation name of the follow-up query
    pub page_operation: String,

    /// Variables bound on every follow-up query
    #[serde(default)]
    pub base_variables: Variables,

    /// Forward paths
    #[serde(default)]
    pub forward: Option<CursorPaths>,

    /// Backward paths
    #[serde(default)]
    pub backward: Option<CursorPaths>,
}

impl JsonCursorPagination {
    /// Create a strategy with no directions enabled
    pub fn new(page_operation: impl Into<String>) -> Self {
        Self {
            page_operation: page_operation.into(),
            base_variables: Variables::new(),
            forward: None,
            backward: None,
        }
    }

    /// Bind a variable on every follow-up query
    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.base_variables.insert(name.into(), value.into());
        self
    }

    /// Enable forward loading
    #[must_use]
    pub fn with_forward(mut self, paths: CursorPaths) -> Self {
        self.forward = Some(paths);
        self
    }

    /// Enable backward loading
    #[must_use]
    pub fn with_backward(mut self, paths: CursorPaths) -> Self {
        self.backward = Some(paths);
        self
    }

    fn query_for(&self, paths: &CursorPaths, cursor: &Value) -> OperationQuery<Value> {
        let mut variables = self.base_variables.clone();
        for other in [&self.forward, &self.backward].into_iter().flatten() {
            variables.remove(&other.cursor_param);
        }
        variables.insert(paths.cursor_param.clone(), cursor.clone());
        OperationQuery::with_variables(self.page_operation.clone(), variables)
    }
}

impl PaginationStrategy<Value, Value> for JsonCursorPagination {
    type Info = JsonPageInfo;
    type Query = OperationQuery<Value>;

    fn extract(&self, page: PageExtraction<'_, Value, Value>) -> JsonPageInfo {
        let data = page.data();
        let (has_next, end_cursor) = match &self.forward {
            Some(paths) => (
                extract_flag(data, &paths.flag_path),
                extract_cursor_value(data, &paths.cursor_path),
            ),
            None => (false, None),
        };
        let (has_previous, start_cursor) = match &self.backward {
            Some(paths) => (
                extract_flag(data, &paths.flag_path),
                extract_cursor_value(data, &paths.cursor_path),
            ),
            None => (false, None),
        };
        JsonPageInfo {
            has_next,
            end_cursor,
            has_previous,
            start_cursor,
        }
    }

    fn next_query(&self, info: &JsonPageInfo) -> Option<OperationQuery<Value>> {
        let paths = self.forward.as_ref()?;
        let cursor = info.end_cursor.as_ref()?;
        Some(self.query_for(paths, cursor))
    }

    fn previous_query(&self, info: &JsonPageInfo) -> Option<OperationQuery<Value>> {
        let paths = self.backward.as_ref()?;
        let cursor = info.start_cursor.as_ref()?;
        Some(self.query_for(paths, cursor))
    }
}
