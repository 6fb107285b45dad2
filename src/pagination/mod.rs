//! Pagination module
//!
//! Supports: Cursor (forward, reverse, bidirectional), Offset (forward, reverse)
//!
//! # Overview
//!
//! The pagination module defines how continuation state is derived from
//! page data (`PageInfo`, `PageExtraction`) and how the next or previous
//! query is resolved from it. Strategies bundle both halves; the
//! coordinator only ever sees the resulting closures.

mod strategies;
mod types;

pub use strategies::{
    CursorBidirectional, CursorForward, CursorPaths, CursorReverse, JsonCursorPagination,
    JsonPageInfo, OffsetForward, OffsetReverse,
};
pub use types::{
    extract_cursor, extract_cursor_value, extract_flag, extract_path, PageExtraction, PageInfo, PageInfoExtractor,
    PageResolver, PaginationStrategy,
};

#[cfg(test)]
mod tests;
