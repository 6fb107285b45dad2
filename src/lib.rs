// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Query Pager
//!
//! Bidirectional pagination over watched queries.
//!
//! A [`QueryPager`] turns one initial query plus follow-up "load more" /
//! "load previous" queries into a single ordered, continuously updated
//! view, driven by a pluggable page-info policy and any data source that
//! can execute and watch a query under a cache policy.
//!
//! ## Features
//!
//! - **Single in-flight operation**: concurrent loads fail fast with `LoadInProgress`
//! - **Cache-aware settlement**: a cache hit under `ReturnCacheDataAndFetch` is
//!   published but the operation waits for the network
//! - **Continuous watching**: later cache/network emissions keep updating pages
//! - **Bulk loading**: `load_all` delivers one notification for the whole sequence
//! - **Type erasure**: flatten pages into one list of models with `AnyQueryPager`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use query_pager::pagination::{CursorPaths, JsonCursorPagination};
//! use query_pager::query::OperationQuery;
//! use query_pager::{InMemorySource, QueryPager, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let source = InMemorySource::new();
//!     let feed = OperationQuery::<serde_json::Value>::new("Feed").variable("first", 10);
//!
//!     let pager = QueryPager::builder(source, feed)
//!         .with_strategy(
//!             JsonCursorPagination::new("FeedPage")
//!                 .with_variable("first", 10)
//!                 .with_forward(CursorPaths::relay_forward("feed")),
//!         )
//!         .build()?;
//!
//!     let _subscription = pager.subscribe(|update| println!("{update:?}"));
//!     pager.load_all().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │        PagerHandle (callbacks, streams)   AnyQueryPager       │
//! └───────────────────────────────┬───────────────────────────────┘
//!                                 │
//! ┌───────────────────────────────┴───────────────────────────────┐
//! │ QueryPager: initial page + OrderedPageMap, in-flight lock,    │
//! │             cancellation epoch, subscriber fan-out            │
//! └──────────┬───────────────────────────────────┬────────────────┘
//!            │                                   │
//! ┌──────────┴──────────┐             ┌──────────┴────────────────┐
//! │ Pagination policy   │             │ DataSource                │
//! │ PageInfo, resolvers │             │ execute → QueryWatch      │
//! └─────────────────────┘             └───────────────────────────┘
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the pager
pub mod error;

/// Common types and type aliases
pub mod types;

/// Pager configuration
pub mod config;

/// Queries and page keys
pub mod query;

/// Data source contract and in-memory source
pub mod source;

/// Page info and pagination strategies
pub mod pagination;

/// Pagination coordinator
pub mod pager;

/// Cloneable handle with callbacks and update streams
pub mod handle;

/// Type-erased pager
pub mod erased;

/// YAML replay fixtures
pub mod fixture;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::PagerConfig;
pub use erased::{AnyOutput, AnyQueryPager, AnyUpdate};
pub use handle::{PagerHandle, UpdateStream};
pub use pager::{PagerOutput, PagerUpdate, QueryPager, Subscription};
pub use source::{DataSource, InMemorySource};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
