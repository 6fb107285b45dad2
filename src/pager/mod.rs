//! Pager module
//!
//! The pagination coordinator and the pieces it is built from.
//!
//! # Overview
//!
//! - `QueryPager` - owns pagination state, serializes mutating operations
//! - `PagerBuilder` - wires sources, page-info extraction and resolvers
//! - `OrderedPageMap` - insertion-ordered follow-up pages keyed by `PageKey`
//! - `Subscription` - handle for an update callback
//!
//! # Example
//!
//! ```ignore
//! let pager = QueryPager::builder(source, initial_query)
//!     .with_strategy(strategy)
//!     .build()?;
//!
//! let _subscription = pager.subscribe(|update| println!("{update:?}"));
//! pager.fetch().await?;
//! while pager.can_load_next() {
//!     pager.load_more().await?;
//! }
//! ```

mod builder;
mod coordinator;
mod page_map;
mod types;

pub use builder::PagerBuilder;
pub use coordinator::QueryPager;
pub use page_map::OrderedPageMap;
pub use types::{Operation, PagerOutput, PagerUpdate, Subscription};
