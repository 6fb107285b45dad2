//! Data source module
//!
//! The pager consumes query execution only through the narrow contract
//! defined here: execute a query under a cache policy and receive a stream
//! of origin-tagged responses, with a handle to re-trigger or cancel.
//!
//! # Overview
//!
//! - `DataSource` - executes a query and returns a `QueryWatch`
//! - `QueryWatch` - response stream plus a `WatchHandle`
//! - `InMemorySource` - scripted source for tests, demos and fixture replay

mod memory;
mod types;

pub use memory::{InMemorySource, ScriptedPage};
pub use types::{DataSource, QueryResponse, QueryWatch, ResponseStream, WatchHandle};
