//! Data source contract
//!
//! Defines the traits and response types every data source implements.

use crate::error::SourceError;
use crate::query::Query;
use crate::types::{CachePolicy, UpdateSource};
use futures::stream::{self, BoxStream, StreamExt};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Stream of origin-tagged responses for one watched query
pub type ResponseStream<D> = BoxStream<'static, QueryResponse<D>>;

/// A single origin-tagged response
#[derive(Clone)]
pub struct QueryResponse<D> {
    /// Where the response came from
    pub source: UpdateSource,
    /// `Ok(None)` means the query completed without data
    pub result: std::result::Result<Option<D>, SourceError>,
}

impl<D> QueryResponse<D> {
    /// Successful response carrying data
    pub fn data(source: UpdateSource, data: D) -> Self {
        Self {
            source,
            result: Ok(Some(data)),
        }
    }

    /// Successful cache response
    pub fn cache(data: D) -> Self {
        Self::data(UpdateSource::Cache, data)
    }

    /// Successful network response
    pub fn network(data: D) -> Self {
        Self::data(UpdateSource::Network, data)
    }

    /// Response without data
    pub fn empty(source: UpdateSource) -> Self {
        Self {
            source,
            result: Ok(None),
        }
    }

    /// Failed response
    pub fn failure(source: UpdateSource, error: impl Into<anyhow::Error>) -> Self {
        Self {
            source,
            result: Err(Arc::new(error.into())),
        }
    }

    /// Whether this response settles an operation issued under `policy`
    ///
    /// Failures always settle. A cache hit under
    /// [`CachePolicy::ReturnCacheDataAndFetch`] does not; the network
    /// response that follows it does.
    pub fn settles(&self, policy: CachePolicy) -> bool {
        self.result.is_err() || !policy.is_interim(self.source)
    }

    /// Convert the carried data
    pub fn map<T>(self, f: impl FnOnce(D) -> T) -> QueryResponse<T> {
        QueryResponse {
            source: self.source,
            result: self.result.map(|data| data.map(f)),
        }
    }
}

impl<D> fmt::Debug for QueryResponse<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = match &self.result {
            Ok(Some(_)) => "data".to_string(),
            Ok(None) => "empty".to_string(),
            Err(e) => format!("failure: {e}"),
        };
        f.debug_struct("QueryResponse")
            .field("source", &self.source)
            .field("result", &outcome)
            .finish()
    }
}

/// Control handle for a watched query
pub trait WatchHandle: Send + Sync {
    /// Re-trigger the query under `policy`; responses arrive on the
    /// watch's existing stream
    fn refetch(&self, policy: CachePolicy);

    /// Stop further emissions and release resources
    fn cancel(&self);
}

/// A running query: its response stream and control handle
pub struct QueryWatch<D> {
    /// Responses, in emission order
    pub responses: ResponseStream<D>,
    /// Re-trigger / cancel handle
    pub handle: Arc<dyn WatchHandle>,
}

impl<D: Send + 'static> QueryWatch<D> {
    /// Build a watch whose responses are fed through an unbounded channel
    ///
    /// The returned sender is how a data source pushes responses; dropping
    /// it ends the stream.
    pub fn channel(handle: Arc<dyn WatchHandle>) -> (mpsc::UnboundedSender<QueryResponse<D>>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let responses = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|response| (response, rx))
        })
        .boxed();
        (tx, Self { responses, handle })
    }
}

/// Executes queries for the pager
///
/// Implement this for each query type the pager drives; a client usually
/// implements it for both the initial and the follow-up query type.
pub trait DataSource<Q: Query>: Send + Sync + 'static {
    /// Start watching `query` under `policy`
    fn execute(&self, query: &Q, policy: CachePolicy) -> QueryWatch<Q::Data>;
}

impl<Q: Query, S: DataSource<Q>> DataSource<Q> for Arc<S> {
    fn execute(&self, query: &Q, policy: CachePolicy) -> QueryWatch<Q::Data> {
        (**self).execute(query, policy)
    }
}
