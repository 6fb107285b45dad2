//! Shareable pager handle
//!
//! [`PagerHandle`] is a cheaply cloneable front for a [`QueryPager`]. Besides
//! the awaitable operations (reachable through `Deref`) it offers
//! completion-callback variants that run the operation on a spawned task,
//! and a [`Stream`] view of the update feed.

use crate::error::Result;
use crate::pagination::PageInfo;
use crate::pager::{PagerUpdate, QueryPager, Subscription};
use crate::query::Query;
use futures::Stream;
use std::ops::Deref;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Cloneable handle to a [`QueryPager`]
pub struct PagerHandle<I: Query, P: Query, Info: PageInfo> {
    pager: Arc<QueryPager<I, P, Info>>,
}

impl<I: Query, P: Query, Info: PageInfo> Clone for PagerHandle<I, P, Info> {
    fn clone(&self) -> Self {
        Self {
            pager: Arc::clone(&self.pager),
        }
    }
}

impl<I: Query, P: Query, Info: PageInfo> Deref for PagerHandle<I, P, Info> {
    type Target = QueryPager<I, P, Info>;

    fn deref(&self) -> &Self::Target {
        &self.pager
    }
}

impl<I: Query, P: Query, Info: PageInfo> From<QueryPager<I, P, Info>> for PagerHandle<I, P, Info> {
    fn from(pager: QueryPager<I, P, Info>) -> Self {
        Self::new(pager)
    }
}

impl<I: Query, P: Query, Info: PageInfo> PagerHandle<I, P, Info> {
    /// Wrap a pager
    pub fn new(pager: QueryPager<I, P, Info>) -> Self {
        Self {
            pager: Arc::new(pager),
        }
    }

    /// Run `fetch` in the background, then call `completion` with its result
    pub fn fetch_then<F>(&self, completion: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        let pager = Arc::clone(&self.pager);
        tokio::spawn(async move { completion(pager.fetch().await) })
    }

    /// Run `load_more` in the background, then call `completion` with its result
    pub fn load_more_then<F>(&self, completion: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        let pager = Arc::clone(&self.pager);
        tokio::spawn(async move { completion(pager.load_more().await) })
    }

    /// Run `load_previous` in the background, then call `completion` with its result
    pub fn load_previous_then<F>(&self, completion: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        let pager = Arc::clone(&self.pager);
        tokio::spawn(async move { completion(pager.load_previous().await) })
    }

    /// Run `load_all` in the background, then call `completion` with its result
    pub fn load_all_then<F>(&self, completion: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        let pager = Arc::clone(&self.pager);
        tokio::spawn(async move { completion(pager.load_all().await) })
    }

    /// Run `refetch` in the background, then call `completion` with its result
    pub fn refetch_then<F>(&self, completion: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        let pager = Arc::clone(&self.pager);
        tokio::spawn(async move { completion(pager.refetch().await) })
    }

    /// Stream of every update delivered after this call
    ///
    /// Dropping the stream unsubscribes.
    pub fn updates(&self) -> UpdateStream<I::Data, P::Data> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let subscription = self.pager.subscribe(move |update| {
            let _ = sender.send(update.clone());
        });
        UpdateStream {
            receiver,
            _subscription: subscription,
        }
    }
}

/// Update feed as a [`Stream`]
///
/// The stream ends once every handle to the pager has been dropped.
pub struct UpdateStream<I, P> {
    receiver: mpsc::UnboundedReceiver<PagerUpdate<I, P>>,
    _subscription: Subscription,
}

impl<I, P> Stream for UpdateStream<I, P> {
    type Item = PagerUpdate<I, P>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::pagination::{CursorPaths, JsonCursorPagination, JsonPageInfo};
    use crate::query::OperationQuery;
    use crate::source::{InMemorySource, ScriptedPage};
    use crate::types::JsonValue;
    use futures::StreamExt;
    use serde_json::json;
    use tokio::sync::oneshot;

    type Feed = OperationQuery<JsonValue>;

    fn handle() -> PagerHandle<Feed, Feed, JsonPageInfo> {
        let initial = Feed::new("Feed");
        let source = InMemorySource::new();
        source.insert_query(
            &initial,
            ScriptedPage::network(json!({"pageInfo": {"hasNextPage": true, "endCursor": "c1"}})),
        );
        source.insert_query(
            &Feed::new("FeedPage").variable("after", "c1"),
            ScriptedPage::network(json!({"pageInfo": {"hasNextPage": false}})),
        );
        let pager = QueryPager::builder(source, initial)
            .with_strategy(
                JsonCursorPagination::new("FeedPage").with_forward(CursorPaths::relay_forward("")),
            )
            .build()
            .unwrap();
        PagerHandle::new(pager)
    }

    #[tokio::test]
    async fn test_completion_callbacks() {
        let pager = handle();

        let (tx, rx) = oneshot::channel();
        pager.fetch_then(move |result| {
            let _ = tx.send(result.is_ok());
        });
        assert!(rx.await.unwrap());

        let (tx, rx) = oneshot::channel();
        pager.load_more_then(move |result| {
            let _ = tx.send(result.is_ok());
        });
        assert!(rx.await.unwrap());

        let (tx, rx) = oneshot::channel();
        pager.load_more_then(move |result| {
            let _ = tx.send(matches!(result, Err(Error::NoMoreContent { .. })));
        });
        assert!(rx.await.unwrap());
    }

    #[tokio::test]
    async fn test_update_stream() {
        let pager = handle();
        let mut updates = pager.updates();

        pager.fetch().await.unwrap();
        pager.load_more().await.unwrap();

        let first = updates.next().await.unwrap().unwrap();
        assert!(first.pages.is_empty());
        let second = updates.next().await.unwrap().unwrap();
        assert_eq!(second.pages.len(), 1);
        assert_eq!(pager.subscriber_count(), 1);

        drop(updates);
        assert_eq!(pager.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_update_stream_ends_with_pager() {
        let pager = handle();
        let mut updates = pager.updates();
        let other = pager.clone();

        pager.fetch().await.unwrap();
        assert!(updates.next().await.unwrap().is_ok());

        drop(pager);
        other.load_more().await.unwrap();
        assert!(updates.next().await.unwrap().is_ok());

        drop(other);
        let end = tokio::time::timeout(std::time::Duration::from_secs(2), updates.next()).await;
        assert!(matches!(end, Ok(None)));
    }
}
