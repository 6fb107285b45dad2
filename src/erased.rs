//! Type-erased pager
//!
//! [`AnyQueryPager`] hides the initial/page query types behind caller
//! supplied transforms that flatten every aggregate into one ordered list
//! of model values. A transform failure fails the whole notification.

use crate::error::{Error, Result, SourceError};
use crate::pagination::PageInfo;
use crate::pager::{PagerUpdate, QueryPager, Subscription};
use crate::query::Query;
use crate::types::UpdateSource;
use async_trait::async_trait;
use std::sync::Arc;

/// Flattened aggregate: transformed initial items followed by every page's items
#[derive(Debug, Clone, PartialEq)]
pub struct AnyOutput<M> {
    /// Items in page order
    pub items: Vec<M>,
    /// Origin of the most recently settled response
    pub source: UpdateSource,
}

/// Notification delivered by an [`AnyQueryPager`]
pub type AnyUpdate<M> = std::result::Result<AnyOutput<M>, SourceError>;

type Transform<D, M> = Arc<dyn Fn(&D) -> anyhow::Result<Vec<M>> + Send + Sync>;
type AnyCallback<M> = Arc<dyn Fn(&AnyUpdate<M>) + Send + Sync>;

struct Transforms<I: Query, P: Query, M> {
    initial: Transform<I::Data, M>,
    page: Transform<P::Data, M>,
}

impl<I: Query, P: Query, M> Transforms<I, P, M> {
    fn apply(&self, update: &PagerUpdate<I::Data, P::Data>) -> AnyUpdate<M> {
        let output = update.as_ref().map_err(Arc::clone)?;
        let mut items = (self.initial)(&output.initial).map_err(transform_failure)?;
        for page in &output.pages {
            items.extend((self.page)(page).map_err(transform_failure)?);
        }
        Ok(AnyOutput {
            items,
            source: output.source,
        })
    }
}

/// Wrap a transform error so subscribers can tell it apart from a data-source failure
fn transform_failure(error: anyhow::Error) -> SourceError {
    Arc::new(anyhow::Error::new(Error::Transform(Arc::new(error))))
}

#[async_trait]
trait ErasedPager<M>: Send + Sync {
    async fn fetch(&self) -> Result<()>;
    async fn load_more(&self) -> Result<()>;
    async fn load_previous(&self) -> Result<()>;
    async fn load_all(&self) -> Result<()>;
    async fn refetch(&self) -> Result<()>;
    fn cancel(&self);
    fn can_load_next(&self) -> bool;
    fn can_load_previous(&self) -> bool;
    fn subscribe(&self, callback: AnyCallback<M>) -> Subscription;
    fn current(&self) -> Option<AnyUpdate<M>>;
}

struct Erased<I: Query, P: Query, Info: PageInfo, M> {
    pager: QueryPager<I, P, Info>,
    transforms: Arc<Transforms<I, P, M>>,
}

#[async_trait]
impl<I, P, Info, M> ErasedPager<M> for Erased<I, P, Info, M>
where
    I: Query,
    P: Query,
    Info: PageInfo,
    M: Send + Sync + 'static,
{
    async fn fetch(&self) -> Result<()> {
        self.pager.fetch().await
    }

    async fn load_more(&self) -> Result<()> {
        self.pager.load_more().await
    }

    async fn load_previous(&self) -> Result<()> {
        self.pager.load_previous().await
    }

    async fn load_all(&self) -> Result<()> {
        self.pager.load_all().await
    }

    async fn refetch(&self) -> Result<()> {
        self.pager.refetch().await
    }

    fn cancel(&self) {
        self.pager.cancel();
    }

    fn can_load_next(&self) -> bool {
        self.pager.can_load_next()
    }

    fn can_load_previous(&self) -> bool {
        self.pager.can_load_previous()
    }

    fn subscribe(&self, callback: AnyCallback<M>) -> Subscription {
        let transforms = Arc::clone(&self.transforms);
        self.pager
            .subscribe(move |update| callback(&transforms.apply(update)))
    }

    fn current(&self) -> Option<AnyUpdate<M>> {
        self.pager
            .current()
            .map(|update| self.transforms.apply(&update))
    }
}

/// A pager reduced to a flat list of `M`
pub struct AnyQueryPager<M> {
    inner: Arc<dyn ErasedPager<M>>,
}

impl<M> Clone for AnyQueryPager<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: Send + Sync + 'static> AnyQueryPager<M> {
    /// Fetch the initial page
    pub async fn fetch(&self) -> Result<()> {
        self.inner.fetch().await
    }

    /// Load the next page
    pub async fn load_more(&self) -> Result<()> {
        self.inner.load_more().await
    }

    /// Load the previous page
    pub async fn load_previous(&self) -> Result<()> {
        self.inner.load_previous().await
    }

    /// Load every page in both directions
    pub async fn load_all(&self) -> Result<()> {
        self.inner.load_all().await
    }

    /// Reset and fetch the initial page again
    pub async fn refetch(&self) -> Result<()> {
        self.inner.refetch().await
    }

    /// Reset all pagination state
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub fn can_load_next(&self) -> bool {
        self.inner.can_load_next()
    }

    pub fn can_load_previous(&self) -> bool {
        self.inner.can_load_previous()
    }

    /// Register a callback for every transformed update
    pub fn subscribe<F>(&self, on_update: F) -> Subscription
    where
        F: Fn(&AnyUpdate<M>) + Send + Sync + 'static,
    {
        self.inner.subscribe(Arc::new(on_update))
    }

    /// Latest update, transformed
    pub fn current(&self) -> Option<AnyUpdate<M>> {
        self.inner.current()
    }
}

impl<I: Query, P: Query, Info: PageInfo> QueryPager<I, P, Info> {
    /// Erase the query types, flattening pages into `M` values
    pub fn erase<M, FI, FP>(self, initial_transform: FI, page_transform: FP) -> AnyQueryPager<M>
    where
        M: Send + Sync + 'static,
        FI: Fn(&I::Data) -> anyhow::Result<Vec<M>> + Send + Sync + 'static,
        FP: Fn(&P::Data) -> anyhow::Result<Vec<M>> + Send + Sync + 'static,
    {
        AnyQueryPager {
            inner: Arc::new(Erased {
                pager: self,
                transforms: Arc::new(Transforms {
                    initial: Arc::new(initial_transform),
                    page: Arc::new(page_transform),
                }),
            }),
        }
    }
}

impl<I, P, Info> QueryPager<I, P, Info>
where
    I: Query,
    P: Query<Data = I::Data>,
    Info: PageInfo,
{
    /// Erase with one transform shared by the initial and follow-up pages
    pub fn erase_uniform<M, F>(self, transform: F) -> AnyQueryPager<M>
    where
        M: Send + Sync + 'static,
        F: Fn(&I::Data) -> anyhow::Result<Vec<M>> + Send + Sync + 'static,
    {
        let transform: Transform<I::Data, M> = Arc::new(transform);
        AnyQueryPager {
            inner: Arc::new(Erased {
                pager: self,
                transforms: Arc::new(Transforms {
                    initial: Arc::clone(&transform),
                    page: transform,
                }),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::{CursorPaths, JsonCursorPagination};
    use crate::query::OperationQuery;
    use crate::source::{InMemorySource, ScriptedPage};
    use crate::types::JsonValue;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Mutex;

    type Feed = OperationQuery<JsonValue>;

    fn source() -> InMemorySource {
        let source = InMemorySource::new();
        source.insert_query(
            &Feed::new("Feed"),
            ScriptedPage::network(json!({"names": ["a", "b"], "hasNext": true, "next": "c1"})),
        );
        source.insert_query(
            &Feed::new("FeedPage").variable("after", "c1"),
            ScriptedPage::network(json!({"names": ["c", 7]})),
        );
        source
    }

    fn names(page: &JsonValue) -> anyhow::Result<Vec<String>> {
        page["names"]
            .as_array()
            .into_iter()
            .flatten()
            .map(|name| {
                name.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| anyhow::anyhow!("name is not a string: {name}"))
            })
            .collect()
    }

    fn pager(source: &InMemorySource) -> AnyQueryPager<String> {
        let strategy = JsonCursorPagination::new("FeedPage").with_forward(CursorPaths::new(
            "hasNext",
            "next",
            "after",
        ));
        QueryPager::builder(source.clone(), Feed::new("Feed"))
            .with_strategy(strategy)
            .build()
            .unwrap()
            .erase_uniform(names)
    }

    #[tokio::test]
    async fn test_flattens_initial_and_pages() {
        let source = source();
        source.insert_query(
            &Feed::new("FeedPage").variable("after", "c1"),
            ScriptedPage::network(json!({"names": ["c"]})),
        );
        let pager = pager(&source);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = pager.subscribe(move |update| {
            sink.lock().unwrap().push(update.clone().unwrap().items);
        });

        pager.fetch().await.unwrap();
        assert!(pager.can_load_next());
        pager.load_more().await.unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![vec!["a".to_string(), "b".to_string()], vec!["a".into(), "b".into(), "c".into()]]
        );
        assert!(!pager.can_load_next());
    }

    #[tokio::test]
    async fn test_transform_failure_fails_notification() {
        let source = source();
        let pager = pager(&source);

        pager.fetch().await.unwrap();
        pager.load_more().await.unwrap();

        let error = pager.current().unwrap().unwrap_err();
        assert!(matches!(error.downcast_ref::<Error>(), Some(Error::Transform(_))));
    }

    #[tokio::test]
    async fn test_distinct_transforms() {
        let source = source();
        let strategy = JsonCursorPagination::new("FeedPage")
            .with_forward(CursorPaths::new("hasNext", "next", "after"));
        let pager = QueryPager::builder(source.clone(), Feed::new("Feed"))
            .with_strategy(strategy)
            .build()
            .unwrap()
            .erase(|_: &JsonValue| Ok(vec![0usize]), |page: &JsonValue| {
                Ok(vec![page["names"].as_array().map_or(0, Vec::len)])
            });

        pager.load_all().await.unwrap();
        let output = pager.current().unwrap().unwrap();
        assert_eq!(output.items, vec![0, 2]);
    }
}
