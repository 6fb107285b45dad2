//! Pager builder

use super::coordinator::{PagePolicy, QueryPager};
use crate::config::PagerConfig;
use crate::error::{Error, Result};
use crate::pagination::{
    PageExtraction, PageInfo, PageInfoExtractor, PageResolver, PaginationStrategy,
};
use crate::query::Query;
use crate::source::DataSource;
use std::sync::Arc;

/// Builder for [`QueryPager`]
///
/// A page-info extractor is required; each resolver is optional and a
/// missing resolver means that direction never loads.
pub struct PagerBuilder<I: Query, P: Query, Info: PageInfo> {
    initial_query: I,
    initial_source: Arc<dyn DataSource<I>>,
    page_source: Arc<dyn DataSource<P>>,
    extract: Option<PageInfoExtractor<I::Data, P::Data, Info>>,
    next: Option<PageResolver<Info, P>>,
    previous: Option<PageResolver<Info, P>>,
    config: PagerConfig,
}

impl<I: Query, P: Query, Info: PageInfo> QueryPager<I, P, Info> {
    /// Start building a pager whose queries all run against `source`
    pub fn builder<S>(source: S, initial_query: I) -> PagerBuilder<I, P, Info>
    where
        S: DataSource<I> + DataSource<P>,
    {
        let source = Arc::new(source);
        PagerBuilder::with_sources(
            initial_query,
            Arc::clone(&source) as Arc<dyn DataSource<I>>,
            source as Arc<dyn DataSource<P>>,
        )
    }
}

impl<I: Query, P: Query, Info: PageInfo> PagerBuilder<I, P, Info> {
    /// Start building with separate sources for the initial and follow-up queries
    pub fn with_sources(
        initial_query: I,
        initial_source: Arc<dyn DataSource<I>>,
        page_source: Arc<dyn DataSource<P>>,
    ) -> Self {
        Self {
            initial_query,
            initial_source,
            page_source,
            extract: None,
            next: None,
            previous: None,
            config: PagerConfig::default(),
        }
    }

    /// Set how page info is read from the initial and follow-up pages
    #[must_use]
    pub fn extract_page_info<F>(mut self, extract: F) -> Self
    where
        F: Fn(PageExtraction<'_, I::Data, P::Data>) -> Info + Send + Sync + 'static,
    {
        self.extract = Some(Arc::new(extract));
        self
    }

    /// Set the resolver for the page after the newest one
    #[must_use]
    pub fn next_page_resolver<F>(mut self, resolve: F) -> Self
    where
        F: Fn(&Info) -> Option<P> + Send + Sync + 'static,
    {
        self.next = Some(Arc::new(resolve));
        self
    }

    /// Set the resolver for the page before the oldest one
    #[must_use]
    pub fn previous_page_resolver<F>(mut self, resolve: F) -> Self
    where
        F: Fn(&Info) -> Option<P> + Send + Sync + 'static,
    {
        self.previous = Some(Arc::new(resolve));
        self
    }

    /// Use a strategy for extraction and both resolvers
    #[must_use]
    pub fn with_strategy<S>(mut self, strategy: S) -> Self
    where
        S: PaginationStrategy<I::Data, P::Data, Info = Info, Query = P>,
    {
        let strategy = Arc::new(strategy);

        let extractor = Arc::clone(&strategy);
        self.extract = Some(Arc::new(
            move |page: PageExtraction<'_, I::Data, P::Data>| extractor.extract(page),
        ));

        let forward = Arc::clone(&strategy);
        self.next = Some(Arc::new(move |info: &Info| forward.next_query(info)));

        self.previous = Some(Arc::new(move |info: &Info| strategy.previous_query(info)));
        self
    }

    /// Set the cache policies
    #[must_use]
    pub fn with_config(mut self, config: PagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the pager
    pub fn build(self) -> Result<QueryPager<I, P, Info>> {
        let extract = self
            .extract
            .ok_or_else(|| Error::config("A page info extractor is required"))?;
        if self.next.is_none() && self.previous.is_none() {
            tracing::warn!(
                operation = self.initial_query.operation_name(),
                "Pager built without resolvers; only the initial page will load"
            );
        }

        Ok(QueryPager::from_parts(
            self.initial_query,
            self.initial_source,
            self.page_source,
            PagePolicy {
                extract,
                next: self.next,
                previous: self.previous,
            },
            self.config,
        ))
    }
}
