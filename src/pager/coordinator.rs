//! Pagination coordinator
//!
//! [`QueryPager`] owns all pagination state. Every state transition goes
//! through one mutex-guarded block; read-only queries go through a
//! published snapshot instead and never take that lock.

use super::page_map::OrderedPageMap;
use super::types::{
    Operation, PagerOutput, PagerUpdate, Settlement, SubscriberList, Subscription,
};
use crate::config::PagerConfig;
use crate::error::{Error, Result, SourceError};
use crate::pagination::{PageExtraction, PageInfo, PageInfoExtractor, PageResolver};
use crate::query::{PageKey, Query};
use crate::source::{DataSource, QueryResponse, QueryWatch, WatchHandle};
use crate::types::{CachePolicy, Direction, UpdateSource};
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// A watched query owned by the coordinator
struct WatchSlot {
    id: u64,
    /// Operation this watch settles when its next settling response arrives
    pending: Option<u64>,
    policy: CachePolicy,
    handle: Arc<dyn WatchHandle>,
    task: JoinHandle<()>,
}

impl WatchSlot {
    fn tear_down(self) {
        self.handle.cancel();
        self.task.abort();
    }
}

struct InFlight {
    op: u64,
    operation: Operation,
    settled: watch::Sender<Option<Settlement>>,
}

struct PagerState<I, P> {
    /// Bumped by every cancel; watches from older epochs are stale
    epoch: u64,
    next_id: u64,
    initial_page: Option<I>,
    pages: OrderedPageMap<P>,
    initial_watch: Option<WatchSlot>,
    page_watches: Vec<WatchSlot>,
    in_flight: Option<InFlight>,
    /// Token of the running `load_all`, if any
    bulk: Option<u64>,
    suppressed: Option<PagerUpdate<I, P>>,
    outbox: VecDeque<PagerUpdate<I, P>>,
}

impl<I: Clone, P: Clone> PagerState<I, P> {
    fn new() -> Self {
        Self {
            epoch: 0,
            next_id: 0,
            initial_page: None,
            pages: OrderedPageMap::new(),
            initial_watch: None,
            page_watches: Vec::new(),
            in_flight: None,
            bulk: None,
            suppressed: None,
            outbox: VecDeque::new(),
        }
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn begin(&mut self, operation: Operation) -> (u64, watch::Receiver<Option<Settlement>>) {
        let op = self.allocate_id();
        let (settled, receiver) = watch::channel(None);
        self.in_flight = Some(InFlight {
            op,
            operation,
            settled,
        });
        (op, receiver)
    }

    /// Release the in-flight lock if it still belongs to `op`
    fn settle(&mut self, op: u64, outcome: Settlement) {
        if self.in_flight.as_ref().is_some_and(|f| f.op == op) {
            if let Some(in_flight) = self.in_flight.take() {
                debug!(operation = %in_flight.operation, ?outcome, "Operation settled");
                in_flight.settled.send_replace(Some(outcome));
            }
        }
    }

    fn initial_slot(&mut self, epoch: u64, id: u64) -> Option<&mut WatchSlot> {
        if self.epoch != epoch {
            return None;
        }
        self.initial_watch.as_mut().filter(|slot| slot.id == id)
    }

    fn page_slot(&mut self, epoch: u64, id: u64) -> Option<&mut WatchSlot> {
        if self.epoch != epoch {
            return None;
        }
        self.page_watches.iter_mut().find(|slot| slot.id == id)
    }

    fn output(&self, source: UpdateSource) -> Option<PagerOutput<I, P>> {
        let initial = self.initial_page.clone()?;
        Some(PagerOutput {
            initial,
            pages: self.pages.values().cloned().collect(),
            source,
        })
    }
}

/// Lock-free view for read-only queries
struct Snapshot<I, P> {
    latest: Option<PagerUpdate<I, P>>,
    can_load_more: bool,
    can_load_previous: bool,
    page_count: usize,
}

impl<I, P> Snapshot<I, P> {
    fn empty() -> Self {
        Self {
            latest: None,
            can_load_more: false,
            can_load_previous: false,
            page_count: 0,
        }
    }
}

pub(crate) struct PagePolicy<I: Query, P: Query, Info> {
    pub(crate) extract: PageInfoExtractor<I::Data, P::Data, Info>,
    pub(crate) next: Option<PageResolver<Info, P>>,
    pub(crate) previous: Option<PageResolver<Info, P>>,
}

struct Shared<I: Query, P: Query, Info> {
    initial_query: I,
    initial_source: Arc<dyn DataSource<I>>,
    page_source: Arc<dyn DataSource<P>>,
    policy: PagePolicy<I, P, Info>,
    config: PagerConfig,
    state: Mutex<PagerState<I::Data, P::Data>>,
    snapshot: watch::Sender<Snapshot<I::Data, P::Data>>,
    subscribers: Arc<SubscriberList<PagerUpdate<I::Data, P::Data>>>,
    /// Serializes subscriber delivery so updates arrive in settlement order
    dispatch: Mutex<()>,
}

/// Bidirectional pagination coordinator
///
/// Turns one initial query plus follow-up "load more" / "load previous"
/// queries into a single ordered, continuously updated view. At most one
/// mutating operation is in flight at a time; a second one fails with
/// [`Error::LoadInProgress`] (a concurrent `fetch` joins the running
/// initial fetch instead).
///
/// Dropping the pager cancels it and releases every subscriber callback.
///
/// Forward and backward pages share one ordered sequence: backward pages
/// are inserted at the head and forward pages appended at the tail, so
/// `pages` in [`PagerOutput`] reads oldest-to-newest by insertion edge
/// rather than grouped by direction.
pub struct QueryPager<I: Query, P: Query, Info: PageInfo> {
    shared: Arc<Shared<I, P, Info>>,
}

impl<I: Query, P: Query, Info: PageInfo> QueryPager<I, P, Info> {
    pub(crate) fn from_parts(
        initial_query: I,
        initial_source: Arc<dyn DataSource<I>>,
        page_source: Arc<dyn DataSource<P>>,
        policy: PagePolicy<I, P, Info>,
        config: PagerConfig,
    ) -> Self {
        let (snapshot, _) = watch::channel(Snapshot::empty());
        Self {
            shared: Arc::new(Shared {
                initial_query,
                initial_source,
                page_source,
                policy,
                config,
                state: Mutex::new(PagerState::new()),
                snapshot,
                subscribers: Arc::new(SubscriberList::default()),
                dispatch: Mutex::new(()),
            }),
        }
    }

    /// Configuration this pager was built with
    pub fn config(&self) -> &PagerConfig {
        &self.shared.config
    }

    /// The initial query
    pub fn initial_query(&self) -> &I {
        &self.shared.initial_query
    }

    // ========================================================================
    // Mutating operations
    // ========================================================================

    /// Fetch the initial page under the configured initial policy
    ///
    /// Resolves once the fetch settles: a cache hit under
    /// `ReturnCacheDataAndFetch` is published immediately but the call keeps
    /// waiting for the network response.
    pub async fn fetch(&self) -> Result<()> {
        self.shared.fetch(self.shared.config.initial_cache_policy).await
    }

    /// Fetch the initial page under `policy`
    pub async fn fetch_with_policy(&self, policy: CachePolicy) -> Result<()> {
        self.shared.fetch(policy).await
    }

    /// Load the page after the newest known page
    pub async fn load_more(&self) -> Result<()> {
        self.shared
            .load_page(Direction::Forward, self.shared.config.page_cache_policy)
            .await
    }

    /// Load the page after the newest known page under `policy`
    pub async fn load_more_with_policy(&self, policy: CachePolicy) -> Result<()> {
        self.shared.load_page(Direction::Forward, policy).await
    }

    /// Load the page before the oldest known page
    pub async fn load_previous(&self) -> Result<()> {
        self.shared
            .load_page(Direction::Backward, self.shared.config.page_cache_policy)
            .await
    }

    /// Load the page before the oldest known page under `policy`
    pub async fn load_previous_with_policy(&self, policy: CachePolicy) -> Result<()> {
        self.shared.load_page(Direction::Backward, policy).await
    }

    /// Fetch, then load forward until exhausted, then backward until exhausted
    ///
    /// Subscribers receive a single notification once the sequence halts.
    /// The first error stops the sequence. A second `load_all` while one is
    /// running fails with [`Error::LoadInProgress`].
    pub async fn load_all(&self) -> Result<()> {
        self.shared.load_all().await
    }

    /// Tear everything down and fetch the initial page again
    pub async fn refetch(&self) -> Result<()> {
        self.refetch_with_policy(self.shared.config.refetch_cache_policy)
            .await
    }

    /// Tear everything down and fetch the initial page again under `policy`
    pub async fn refetch_with_policy(&self, policy: CachePolicy) -> Result<()> {
        self.shared.cancel();
        self.shared.fetch(policy).await
    }

    /// Hard reset: drop all pages and watches, resolve any awaiting caller
    /// with [`Error::Cancelled`]. Idempotent.
    ///
    /// Subscribers stay registered.
    pub fn cancel(&self) {
        self.shared.cancel();
    }

    // ========================================================================
    // Subscriptions and read-only queries
    // ========================================================================

    /// Register a callback for every settled aggregate or failure
    ///
    /// Updates produced while `load_all` runs are held back until it halts.
    pub fn subscribe<F>(&self, on_update: F) -> Subscription
    where
        F: Fn(&PagerUpdate<I::Data, P::Data>) + Send + Sync + 'static,
    {
        self.shared.subscribers.subscribe(Arc::new(on_update))
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.len()
    }

    /// Whether the newest known page reports more content
    pub fn can_load_next(&self) -> bool {
        self.shared.snapshot.borrow().can_load_more
    }

    /// Whether the oldest known page reports earlier content
    pub fn can_load_previous(&self) -> bool {
        self.shared.snapshot.borrow().can_load_previous
    }

    /// Number of follow-up pages loaded
    pub fn page_count(&self) -> usize {
        self.shared.snapshot.borrow().page_count
    }

    /// Most recent aggregate or failure
    pub fn current(&self) -> Option<PagerUpdate<I::Data, P::Data>> {
        self.shared.snapshot.borrow().latest.clone()
    }

    /// Whether a mutating operation is in flight
    pub fn is_loading(&self) -> bool {
        self.shared.lock().in_flight.is_some()
    }
}

impl<I: Query, P: Query, Info: PageInfo> Drop for QueryPager<I, P, Info> {
    fn drop(&mut self) {
        self.shared.cancel();
        self.shared.subscribers.clear();
    }
}

impl<I: Query, P: Query, Info: PageInfo> Shared<I, P, Info> {
    fn lock(&self) -> MutexGuard<'_, PagerState<I::Data, P::Data>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================================================
    // Page info
    // ========================================================================

    /// Page info for `direction`: the last page for forward, the first for
    /// backward, the initial page when no follow-up page exists
    fn page_info(&self, state: &PagerState<I::Data, P::Data>, direction: Direction) -> Option<Info> {
        let edge = match direction {
            Direction::Forward => state.pages.last(),
            Direction::Backward => state.pages.first(),
        };
        match edge {
            Some(page) => Some((self.policy.extract)(PageExtraction::Paginated(page))),
            None => state
                .initial_page
                .as_ref()
                .map(|initial| (self.policy.extract)(PageExtraction::Initial(initial))),
        }
    }

    fn resolver(&self, direction: Direction) -> Option<&PageResolver<Info, P>> {
        match direction {
            Direction::Forward => self.policy.next.as_ref(),
            Direction::Backward => self.policy.previous.as_ref(),
        }
    }

    // ========================================================================
    // Publishing
    // ========================================================================

    fn refresh_snapshot(&self, state: &PagerState<I::Data, P::Data>) {
        let can_load_more = self
            .page_info(state, Direction::Forward)
            .is_some_and(|info| info.can_load_more());
        let can_load_previous = self
            .page_info(state, Direction::Backward)
            .is_some_and(|info| info.can_load_previous());
        let page_count = state.pages.len();
        self.snapshot.send_modify(|snapshot| {
            snapshot.can_load_more = can_load_more;
            snapshot.can_load_previous = can_load_previous;
            snapshot.page_count = page_count;
        });
    }

    fn publish(&self, state: &mut PagerState<I::Data, P::Data>, update: PagerUpdate<I::Data, P::Data>) {
        self.snapshot
            .send_modify(|snapshot| snapshot.latest = Some(update.clone()));
        if state.bulk.is_some() {
            trace!("Holding update back during load_all");
            state.suppressed = Some(update);
        } else {
            state.outbox.push_back(update);
        }
    }

    /// Deliver queued updates to subscribers, in queue order
    fn flush(&self) {
        let _dispatching = self.dispatch.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            let next = self.lock().outbox.pop_front();
            let Some(update) = next else {
                break;
            };
            self.subscribers.notify(&update);
        }
    }

    async fn wait(&self, mut settled: watch::Receiver<Option<Settlement>>) -> Result<()> {
        let outcome = settled
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|outcome| outcome.clone());
        self.flush();
        match outcome {
            Some(Settlement::Succeeded) => Ok(()),
            Some(Settlement::Failed(error)) => Err(Error::DataSource(error)),
            Some(Settlement::Cancelled) | None => Err(Error::Cancelled),
        }
    }

    // ========================================================================
    // Operations
    // ========================================================================

    async fn fetch(self: &Arc<Self>, policy: CachePolicy) -> Result<()> {
        let settled = {
            let mut guard = self.lock();
            let state = &mut *guard;
            if let Some(in_flight) = &state.in_flight {
                if in_flight.operation != Operation::Fetch {
                    return Err(Error::LoadInProgress);
                }
                debug!("Joining in-flight initial fetch");
                in_flight.settled.subscribe()
            } else {
                let (op, settled) = state.begin(Operation::Fetch);
                match state.initial_watch.as_mut() {
                    Some(slot) => {
                        debug!(?policy, "Re-triggering initial query");
                        slot.pending = Some(op);
                        slot.policy = policy;
                        slot.handle.refetch(policy);
                    }
                    None => {
                        debug!(
                            operation = self.initial_query.operation_name(),
                            ?policy,
                            "Fetching initial page"
                        );
                        let slot = self.watch_initial(state, op, policy);
                        state.initial_watch = Some(slot);
                    }
                }
                settled
            }
        };
        self.wait(settled).await
    }

    async fn load_page(self: &Arc<Self>, direction: Direction, policy: CachePolicy) -> Result<()> {
        let settled = {
            let mut guard = self.lock();
            let state = &mut *guard;
            let info = self
                .page_info(state, direction)
                .ok_or(Error::MissingInitialPage)?;
            if !info.can_load(direction) {
                return Err(Error::no_more_content(direction));
            }
            let query = self
                .resolver(direction)
                .and_then(|resolve| resolve(&info))
                .ok_or_else(|| Error::no_more_content(direction))?;
            if state.in_flight.is_some() {
                return Err(Error::LoadInProgress);
            }

            let operation = match direction {
                Direction::Forward => Operation::LoadMore,
                Direction::Backward => Operation::LoadPrevious,
            };
            let (op, settled) = state.begin(operation);
            debug!(
                operation = query.operation_name(),
                key = %query.page_key(),
                %direction,
                ?policy,
                "Loading page"
            );
            let slot = self.watch_page(state, op, &query, direction, policy);
            state.page_watches.push(slot);
            settled
        };
        self.wait(settled).await
    }

    async fn load_all(self: &Arc<Self>) -> Result<()> {
        let token = {
            let mut state = self.lock();
            if state.bulk.is_some() {
                return Err(Error::LoadInProgress);
            }
            let token = state.allocate_id();
            state.bulk = Some(token);
            token
        };

        let result = self.drive_load_all().await;

        {
            let mut state = self.lock();
            if state.bulk == Some(token) {
                state.bulk = None;
                if let Some(update) = state.suppressed.take() {
                    state.outbox.push_back(update);
                }
            }
        }
        self.flush();

        match &result {
            Ok(()) => debug!("load_all finished"),
            Err(e) => debug!(error = %e, "load_all halted"),
        }
        result
    }

    async fn drive_load_all(self: &Arc<Self>) -> Result<()> {
        self.fetch(self.config.initial_cache_policy).await?;

        for direction in [Direction::Forward, Direction::Backward] {
            while self.can_load(direction) {
                let before = self.snapshot.borrow().page_count;
                match self.load_page(direction, self.config.page_cache_policy).await {
                    Err(Error::NoMoreContent { .. }) => break,
                    other => other?,
                }
                if self.snapshot.borrow().page_count == before {
                    warn!(%direction, "Page load added no new page; stopping load_all");
                    break;
                }
            }
        }

        Ok(())
    }

    fn can_load(&self, direction: Direction) -> bool {
        let snapshot = self.snapshot.borrow();
        match direction {
            Direction::Forward => snapshot.can_load_more,
            Direction::Backward => snapshot.can_load_previous,
        }
    }

    fn cancel(&self) {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.epoch += 1;

        let watches = state.initial_watch.take().into_iter().chain(state.page_watches.drain(..));
        for slot in watches {
            slot.tear_down();
        }
        state.pages.clear();
        state.initial_page = None;
        state.bulk = None;
        state.suppressed = None;
        if let Some(in_flight) = state.in_flight.take() {
            debug!(operation = %in_flight.operation, "Cancelling in-flight operation");
            in_flight.settled.send_replace(Some(Settlement::Cancelled));
        }

        self.snapshot.send_replace(Snapshot::empty());
        trace!(epoch = state.epoch, "Pager reset");
    }

    // ========================================================================
    // Watches
    // ========================================================================

    fn watch_initial(
        self: &Arc<Self>,
        state: &mut PagerState<I::Data, P::Data>,
        op: u64,
        policy: CachePolicy,
    ) -> WatchSlot {
        let id = state.allocate_id();
        let epoch = state.epoch;
        let QueryWatch {
            mut responses,
            handle,
        } = self.initial_source.execute(&self.initial_query, policy);

        let shared = Arc::clone(self);
        let task = tokio::spawn(async move {
            while let Some(response) = responses.next().await {
                if !shared.apply_initial(epoch, id, response) {
                    return;
                }
                shared.flush();
            }
            shared.close_initial(epoch, id);
            shared.flush();
        });

        WatchSlot {
            id,
            pending: Some(op),
            policy,
            handle,
            task,
        }
    }

    fn watch_page(
        self: &Arc<Self>,
        state: &mut PagerState<I::Data, P::Data>,
        op: u64,
        query: &P,
        direction: Direction,
        policy: CachePolicy,
    ) -> WatchSlot {
        let id = state.allocate_id();
        let epoch = state.epoch;
        let key = query.page_key();
        let QueryWatch {
            mut responses,
            handle,
        } = self.page_source.execute(query, policy);

        let shared = Arc::clone(self);
        let task = tokio::spawn(async move {
            while let Some(response) = responses.next().await {
                if !shared.apply_page(epoch, id, &key, direction, response) {
                    return;
                }
                shared.flush();
            }
            shared.close_page(epoch, id);
            shared.flush();
        });

        WatchSlot {
            id,
            pending: Some(op),
            policy,
            handle,
            task,
        }
    }

    /// The initial watch's stream ended; a later `fetch` starts a new watch
    fn close_initial(&self, epoch: u64, id: u64) {
        let mut guard = self.lock();
        let state = &mut *guard;
        if state.initial_slot(epoch, id).is_none() {
            return;
        }
        if let Some(slot) = state.initial_watch.take() {
            debug!(watch = id, "Initial watch closed by data source");
            slot.handle.cancel();
            self.fail_closed(state, slot.pending);
        }
    }

    /// A page watch's stream ended
    fn close_page(&self, epoch: u64, id: u64) {
        let mut guard = self.lock();
        let state = &mut *guard;
        if state.epoch != epoch {
            return;
        }
        let Some(index) = state.page_watches.iter().position(|slot| slot.id == id) else {
            return;
        };
        let slot = state.page_watches.remove(index);
        debug!(watch = id, "Page watch closed by data source");
        slot.handle.cancel();
        self.fail_closed(state, slot.pending);
    }

    /// Settle an operation whose watch ended before a settling response
    fn fail_closed(&self, state: &mut PagerState<I::Data, P::Data>, pending: Option<u64>) {
        let Some(op) = pending else {
            return;
        };
        let error: SourceError = Arc::new(anyhow::anyhow!(
            "Data source closed the watch before it settled"
        ));
        warn!(error = %error, "Watch closed with an operation pending");
        self.publish(state, Err(Arc::clone(&error)));
        self.refresh_snapshot(state);
        state.settle(op, Settlement::Failed(error));
    }

    /// Merge an initial-query response; `false` when the watch is stale
    fn apply_initial(&self, epoch: u64, id: u64, response: QueryResponse<I::Data>) -> bool {
        let mut guard = self.lock();
        let state = &mut *guard;
        let Some(slot) = state.initial_slot(epoch, id) else {
            trace!(watch = id, "Discarding response from stale initial watch");
            return false;
        };
        let pending = if response.settles(slot.policy) {
            slot.pending.take()
        } else {
            None
        };

        let source = response.source;
        let outcome = match response.result {
            Ok(Some(data)) => {
                debug!(%source, "Initial page received");
                state.initial_page = Some(data);
                if let Some(output) = state.output(source) {
                    self.publish(state, Ok(output));
                }
                Settlement::Succeeded
            }
            Ok(None) => {
                debug!(%source, "Initial query returned no data");
                Settlement::Succeeded
            }
            Err(error) => {
                warn!(%source, error = %error, "Initial query failed");
                self.publish(state, Err(Arc::clone(&error)));
                Settlement::Failed(error)
            }
        };

        self.refresh_snapshot(state);
        if let Some(op) = pending {
            state.settle(op, outcome);
        }
        true
    }

    /// Merge a follow-up response; `false` when the watch is stale
    fn apply_page(
        &self,
        epoch: u64,
        id: u64,
        key: &PageKey,
        direction: Direction,
        response: QueryResponse<P::Data>,
    ) -> bool {
        let mut guard = self.lock();
        let state = &mut *guard;
        let Some(slot) = state.page_slot(epoch, id) else {
            trace!(watch = id, "Discarding response from stale page watch");
            return false;
        };
        let interim = !response.settles(slot.policy);

        let source = response.source;
        let (pending, outcome) = match response.result {
            Ok(Some(data)) => {
                let pending = if interim { None } else { slot.pending.take() };
                let inserted = state.pages.insert(direction, key.clone(), data);
                debug!(%key, %direction, %source, inserted, "Page merged");
                if let Some(output) = state.output(source) {
                    self.publish(state, Ok(output));
                }
                (pending, Settlement::Succeeded)
            }
            Ok(None) => {
                debug!(%key, %direction, %source, "Page query returned no data");
                (slot.pending.take(), Settlement::Succeeded)
            }
            Err(error) => {
                let pending = slot.pending.take();
                warn!(%key, %direction, %source, error = %error, "Page query failed");
                self.publish(state, Err(Arc::clone(&error)));
                (pending, Settlement::Failed(error))
            }
        };

        self.refresh_snapshot(state);
        if let Some(op) = pending {
            state.settle(op, outcome);
        }
        true
    }
}
