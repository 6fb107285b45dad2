//! In-memory scripted data source
//!
//! Serves JSON responses scripted per (operation name, page key) and
//! honours cache policies the way a normalized-cache client would.

use super::types::{DataSource, QueryResponse, QueryWatch, WatchHandle};
use crate::query::{PageKey, Query, Variables};
use crate::types::{CachePolicy, JsonValue, UpdateSource};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, trace};

type EntryKey = (String, PageKey);
type RawResponse = QueryResponse<JsonValue>;

/// Scripted responses for one (operation, variables) pair
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptedPage {
    /// Data served from the cache, if any
    #[serde(default)]
    pub cache: Option<JsonValue>,

    /// Data served by the network, if any
    #[serde(default)]
    pub network: Option<JsonValue>,

    /// Number of leading network attempts that fail
    #[serde(default)]
    pub failures: u32,

    /// Message used for failed network attempts
    #[serde(default)]
    pub error: Option<String>,

    /// Record executions but emit nothing until released
    #[serde(default)]
    pub hold: bool,
}

impl ScriptedPage {
    /// Page served only by the network
    pub fn network(data: JsonValue) -> Self {
        Self {
            network: Some(data),
            ..Default::default()
        }
    }

    /// Page served only from the cache
    pub fn cached(data: JsonValue) -> Self {
        Self {
            cache: Some(data),
            ..Default::default()
        }
    }

    /// Add cached data
    #[must_use]
    pub fn with_cache(mut self, data: JsonValue) -> Self {
        self.cache = Some(data);
        self
    }

    /// Fail the first `attempts` network requests with `message`
    #[must_use]
    pub fn failing(mut self, attempts: u32, message: impl Into<String>) -> Self {
        self.failures = attempts;
        self.error = Some(message.into());
        self
    }

    /// Hold responses until [`InMemorySource::release`] is called
    #[must_use]
    pub fn held(mut self) -> Self {
        self.hold = true;
        self
    }
}

#[derive(Debug, Default)]
struct Entry {
    page: ScriptedPage,
    network_attempts: u32,
    requests: usize,
}

struct LiveWatch {
    id: u64,
    key: EntryKey,
    policy: CachePolicy,
    sender: mpsc::UnboundedSender<RawResponse>,
}

#[derive(Default)]
struct SourceState {
    entries: HashMap<EntryKey, Entry>,
    live: Vec<LiveWatch>,
    next_id: u64,
    total_requests: usize,
}

impl SourceState {
    fn record_request(&mut self, key: &EntryKey) {
        self.total_requests += 1;
        if let Some(entry) = self.entries.get_mut(key) {
            entry.requests += 1;
        }
    }

    /// Responses for one request under `policy`
    fn respond(&mut self, key: &EntryKey, policy: CachePolicy) -> Vec<RawResponse> {
        let Some(entry) = self.entries.get_mut(key) else {
            return vec![RawResponse::failure(
                UpdateSource::Network,
                anyhow::anyhow!("No scripted response for {} {}", key.0, key.1),
            )];
        };

        if entry.page.hold {
            return Vec::new();
        }

        let cached = entry.page.cache.clone();
        match policy {
            CachePolicy::ReturnCacheDataAndFetch => {
                let mut responses: Vec<_> = cached.map(RawResponse::cache).into_iter().collect();
                responses.push(entry.network_response());
                responses
            }
            CachePolicy::ReturnCacheDataElseFetch => match cached {
                Some(data) => vec![RawResponse::cache(data)],
                None => vec![entry.network_response()],
            },
            CachePolicy::ReturnCacheDataDontFetch => match cached {
                Some(data) => vec![RawResponse::cache(data)],
                None => vec![RawResponse::empty(UpdateSource::Cache)],
            },
            CachePolicy::FetchIgnoringCacheData | CachePolicy::FetchIgnoringCacheCompletely => {
                vec![entry.network_response()]
            }
        }
    }

    fn send(&mut self, watch_id: u64, responses: Vec<RawResponse>) {
        if let Some(live) = self.live.iter().find(|w| w.id == watch_id) {
            for response in responses {
                if live.sender.send(response).is_err() {
                    trace!(watch_id, "Watch receiver dropped");
                    break;
                }
            }
        }
    }
}

impl Entry {
    fn network_response(&mut self) -> RawResponse {
        self.network_attempts += 1;
        if self.network_attempts <= self.page.failures {
            let message = self
                .page
                .error
                .clone()
                .unwrap_or_else(|| "network request failed".to_string());
            return RawResponse::failure(UpdateSource::Network, anyhow::anyhow!(message));
        }
        match &self.page.network {
            Some(data) => RawResponse::network(data.clone()),
            None => RawResponse::empty(UpdateSource::Network),
        }
    }
}

fn lock(state: &Mutex<SourceState>) -> MutexGuard<'_, SourceState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scripted data source serving JSON pages
///
/// Implements [`DataSource`] for every query whose data can be
/// deserialized from JSON. Cloning shares the same script and counters.
#[derive(Clone, Default)]
pub struct InMemorySource {
    state: Arc<Mutex<SourceState>>,
}

impl InMemorySource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the responses for an operation and its variables
    pub fn insert(&self, operation: impl Into<String>, variables: &Variables, page: ScriptedPage) {
        let key = (operation.into(), PageKey::from_variables(variables));
        let mut state = lock(&self.state);
        let entry = state.entries.entry(key).or_default();
        entry.page = page;
        entry.network_attempts = 0;
    }

    /// Script the responses for a query
    pub fn insert_query<Q: Query>(&self, query: &Q, page: ScriptedPage) {
        self.insert(query.operation_name(), &query.variables(), page);
    }

    /// Number of requests (executions and refetches) issued for a query
    pub fn request_count<Q: Query>(&self, query: &Q) -> usize {
        let key = (query.operation_name().to_string(), query.page_key());
        lock(&self.state)
            .entries
            .get(&key)
            .map_or(0, |entry| entry.requests)
    }

    /// Number of requests issued across all queries
    pub fn total_requests(&self) -> usize {
        lock(&self.state).total_requests
    }

    /// Number of watches that have not been cancelled
    pub fn active_watches(&self) -> usize {
        lock(&self.state)
            .live
            .iter()
            .filter(|w| !w.sender.is_closed())
            .count()
    }

    /// Stop holding a query and answer every live watch on it
    pub fn release<Q: Query>(&self, query: &Q) {
        let key = (query.operation_name().to_string(), query.page_key());
        let mut state = lock(&self.state);
        if let Some(entry) = state.entries.get_mut(&key) {
            entry.page.hold = false;
        }
        let watches: Vec<(u64, CachePolicy)> = state
            .live
            .iter()
            .filter(|w| w.key == key)
            .map(|w| (w.id, w.policy))
            .collect();
        for (id, policy) in watches {
            let responses = state.respond(&key, policy);
            state.send(id, responses);
        }
    }

    /// Push a response to every live watch on a query
    pub fn emit<Q: Query>(&self, query: &Q, response: QueryResponse<JsonValue>) {
        let key = (query.operation_name().to_string(), query.page_key());
        let state = lock(&self.state);
        for live in state.live.iter().filter(|w| w.key == key) {
            let _ = live.sender.send(response.clone());
        }
    }
}

impl<Q> DataSource<Q> for InMemorySource
where
    Q: Query,
    Q::Data: DeserializeOwned,
{
    fn execute(&self, query: &Q, policy: CachePolicy) -> QueryWatch<Q::Data> {
        let key: EntryKey = (query.operation_name().to_string(), query.page_key());
        let mut state = lock(&self.state);
        state.next_id += 1;
        let id = state.next_id;

        let handle = Arc::new(MemoryWatchHandle {
            state: Arc::clone(&self.state),
            id,
        });
        let (sender, raw) = QueryWatch::<JsonValue>::channel(handle);
        debug!(operation = %key.0, key = %key.1, ?policy, "Executing scripted query");

        state.live.push(LiveWatch {
            id,
            key: key.clone(),
            policy,
            sender,
        });
        state.record_request(&key);
        let responses = state.respond(&key, policy);
        state.send(id, responses);

        QueryWatch {
            responses: raw.responses.map(decode::<Q::Data>).boxed(),
            handle: raw.handle,
        }
    }
}

fn decode<D: DeserializeOwned>(response: RawResponse) -> QueryResponse<D> {
    let source = response.source;
    match response.result {
        Ok(Some(value)) => match serde_json::from_value(value) {
            Ok(data) => QueryResponse::data(source, data),
            Err(e) => QueryResponse::failure(source, e),
        },
        Ok(None) => QueryResponse::empty(source),
        Err(e) => QueryResponse {
            source,
            result: Err(e),
        },
    }
}

struct MemoryWatchHandle {
    state: Arc<Mutex<SourceState>>,
    id: u64,
}

impl WatchHandle for MemoryWatchHandle {
    fn refetch(&self, policy: CachePolicy) {
        let mut state = lock(&self.state);
        let Some(live) = state.live.iter_mut().find(|w| w.id == self.id) else {
            return;
        };
        live.policy = policy;
        let key = live.key.clone();
        state.record_request(&key);
        let responses = state.respond(&key, policy);
        state.send(self.id, responses);
    }

    fn cancel(&self) {
        let mut state = lock(&self.state);
        state.live.retain(|w| w.id != self.id);
    }
}
