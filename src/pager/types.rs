//! Pager types
//!
//! Aggregate output, update notifications and the subscriber registry.

use crate::error::SourceError;
use crate::types::UpdateSource;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Accumulated view of all loaded pages
#[derive(Debug, Clone, PartialEq)]
pub struct PagerOutput<I, P> {
    /// Result of the initial query
    pub initial: I,
    /// Follow-up pages in logical page order
    pub pages: Vec<P>,
    /// Origin of the most recently settled response
    pub source: UpdateSource,
}

/// Notification delivered to subscribers
pub type PagerUpdate<I, P> = std::result::Result<PagerOutput<I, P>, SourceError>;

/// Kind of mutating operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Initial fetch (joinable)
    Fetch,
    /// Load more
    LoadMore,
    /// Load previous
    LoadPrevious,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Fetch => f.write_str("fetch"),
            Operation::LoadMore => f.write_str("load_more"),
            Operation::LoadPrevious => f.write_str("load_previous"),
        }
    }
}

/// How an in-flight operation ended
#[derive(Debug, Clone)]
pub(crate) enum Settlement {
    Succeeded,
    Failed(SourceError),
    Cancelled,
}

// ============================================================================
// Subscribers
// ============================================================================

type Callback<U> = Arc<dyn Fn(&U) + Send + Sync>;

/// Registered update callbacks
pub(crate) struct SubscriberList<U> {
    entries: Mutex<Vec<(u64, Callback<U>)>>,
    next_id: AtomicU64,
}

impl<U> Default for SubscriberList<U> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<U: 'static> SubscriberList<U> {
    fn entries(&self) -> MutexGuard<'_, Vec<(u64, Callback<U>)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a callback, returning a guard that unregisters on drop
    pub(crate) fn subscribe(self: &Arc<Self>, callback: Callback<U>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries().push((id, callback));
        Subscription {
            id,
            registry: Some(Arc::clone(self) as Arc<dyn Unsubscribe>),
        }
    }

    /// Deliver an update to every subscriber, in registration order
    ///
    /// Callbacks run outside the registry lock, so they may subscribe or
    /// unsubscribe.
    pub(crate) fn notify(&self, update: &U) {
        let callbacks: Vec<Callback<U>> = self.entries().iter().map(|(_, cb)| Arc::clone(cb)).collect();
        for callback in callbacks {
            callback(update);
        }
    }

    /// Drop every callback; outstanding subscriptions become inert
    pub(crate) fn clear(&self) {
        let callbacks = std::mem::take(&mut *self.entries());
        drop(callbacks);
    }

    /// Number of registered subscribers
    pub(crate) fn len(&self) -> usize {
        self.entries().len()
    }
}

trait Unsubscribe: Send + Sync {
    fn unsubscribe(&self, id: u64);
}

impl<U: 'static> Unsubscribe for SubscriberList<U> {
    fn unsubscribe(&self, id: u64) {
        self.entries().retain(|(entry, _)| *entry != id);
    }
}

/// Handle to a registered subscriber
///
/// Dropping it stops delivery. Unsubscribing never touches pagination state.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    registry: Option<Arc<dyn Unsubscribe>>,
}

impl Subscription {
    /// Stop delivery now
    pub fn unsubscribe(mut self) {
        self.detach_from_registry();
    }

    /// Keep the subscriber registered for the pager's whole lifetime
    pub fn forget(mut self) {
        self.registry = None;
    }

    /// Identifier of this subscription
    pub fn id(&self) -> u64 {
        self.id
    }

    fn detach_from_registry(&mut self) {
        if let Some(registry) = self.registry.take() {
            registry.unsubscribe(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach_from_registry();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.registry.is_some())
            .finish()
    }
}
