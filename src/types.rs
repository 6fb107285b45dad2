//! Common types used throughout Query Pager
//!
//! Cache policies, result origins and pagination directions shared by the
//! data source contract, the coordinator and the adapters.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

// ============================================================================
// Cache Policy
// ============================================================================

/// How a data source should combine its local cache and the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Serve cached data if present, otherwise fetch from the network
    ReturnCacheDataElseFetch,
    /// Always fetch from the network, writing the result to the cache
    FetchIgnoringCacheData,
    /// Always fetch from the network without touching the cache
    FetchIgnoringCacheCompletely,
    /// Serve cached data only, never hit the network
    ReturnCacheDataDontFetch,
    /// Serve cached data immediately, then refresh from the network
    #[default]
    ReturnCacheDataAndFetch,
}

impl CachePolicy {
    /// Whether a response from `source` under this policy is an interim
    /// result that will be followed by a network response
    pub fn is_interim(self, source: UpdateSource) -> bool {
        self == CachePolicy::ReturnCacheDataAndFetch && source == UpdateSource::Cache
    }

    /// Whether this policy may consult the cache
    pub fn reads_cache(self) -> bool {
        matches!(
            self,
            CachePolicy::ReturnCacheDataElseFetch
                | CachePolicy::ReturnCacheDataDontFetch
                | CachePolicy::ReturnCacheDataAndFetch
        )
    }
}

// ============================================================================
// Update Source
// ============================================================================

/// Origin of a settled response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateSource {
    /// Served from the local cache
    Cache,
    /// Served by a live network round trip
    Network,
}

impl fmt::Display for UpdateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateSource::Cache => f.write_str("cache"),
            UpdateSource::Network => f.write_str("network"),
        }
    }
}

// ============================================================================
// Direction
// ============================================================================

/// Pagination direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Load more: pages are appended at the tail
    Forward,
    /// Load previous: pages are inserted at the head
    Backward,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => f.write_str("forward"),
            Direction::Backward => f.write_str("backward"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_policy_default() {
        assert_eq!(CachePolicy::default(), CachePolicy::ReturnCacheDataAndFetch);
    }

    #[test]
    fn test_cache_policy_serde() {
        let policy: CachePolicy = serde_json::from_str("\"fetch_ignoring_cache_data\"").unwrap();
        assert_eq!(policy, CachePolicy::FetchIgnoringCacheData);

        let json = serde_json::to_string(&CachePolicy::ReturnCacheDataDontFetch).unwrap();
        assert_eq!(json, "\"return_cache_data_dont_fetch\"");
    }

    #[test]
    fn test_interim_only_for_cache_and_fetch() {
        assert!(CachePolicy::ReturnCacheDataAndFetch.is_interim(UpdateSource::Cache));
        assert!(!CachePolicy::ReturnCacheDataAndFetch.is_interim(UpdateSource::Network));
        assert!(!CachePolicy::ReturnCacheDataElseFetch.is_interim(UpdateSource::Cache));
        assert!(!CachePolicy::ReturnCacheDataDontFetch.is_interim(UpdateSource::Cache));
    }

    #[test]
    fn test_reads_cache() {
        assert!(CachePolicy::ReturnCacheDataElseFetch.reads_cache());
        assert!(!CachePolicy::FetchIgnoringCacheData.reads_cache());
        assert!(!CachePolicy::FetchIgnoringCacheCompletely.reads_cache());
    }

    #[test]
    fn test_display() {
        assert_eq!(UpdateSource::Cache.to_string(), "cache");
        assert_eq!(Direction::Backward.to_string(), "backward");
    }
}
