//! Pager configuration
//!
//! Default cache policies for the initial fetch, follow-up loads and
//! refetches. Loadable from YAML so fixtures and applications can share it.

use crate::error::{Error, Result};
use crate::types::CachePolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration for a [`QueryPager`](crate::pager::QueryPager)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagerConfig {
    /// Policy used by `fetch()` and `load_all()` for the initial query
    pub initial_cache_policy: CachePolicy,

    /// Policy used by `load_more()` / `load_previous()`
    pub page_cache_policy: CachePolicy,

    /// Policy used by `refetch()`
    pub refetch_cache_policy: CachePolicy,
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            initial_cache_policy: CachePolicy::ReturnCacheDataAndFetch,
            page_cache_policy: CachePolicy::FetchIgnoringCacheData,
            refetch_cache_policy: CachePolicy::FetchIgnoringCacheData,
        }
    }
}

impl PagerConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial fetch policy
    #[must_use]
    pub fn initial_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.initial_cache_policy = policy;
        self
    }

    /// Set the follow-up page policy
    #[must_use]
    pub fn page_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.page_cache_policy = policy;
        self
    }

    /// Set the refetch policy
    #[must_use]
    pub fn refetch_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.refetch_cache_policy = policy;
        self
    }

    /// Parse a configuration from YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Failed to parse pager config YAML: {e}")))
    }

    /// Load a configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read pager config '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PagerConfig::default();
        assert_eq!(
            config.initial_cache_policy,
            CachePolicy::ReturnCacheDataAndFetch
        );
        assert_eq!(config.page_cache_policy, CachePolicy::FetchIgnoringCacheData);
        assert_eq!(
            config.refetch_cache_policy,
            CachePolicy::FetchIgnoringCacheData
        );
    }

    #[test]
    fn test_builder_methods() {
        let config = PagerConfig::new()
            .initial_cache_policy(CachePolicy::FetchIgnoringCacheData)
            .page_cache_policy(CachePolicy::ReturnCacheDataElseFetch);
        assert_eq!(
            config.initial_cache_policy,
            CachePolicy::FetchIgnoringCacheData
        );
        assert_eq!(
            config.page_cache_policy,
            CachePolicy::ReturnCacheDataElseFetch
        );
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = PagerConfig::from_yaml_str("page_cache_policy: return_cache_data_and_fetch\n")
            .unwrap();
        assert_eq!(
            config.page_cache_policy,
            CachePolicy::ReturnCacheDataAndFetch
        );
        assert_eq!(
            config.initial_cache_policy,
            CachePolicy::ReturnCacheDataAndFetch
        );
    }

    #[test]
    fn test_invalid_yaml() {
        let err = PagerConfig::from_yaml_str("initial_cache_policy: sometimes").unwrap_err();
        assert!(err.to_string().contains("Failed to parse pager config YAML"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "refetch_cache_policy: return_cache_data_dont_fetch").unwrap();

        let config = PagerConfig::from_file(file.path()).unwrap();
        assert_eq!(
            config.refetch_cache_policy,
            CachePolicy::ReturnCacheDataDontFetch
        );
    }

    #[test]
    fn test_missing_file() {
        let err = PagerConfig::from_file("/nonexistent/pager.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read pager config"));
    }
}
