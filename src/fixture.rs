//! Replay fixtures
//!
//! A fixture is a YAML document scripting an initial query, its follow-up
//! pages and the cursor policy that links them. Loading one yields an
//! [`InMemorySource`] and a ready-to-run [`QueryPager`] over JSON pages.
//!
//! ```yaml
//! config:
//!   initial_cache_policy: fetch_ignoring_cache_data
//! pagination:
//!   page_operation: FeedPage
//!   base_variables: { first: 2 }
//!   forward:
//!     flag_path: feed.pageInfo.hasNextPage
//!     cursor_path: feed.pageInfo.endCursor
//!     cursor_param: after
//! initial:
//!   operation: Feed
//!   variables: { first: 2 }
//!   page:
//!     network: { feed: { edges: [1, 2], pageInfo: { hasNextPage: true, endCursor: c1 } } }
//! pages:
//!   - variables: { first: 2, after: c1 }
//!     page:
//!       network: { feed: { edges: [3], pageInfo: { hasNextPage: false } } }
//! ```

use crate::config::PagerConfig;
use crate::error::{Error, Result};
use crate::pagination::{JsonCursorPagination, JsonPageInfo};
use crate::pager::QueryPager;
use crate::query::{OperationQuery, Variables};
use crate::source::{InMemorySource, ScriptedPage};
use crate::types::JsonValue;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Query type used by fixtures
pub type FixtureQuery = OperationQuery<JsonValue>;

/// Pager type produced by a fixture
pub type FixturePager = QueryPager<FixtureQuery, FixtureQuery, JsonPageInfo>;

/// One scripted query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureEntry {
    /// Operation name; follow-up entries default to the pagination operation
    #[serde(default)]
    pub operation: Option<String>,

    /// Bound variables
    #[serde(default)]
    pub variables: Variables,

    /// Scripted responses
    pub page: ScriptedPage,
}

/// A complete replay fixture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    /// Cache policies
    #[serde(default)]
    pub config: PagerConfig,

    /// Cursor policy linking pages
    pub pagination: JsonCursorPagination,

    /// Initial query and its responses
    pub initial: FixtureEntry,

    /// Follow-up queries and their responses
    #[serde(default)]
    pub pages: Vec<FixtureEntry>,
}

impl Fixture {
    /// Load a fixture from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::fixture(format!("Failed to read fixture '{}': {e}", path.display()))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Load a fixture from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let fixture: Fixture = serde_yaml::from_str(yaml)
            .map_err(|e| Error::fixture(format!("Failed to parse fixture YAML: {e}")))?;
        fixture.validate()?;
        Ok(fixture)
    }

    fn validate(&self) -> Result<()> {
        if self.initial_operation().is_empty() {
            return Err(Error::fixture("Initial operation name cannot be empty"));
        }
        if self.pagination.page_operation.is_empty() {
            return Err(Error::fixture("Pagination page_operation cannot be empty"));
        }
        if self.pagination.forward.is_none() && self.pagination.backward.is_none() {
            return Err(Error::fixture(
                "Pagination must define at least one of forward or backward",
            ));
        }
        for (index, entry) in self.pages.iter().enumerate() {
            if entry.operation.as_deref() == Some("") {
                return Err(Error::fixture(format!(
                    "Page {index} has an empty operation name"
                )));
            }
        }
        Ok(())
    }

    fn initial_operation(&self) -> &str {
        self.initial.operation.as_deref().unwrap_or_default()
    }

    /// The initial query
    pub fn initial_query(&self) -> FixtureQuery {
        FixtureQuery::with_variables(self.initial_operation(), self.initial.variables.clone())
    }

    /// Source scripted with every entry
    pub fn source(&self) -> InMemorySource {
        let source = InMemorySource::new();
        source.insert(
            self.initial_operation(),
            &self.initial.variables,
            self.initial.page.clone(),
        );
        for entry in &self.pages {
            let operation = entry
                .operation
                .as_deref()
                .unwrap_or(&self.pagination.page_operation);
            source.insert(operation, &entry.variables, entry.page.clone());
        }
        source
    }

    /// Pager over `source` using this fixture's query, policy and config
    pub fn pager_with_source(&self, source: InMemorySource) -> Result<FixturePager> {
        QueryPager::builder(source, self.initial_query())
            .with_strategy(self.pagination.clone())
            .with_config(self.config)
            .build()
    }

    /// Scripted source plus a pager over it
    pub fn pager(&self) -> Result<(InMemorySource, FixturePager)> {
        let source = self.source();
        let pager = self.pager_with_source(source.clone())?;
        Ok((source, pager))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Query;
    use crate::types::CachePolicy;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const FIXTURE: &str = r#"
config:
  initial_cache_policy: fetch_ignoring_cache_data
pagination:
  page_operation: FeedPage
  base_variables: { first: 2 }
  forward:
    flag_path: feed.pageInfo.hasNextPage
    cursor_path: feed.pageInfo.endCursor
    cursor_param: after
initial:
  operation: Feed
  variables: { first: 2 }
  page:
    network: { feed: { edges: [1, 2], pageInfo: { hasNextPage: true, endCursor: c1 } } }
pages:
  - variables: { first: 2, after: c1 }
    page:
      network: { feed: { edges: [3], pageInfo: { hasNextPage: false } } }
"#;

    #[test]
    fn test_parse_fixture() {
        let fixture = Fixture::from_yaml_str(FIXTURE).unwrap();
        assert_eq!(fixture.config.initial_cache_policy, CachePolicy::FetchIgnoringCacheData);
        assert_eq!(fixture.config.page_cache_policy, CachePolicy::FetchIgnoringCacheData);
        assert_eq!(fixture.initial_query().operation_name(), "Feed");
        assert_eq!(fixture.pages.len(), 1);
        assert!(fixture.pages[0].operation.is_none());
    }

    #[test]
    fn test_missing_directions_rejected() {
        let yaml = r#"
pagination:
  page_operation: FeedPage
initial:
  operation: Feed
  page: {}
"#;
        let err = Fixture::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("forward or backward"));
    }

    #[test]
    fn test_empty_initial_operation_rejected() {
        let yaml = r#"
pagination:
  page_operation: FeedPage
  forward: { flag_path: a, cursor_path: b, cursor_param: after }
initial:
  page: {}
"#;
        let err = Fixture::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, Error::Fixture { .. }));
    }

    #[test]
    fn test_invalid_yaml() {
        let err = Fixture::from_yaml_str("pagination: [").unwrap_err();
        assert!(err.to_string().contains("Failed to parse fixture YAML"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();

        let fixture = Fixture::from_file(file.path()).unwrap();
        assert_eq!(fixture.pagination.page_operation, "FeedPage");

        let err = Fixture::from_file("/nonexistent/fixture.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read fixture"));
    }

    #[tokio::test]
    async fn test_fixture_pager_loads_all() {
        let fixture = Fixture::from_yaml_str(FIXTURE).unwrap();
        let (source, pager) = fixture.pager().unwrap();

        pager.load_all().await.unwrap();

        assert_eq!(pager.page_count(), 1);
        assert!(!pager.can_load_next());
        assert_eq!(source.total_requests(), 2);
        let output = pager.current().unwrap().unwrap();
        assert_eq!(output.pages[0]["feed"]["edges"], serde_json::json!([3]));
    }
}
