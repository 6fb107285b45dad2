//! Queries and page keys
//!
//! A [`Query`] is anything a data source can execute: it has an operation
//! name and a set of bound variables. Follow-up pages are identified by a
//! [`PageKey`] derived from those variables, so two follow-up queries with
//! identical variables collapse onto the same page.

use crate::types::{JsonObject, JsonValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Bound query variables, ordered by variable name
pub type Variables = JsonObject;

/// A query that can be executed by a [`DataSource`](crate::source::DataSource)
pub trait Query: Send + Sync + 'static {
    /// Result data produced by this query
    type Data: Clone + Send + Sync + 'static;

    /// Operation name (e.g. `"FeedQuery"`)
    fn operation_name(&self) -> &str;

    /// Bound variables
    fn variables(&self) -> Variables;

    /// Canonical key of this query's variables
    fn page_key(&self) -> PageKey {
        PageKey::from_variables(&self.variables())
    }
}

// ============================================================================
// Page Key
// ============================================================================

/// Canonical fingerprint of a query's bound variables
///
/// Built from the variable values in name order, each encoded as JSON.
/// Variable names do not take part, only values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageKey(String);

impl PageKey {
    /// Derive a key from bound variables
    pub fn from_variables(variables: &Variables) -> Self {
        Self::from_values(variables.values().cloned())
    }

    /// Derive a key from an ordered list of values
    pub fn from_values(values: impl IntoIterator<Item = JsonValue>) -> Self {
        Self(JsonValue::Array(values.into_iter().collect()).to_string())
    }

    /// The encoded key
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Operation Query
// ============================================================================

/// General-purpose query: an operation name plus variables, producing `D`
pub struct OperationQuery<D> {
    name: String,
    variables: Variables,
    _data: PhantomData<fn() -> D>,
}

impl<D> OperationQuery<D> {
    /// Create a query without variables
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: Variables::new(),
            _data: PhantomData,
        }
    }

    /// Create a query with the given variables
    pub fn with_variables(name: impl Into<String>, variables: Variables) -> Self {
        Self {
            name: name.into(),
            variables,
            _data: PhantomData,
        }
    }

    /// Bind a variable
    #[must_use]
    pub fn variable(mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Remove a variable binding
    #[must_use]
    pub fn without_variable(mut self, name: &str) -> Self {
        self.variables.remove(name);
        self
    }

    /// Borrow the bound variables
    pub fn bound_variables(&self) -> &Variables {
        &self.variables
    }
}

impl<D> Clone for OperationQuery<D> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            variables: self.variables.clone(),
            _data: PhantomData,
        }
    }
}

impl<D> fmt::Debug for OperationQuery<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationQuery")
            .field("name", &self.name)
            .field("variables", &self.variables)
            .finish()
    }
}

impl<D> Query for OperationQuery<D>
where
    D: Clone + Send + Sync + 'static,
{
    type Data = D;

    fn operation_name(&self) -> &str {
        &self.name
    }

    fn variables(&self) -> Variables {
        self.variables.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    type FeedQuery = OperationQuery<JsonValue>;

    #[test]
    fn test_identical_variables_share_key() {
        let a = FeedQuery::new("Feed").variable("after", "c1").variable("first", 10);
        let b = FeedQuery::new("Feed").variable("first", 10).variable("after", "c1");
        assert_eq!(a.page_key(), b.page_key());
    }

    #[test]
    fn test_different_variables_differ() {
        let a = FeedQuery::new("Feed").variable("after", "c1");
        let b = FeedQuery::new("Feed").variable("after", "c2");
        assert_ne!(a.page_key(), b.page_key());
    }

    #[test]
    fn test_key_uses_values_in_name_order() {
        let query = FeedQuery::new("Feed").variable("b", 2).variable("a", "x");
        assert_eq!(query.page_key().as_str(), r#"["x",2]"#);
    }

    #[test]
    fn test_key_from_values() {
        let key = PageKey::from_values(vec![json!(1), json!(null), json!({"k": true})]);
        assert_eq!(key.to_string(), r#"[1,null,{"k":true}]"#);
    }

    #[test]
    fn test_empty_variables() {
        let query = FeedQuery::new("Feed");
        assert_eq!(query.page_key().as_str(), "[]");
        assert_eq!(query.operation_name(), "Feed");
    }

    #[test]
    fn test_without_variable() {
        let query = FeedQuery::new("Feed")
            .variable("after", "c1")
            .without_variable("after");
        assert!(query.bound_variables().is_empty());
    }
}
