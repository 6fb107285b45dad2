//! Error types for Query Pager
//!
//! This module defines the error hierarchy for the whole crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use crate::types::Direction;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by a data source or a caller-supplied transform.
///
/// Shared between every subscriber and the awaiting caller, hence the `Arc`.
pub type SourceError = Arc<anyhow::Error>;

/// The main error type for Query Pager
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Pagination Contract Errors
    // ============================================================================
    #[error("No initial page available; fetch() must settle before loading more pages")]
    MissingInitialPage,

    #[error("No more content to load ({direction})")]
    NoMoreContent { direction: Direction },

    #[error("A pagination request is already in progress")]
    LoadInProgress,

    // ============================================================================
    // Operation Errors
    // ============================================================================
    #[error("Data source failure: {0}")]
    DataSource(SourceError),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Transform failed: {0}")]
    Transform(SourceError),

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Fixture error: {message}")]
    Fixture { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a fixture error
    pub fn fixture(message: impl Into<String>) -> Self {
        Self::Fixture {
            message: message.into(),
        }
    }

    /// Create a "no more content" error for a direction
    pub fn no_more_content(direction: Direction) -> Self {
        Self::NoMoreContent { direction }
    }

    /// Wrap a data source failure
    pub fn data_source(error: SourceError) -> Self {
        Self::DataSource(error)
    }

    /// Whether this error is one of the synchronous contract violations
    /// (`MissingInitialPage`, `NoMoreContent`, `LoadInProgress`).
    ///
    /// These are returned to the caller of the specific operation and never
    /// reach subscribers.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Error::MissingInitialPage | Error::NoMoreContent { .. } | Error::LoadInProgress
        )
    }

    /// Whether retrying the same operation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::DataSource(_) | Error::LoadInProgress)
    }
}

/// Result type alias for Query Pager
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::no_more_content(Direction::Forward);
        assert_eq!(err.to_string(), "No more content to load (forward)");

        let err = Error::data_source(Arc::new(anyhow::anyhow!("boom")));
        assert_eq!(err.to_string(), "Data source failure: boom");
    }

    #[test]
    fn test_contract_violations() {
        assert!(Error::MissingInitialPage.is_contract_violation());
        assert!(Error::LoadInProgress.is_contract_violation());
        assert!(Error::no_more_content(Direction::Backward).is_contract_violation());

        assert!(!Error::Cancelled.is_contract_violation());
        assert!(!Error::data_source(Arc::new(anyhow::anyhow!("x"))).is_contract_violation());
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::data_source(Arc::new(anyhow::anyhow!("x"))).is_retryable());
        assert!(Error::LoadInProgress.is_retryable());
        assert!(!Error::MissingInitialPage.is_retryable());
        assert!(!Error::config("bad").is_retryable());
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }
}
