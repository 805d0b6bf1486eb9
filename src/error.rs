//! Error handling for epicharts
//!
//! This module defines the crate-wide error type and a Result alias. Errors
//! that belong to a single concern (fetching, catalog validation) have their
//! own enums and convert into [`ChartsError`] with `?`.

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::fetch::FetchError;

/// Main error type for epicharts operations
#[derive(Error, Debug)]
pub enum ChartsError {
    /// Errors raised while fetching runs or run payloads
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Errors raised while validating the chart catalog
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to the persisted chart state
    #[error("State error: {0}")]
    State(String),

    /// A run id that is not present in the run index
    #[error("Unknown run: {0}")]
    UnknownRun(String),

    /// A chart id that is not present in the catalog
    #[error("Unknown chart: {0}")]
    UnknownChart(String),

    /// Errors reading CSV input
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ChartsError>,
    },
}

impl ChartsError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ChartsError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for epicharts operations
pub type Result<T> = std::result::Result<T, ChartsError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<ChartsError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err: ChartsError = e.into();
            err.with_context(context)
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err: ChartsError = e.into();
            err.with_context(f())
        })
    }
}
