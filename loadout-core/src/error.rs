//! Loader error types
//!
//! None of these abort a fetch pass. They are caught at the component
//! boundary, logged, reported through the notification channel and
//! collected into the pass report.

use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading a single component
#[derive(Error, Debug)]
pub enum LoaderError {
    /// The requested key is not in the registry
    #[error("Component \"{key}\" is not registered")]
    MissingResource { key: String },

    /// Retrieving the resource content failed
    #[error("Failed to download {display_name} from {url}")]
    DownloadFailure {
        key: String,
        display_name: String,
        url: String,
        #[source]
        source: anyhow::Error,
    },

    /// Retrieving the resource content did not finish in time
    #[error("Download of {display_name} from {url} timed out after {timeout:?}")]
    DownloadTimeout {
        key: String,
        display_name: String,
        url: String,
        timeout: Duration,
    },

    /// The component document could not be evaluated or its factory failed
    #[error("Failed to apply component {display_name}: {reason}")]
    ExecutionFailure {
        key: String,
        display_name: String,
        reason: String,
    },

    /// A lookup in the attribute store found nothing
    #[error("Import failed: component \"{key}\" is not loaded")]
    LookupFailure { key: String },

    /// The dependency graph loops back on itself
    #[error("Dependency cycle detected: {}", path.join(" -> "))]
    DependencyCycle { path: Vec<String> },
}

impl LoaderError {
    /// Key of the component this error belongs to
    pub fn key(&self) -> &str {
        match self {
            LoaderError::MissingResource { key }
            | LoaderError::DownloadFailure { key, .. }
            | LoaderError::DownloadTimeout { key, .. }
            | LoaderError::ExecutionFailure { key, .. }
            | LoaderError::LookupFailure { key } => key,
            LoaderError::DependencyCycle { path } => {
                path.last().map(String::as_str).unwrap_or_default()
            }
        }
    }

    /// Whether this error happened while retrieving content
    pub fn is_download_error(&self) -> bool {
        matches!(
            self,
            LoaderError::DownloadFailure { .. } | LoaderError::DownloadTimeout { .. }
        )
    }

    /// Full error chain, used when verbose error reporting is on
    pub fn detail(&self) -> String {
        match self {
            LoaderError::DownloadFailure { source, .. } => format!("{source:#}"),
            other => other.to_string(),
        }
    }
}
