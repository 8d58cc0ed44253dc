//! Per-pass diagnostics

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

use crate::cache::CacheValidation;
use crate::error::LoaderError;

/// A component that failed to download or execute
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub key: String,
    pub display_name: String,
    pub message: String,
}

/// Summary of one [`crate::Loader::fetch`] pass
#[derive(Debug, Clone, Serialize)]
pub struct FetchReport {
    /// Correlates with the `pass_id` span field in the logs
    pub pass_id: String,
    /// Build version the pass ran for
    pub version: String,
    /// Cache validation outcome, e.g. `current` or `outdated (was 0.9)`
    pub cache: String,
    pub cache_valid: bool,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u128,
    /// Components whose export was stored, in completion order
    pub executed: Vec<String>,
    pub download_failures: Vec<FailureRecord>,
    pub execution_failures: Vec<FailureRecord>,
    pub cycles: Vec<Vec<String>>,
    pub skipped_imports: Vec<String>,
    pub widgets_installed: usize,
    pub dropdown_options_added: usize,
}

impl FetchReport {
    /// Whether every requested component loaded
    pub fn is_clean(&self) -> bool {
        self.download_failures.is_empty()
            && self.execution_failures.is_empty()
            && self.cycles.is_empty()
            && self.skipped_imports.is_empty()
    }

    pub fn failure_count(&self) -> usize {
        self.download_failures.len() + self.execution_failures.len()
    }
}

/// Mutable accumulator the loader writes into while a pass runs
#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    pub executed: Vec<String>,
    pub download_failures: Vec<FailureRecord>,
    pub execution_failures: Vec<FailureRecord>,
    pub cycles: Vec<Vec<String>>,
    /// Keys whose retrieval failed; not retried until the next pass
    pub failed_downloads: HashSet<String>,
}

impl Diagnostics {
    /// Record a failure, returning `false` if this download failure was
    /// already recorded for the key
    pub fn record_error(&mut self, display_name: &str, error: &LoaderError) -> bool {
        match error {
            LoaderError::DependencyCycle { path } => self.cycles.push(path.clone()),
            other
                if other.is_download_error()
                    && self.download_failures.iter().any(|f| f.key == other.key()) =>
            {
                return false;
            }
            other => {
                let record = FailureRecord {
                    key: other.key().to_string(),
                    display_name: display_name.to_string(),
                    message: other.detail(),
                };
                if other.is_download_error() {
                    self.download_failures.push(record);
                } else {
                    self.execution_failures.push(record);
                }
            }
        }
        true
    }
}

/// Short label for a validation outcome
pub(crate) fn describe_validation(validation: &CacheValidation) -> String {
    match validation {
        CacheValidation::OfflineBundle => "offline-bundle".to_string(),
        CacheValidation::Empty => "empty".to_string(),
        CacheValidation::Adopted => "adopted".to_string(),
        CacheValidation::Outdated { previous } => format!("outdated (was {previous})"),
        CacheValidation::Current => "current".to_string(),
    }
}
