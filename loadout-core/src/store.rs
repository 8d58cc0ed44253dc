//! Attribute store and skipped-import record
//!
//! Exports are owned here, keyed by resource key. Storing under an existing
//! key replaces the previous export outright.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

use crate::component::ComponentExport;
use crate::error::LoaderError;

/// Resolved component exports, keyed by resource key
#[derive(Debug, Default)]
pub struct AttributeStore {
    exports: RwLock<HashMap<String, Arc<ComponentExport>>>,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an export, returning the one it replaced
    pub fn insert(
        &self,
        key: impl Into<String>,
        export: ComponentExport,
    ) -> Option<Arc<ComponentExport>> {
        self.exports.write().insert(key.into(), Arc::new(export))
    }

    pub fn get(&self, key: &str) -> Option<Arc<ComponentExport>> {
        self.exports.read().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.exports.read().contains_key(key)
    }

    /// All exports, sorted by key
    pub fn snapshot(&self) -> Vec<(String, Arc<ComponentExport>)> {
        let mut entries: Vec<_> = self
            .exports
            .read()
            .iter()
            .map(|(key, export)| (key.clone(), Arc::clone(export)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Stored keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.exports.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.exports.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.exports.read().is_empty()
    }
}

/// Append-only list of keys that were requested but not registered
#[derive(Debug, Default)]
pub struct SkippedImports {
    keys: Mutex<Vec<String>>,
}

impl SkippedImports {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, key: &str) {
        tracing::debug!(
            "{}, skipping",
            LoaderError::MissingResource {
                key: key.to_string()
            }
        );
        self.keys.lock().push(key.to_string());
    }

    /// Every recorded key, in order, duplicates included
    pub fn snapshot(&self) -> Vec<String> {
        self.keys.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.keys.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.lock().is_empty()
    }
}
