//! Version-gated content cache
//!
//! The cache record is the only state persisted across runs:
//!
//! ```json
//! { "version": "1.4.2", "toast": "<component document>", "toastStyle": "..." }
//! ```
//!
//! A record written by a different build version is discarded as a whole;
//! there is no per-key invalidation.

mod store;

pub use store::{CacheStore, FileCacheStore, MemoryCacheStore};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Persisted cache: a version tag plus one opaque blob per resource key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Build version that wrote the record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Cached content, keyed by resource key
    #[serde(flatten)]
    pub entries: BTreeMap<String, String>,
}

impl CacheRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty record stamped with a version
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            version: Some(version.into()),
            entries: BTreeMap::new(),
        }
    }

    /// A record is empty when it has neither a version tag nor blobs
    pub fn is_empty(&self) -> bool {
        self.version.is_none() && self.entries.is_empty()
    }

    /// Drop everything, including the version tag
    pub fn clear(&mut self) {
        self.version = None;
        self.entries.clear();
    }

    /// Cached blob for a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Store a blob, replacing any previous one
    pub fn insert(&mut self, key: impl Into<String>, blob: impl Into<String>) {
        self.entries.insert(key.into(), blob.into());
    }
}

/// Outcome of [`validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheValidation {
    /// Offline bundle: everything is embedded, cache rules do not apply
    OfflineBundle,
    /// Nothing cached yet (first run)
    Empty,
    /// Cache predates version tagging; the current version was stamped on
    Adopted,
    /// Cache was written by another version and has been cleared
    Outdated { previous: String },
    /// Cache matches the running version
    Current,
}

impl CacheValidation {
    /// Whether the cache may be used as is
    pub fn is_valid(&self) -> bool {
        matches!(
            self,
            CacheValidation::OfflineBundle | CacheValidation::Adopted | CacheValidation::Current
        )
    }

    /// Whether validation rewrote the record and it must be saved right away
    pub fn needs_persist(&self) -> bool {
        matches!(
            self,
            CacheValidation::Adopted | CacheValidation::Outdated { .. }
        )
    }
}

/// Decide whether `cache` is usable for `current_version`
///
/// Branches are evaluated in this order and must stay in it:
/// offline bundle, empty, untagged (adopt), version mismatch (clear), current.
pub fn validate(cache: &mut CacheRecord, current_version: &str, offline: bool) -> CacheValidation {
    if offline {
        return CacheValidation::OfflineBundle;
    }

    if cache.is_empty() {
        return CacheValidation::Empty;
    }

    let Some(version) = cache.version.as_deref() else {
        cache.version = Some(current_version.to_string());
        return CacheValidation::Adopted;
    };

    if version != current_version {
        let previous = version.to_string();
        cache.clear();
        return CacheValidation::Outdated { previous };
    }

    CacheValidation::Current
}
