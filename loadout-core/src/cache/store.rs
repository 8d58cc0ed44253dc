//! Cache persistence backends

use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

use super::CacheRecord;

/// File name used inside the default cache directory
const CACHE_FILE: &str = "cache.json";

/// Somewhere a [`CacheRecord`] can be loaded from and saved to
pub trait CacheStore: Send + Sync {
    /// Load the record, or an empty one if nothing was saved yet
    fn load(&self) -> Result<CacheRecord>;

    /// Replace the persisted record
    fn save(&self, record: &CacheRecord) -> Result<()>;

    /// Backend identifier for logging
    fn describe(&self) -> String;
}

/// JSON file backed cache
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    path: PathBuf,
}

impl FileCacheStore {
    /// Use a specific file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Use `cache.json` in the platform cache directory
    pub fn in_default_location() -> Result<Self> {
        Ok(Self::new(Self::default_dir()?.join(CACHE_FILE)))
    }

    /// Platform cache directory for loadout
    fn default_dir() -> Result<PathBuf> {
        directories::ProjectDirs::from("dev", "loadout", "loadout")
            .map(|dirs| dirs.cache_dir().to_path_buf())
            .or_else(|| dirs::cache_dir().map(|d| d.join("loadout")))
            .context("Could not determine cache directory")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the cache file if present
    pub fn remove(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove cache: {}", self.path.display()))?;
        }
        Ok(())
    }
}

impl CacheStore for FileCacheStore {
    fn load(&self) -> Result<CacheRecord> {
        if !self.path.exists() {
            return Ok(CacheRecord::new());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read cache: {}", self.path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse cache: {}", self.path.display()))
    }

    fn save(&self, record: &CacheRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(record).context("Failed to serialize cache")?;

        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write cache: {}", self.path.display()))?;

        tracing::debug!("Saved cache to {}", self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// In-memory cache, for tests and embedders that persist elsewhere
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    record: Mutex<CacheRecord>,
    saves: Mutex<usize>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing record
    pub fn with_record(record: CacheRecord) -> Self {
        Self {
            record: Mutex::new(record),
            saves: Mutex::new(0),
        }
    }

    /// Current stored record
    pub fn snapshot(&self) -> CacheRecord {
        self.record.lock().clone()
    }

    /// How many times `save` was called
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

impl CacheStore for MemoryCacheStore {
    fn load(&self) -> Result<CacheRecord> {
        Ok(self.snapshot())
    }

    fn save(&self, record: &CacheRecord) -> Result<()> {
        *self.record.lock() = record.clone();
        *self.saves.lock() += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
