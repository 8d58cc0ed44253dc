//! Content sources
//!
//! A source turns a resource URL into text. The loader never talks to the
//! network directly, which keeps it testable and lets an offline bundle
//! stand in for the network entirely.

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::HttpSource;

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Trait for anything that can retrieve resource content
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Retrieve the content at `url`
    async fn fetch(&self, url: &str) -> Result<String>;

    /// True when every resource is embedded and cache rules do not apply
    fn is_offline_bundle(&self) -> bool {
        false
    }

    /// Source identifier for logging
    fn name(&self) -> &'static str;
}

/// Pre-embedded content keyed by URL
#[derive(Debug, Clone, Default)]
pub struct OfflineBundle {
    content: BTreeMap<String, String>,
}

impl OfflineBundle {
    pub fn new(content: BTreeMap<String, String>) -> Self {
        Self { content }
    }

    /// Load a bundle from a JSON object of `url -> content`
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read offline bundle: {}", path.display()))?;
        let content = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse offline bundle: {}", path.display()))?;
        Ok(Self { content })
    }

    /// Embed content for a URL
    pub fn insert(&mut self, url: impl Into<String>, content: impl Into<String>) {
        self.content.insert(url.into(), content.into());
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

#[async_trait]
impl ContentSource for OfflineBundle {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.content
            .get(url)
            .cloned()
            .with_context(|| format!("{url} is not part of the offline bundle"))
    }

    fn is_offline_bundle(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "offline-bundle"
    }
}

/// Serves URLs from a local directory, keyed by the URL path
///
/// `https://cdn.example.com/min/toast.min.js` resolves to
/// `<root>/min/toast.min.js`; relative URLs resolve against the root directly.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a URL onto a path under the root
    pub fn resolve(&self, url: &str) -> Result<PathBuf> {
        let without_scheme = match url.split_once("://") {
            Some((_, rest)) => rest.split_once('/').map(|(_, path)| path).unwrap_or(""),
            None => url,
        };
        let relative = without_scheme
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_start_matches('/');

        if relative.is_empty() {
            anyhow::bail!("URL has no path: {url}");
        }

        let relative = Path::new(relative);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            anyhow::bail!("URL escapes the source directory: {url}");
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ContentSource for DirectorySource {
    async fn fetch(&self, url: &str) -> Result<String> {
        let path = self.resolve(url)?;
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))
    }

    fn name(&self) -> &'static str {
        "directory"
    }
}
