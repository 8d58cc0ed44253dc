//! Runtime resource registry
//!
//! Built once from a [`CatalogManifest`]. Each [`Resource`] owns a
//! single-flight download slot: the first caller performs the retrieval and
//! every concurrent or later caller receives the same text. A failed
//! retrieval leaves the slot empty; the loader decides whether to retry.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::{CatalogManifest, ResourceEntry, ResourceType};
use crate::component::DropdownSpec;
use crate::error::LoaderError;

/// Suffix used to recognise a component by its minified file name
pub const MINIFIED_SCRIPT_SUFFIX: &str = ".min.js";

/// A registered resource and its download state
#[derive(Debug)]
pub struct Resource {
    key: String,
    display_name: String,
    kind: ResourceType,
    url: String,
    dependencies: Vec<String>,
    dropdown: Option<DropdownSpec>,
    content: OnceCell<Arc<str>>,
}

impl Resource {
    /// Create a resource from its catalog entry
    pub fn new(key: impl Into<String>, entry: ResourceEntry) -> Self {
        Self {
            key: key.into(),
            display_name: entry.display_name,
            kind: entry.kind,
            url: entry.url,
            dependencies: entry.dependencies,
            dropdown: entry.dropdown,
            content: OnceCell::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn kind(&self) -> ResourceType {
        self.kind
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn dropdown(&self) -> Option<&DropdownSpec> {
        self.dropdown.as_ref()
    }

    /// Whether the content has been retrieved
    pub fn is_downloaded(&self) -> bool {
        self.content.initialized()
    }

    /// Downloaded content, if any
    pub fn text(&self) -> Option<Arc<str>> {
        self.content.get().cloned()
    }

    /// Whether the URL names `<stem>.min.js`
    pub fn matches_file_stem(&self, stem: &str) -> bool {
        let keyword = format!("{stem}{MINIFIED_SCRIPT_SUFFIX}");
        self.url.contains(&keyword)
    }

    /// Retrieve the content once
    ///
    /// `retrieve` only runs if the content is not present yet. Concurrent
    /// callers wait for the in-flight retrieval instead of starting another.
    pub async fn download_with<F, Fut>(&self, retrieve: F) -> Result<Arc<str>, LoaderError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, LoaderError>>,
    {
        self.content
            .get_or_try_init(|| async { retrieve().await.map(Arc::<str>::from) })
            .await
            .map(Arc::clone)
    }
}

/// All resources known to the loader
#[derive(Debug, Default)]
pub struct Registry {
    resources: BTreeMap<String, Arc<Resource>>,
}

impl Registry {
    /// Build the registry from a catalog
    pub fn from_manifest(manifest: CatalogManifest) -> Self {
        let resources = manifest
            .resources
            .into_iter()
            .map(|(key, entry)| {
                let resource = Resource::new(key.clone(), entry);
                (key, Arc::new(resource))
            })
            .collect();

        Self { resources }
    }

    /// Look up a resource by key
    pub fn get(&self, key: &str) -> Option<&Arc<Resource>> {
        self.resources.get(key)
    }

    /// Whether a key is registered
    pub fn contains(&self, key: &str) -> bool {
        self.resources.contains_key(key)
    }

    /// Find the first resource (in key order) whose URL names `<stem>.min.js`
    ///
    /// Covers components whose key differs from the file name they ship as.
    pub fn find_by_file_stem(&self, stem: &str) -> Option<&Arc<Resource>> {
        self.resources
            .values()
            .find(|resource| resource.matches_file_stem(stem))
    }

    /// Iterate resources in key order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Resource>> {
        self.resources.values()
    }

    /// Number of registered resources
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
