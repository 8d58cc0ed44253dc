//! Component lookup for factories and embedders

use std::sync::Arc;
use tracing::{debug, error};

use super::Loader;
use crate::catalog::{Resource, ResourceType};
use crate::component::ComponentExport;
use crate::error::LoaderError;

/// Result of a successful import
#[derive(Debug, Clone)]
pub enum Imported {
    /// Raw text of a markup or style resource
    Text(Arc<str>),
    /// Stored export of a script resource
    Component(Arc<ComponentExport>),
}

impl Imported {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Imported::Text(text) => Some(text),
            Imported::Component(_) => None,
        }
    }

    pub fn as_component(&self) -> Option<&Arc<ComponentExport>> {
        match self {
            Imported::Component(export) => Some(export),
            Imported::Text(_) => None,
        }
    }
}

impl Loader {
    /// Look up something already loaded
    ///
    /// Markup and style resources yield their text if downloaded. Script
    /// resources yield their stored export, falling back to the resource
    /// whose URL names `<key>.min.js`. Never downloads anything.
    pub fn import(&self, key: &str) -> Option<Imported> {
        match self.registry.get(key) {
            Some(resource) if resource.kind() != ResourceType::Script => {
                self.import_text(resource)
            }
            Some(_) => self.import_export(key),
            None if self.registry.find_by_file_stem(key).is_some() => self.import_export(key),
            None => {
                self.skipped.record(key);
                None
            }
        }
    }

    /// Like [`Loader::import`], downloading the resource first if needed
    pub async fn import_async(&self, key: &str) -> Option<Imported> {
        if let Some(resource) = self.registry.get(key).cloned() {
            if !resource.is_downloaded() {
                debug!("Downloading '{}' for import", key);
                if let Err(e) = self.download(&resource).await {
                    self.report_failure(&resource, e);
                }
            }
        }
        self.import(key)
    }

    fn import_text(&self, resource: &Resource) -> Option<Imported> {
        match resource.text() {
            Some(text) => Some(Imported::Text(text)),
            None => {
                error!(
                    "{}",
                    LoaderError::LookupFailure {
                        key: resource.key().to_string()
                    }
                );
                None
            }
        }
    }

    fn import_export(&self, key: &str) -> Option<Imported> {
        let export = self.store.get(key).or_else(|| {
            let resolved = self.registry.find_by_file_stem(key)?;
            debug!("Resolved '{}' to '{}' by file name", key, resolved.key());
            self.store.get(resolved.key())
        });

        match export {
            Some(export) => Some(Imported::Component(export)),
            None => {
                error!(
                    "{}",
                    LoaderError::LookupFailure {
                        key: key.to_string()
                    }
                );
                None
            }
        }
    }
}
