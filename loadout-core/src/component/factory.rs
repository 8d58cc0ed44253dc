//! Native component factories
//!
//! Factories are compiled into the host and registered by name. A component
//! document selects one with its `factory:` field; the loader invokes it
//! with the live settings and a handle back to the loader so the factory
//! can import other components.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::ComponentExport;
use crate::loader::Loader;
use crate::settings::Settings;

/// Everything a factory gets to see
pub struct FactoryContext<'a> {
    /// Resource key being loaded
    pub key: &'a str,

    /// Display name of the resource
    pub display_name: &'a str,

    /// Live settings
    pub settings: &'a Settings,

    /// The loader, for importing or fetching other components
    pub loader: &'a Loader,

    /// `options` from the component document
    pub options: &'a Value,
}

/// Trait for native component factories
#[async_trait]
pub trait ComponentFactory: Send + Sync {
    /// Build the component's export; `None` stores an empty export
    async fn create(&self, ctx: FactoryContext<'_>) -> Result<Option<ComponentExport>>;
}

/// Adapter for synchronous closures
pub struct FnFactory<F>(pub F);

#[async_trait]
impl<F> ComponentFactory for FnFactory<F>
where
    F: Fn(&FactoryContext<'_>) -> Result<Option<ComponentExport>> + Send + Sync,
{
    async fn create(&self, ctx: FactoryContext<'_>) -> Result<Option<ComponentExport>> {
        (self.0)(&ctx)
    }
}

/// Factories known to the loader, by name
#[derive(Default, Clone)]
pub struct FactoryRegistry {
    factories: HashMap<String, Arc<dyn ComponentFactory>>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory, replacing any previous one with the same name
    pub fn register(&mut self, name: impl Into<String>, factory: Arc<dyn ComponentFactory>) {
        let name = name.into();
        if self.factories.insert(name.clone(), factory).is_some() {
            tracing::warn!("Factory '{}' registered twice, keeping the latest", name);
        }
    }

    /// Register a synchronous closure as a factory
    pub fn register_fn<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&FactoryContext<'_>) -> Result<Option<ComponentExport>> + Send + Sync + 'static,
    {
        self.register(name, Arc::new(FnFactory(factory)));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ComponentFactory>> {
        self.factories.get(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
