//! The loader - owns the registry, cache, attribute store and notifier
//!
//! A [`Loader`] is built once per page from a catalog, the current build
//! version and the user's settings. [`Loader::fetch`] runs a full pass; the
//! rest of the API is what component factories use to pull in further
//! components while a pass is running.

use anyhow::{bail, Result};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::{self, CacheRecord, CacheStore, CacheValidation, MemoryCacheStore};
use crate::catalog::{CatalogManifest, Registry, Resource};
use crate::component::{ComponentExport, ComponentFactory, FactoryContext, FactoryRegistry};
use crate::error::LoaderError;
use crate::host::{DetachedHost, PageHost};
use crate::notify::{self, Notifier, ERROR_TITLE};
use crate::settings::Settings;
use crate::source::ContentSource;
use crate::store::{AttributeStore, SkippedImports};

mod fetch;
mod import;
pub mod report;

pub use import::Imported;
pub use report::{FailureRecord, FetchReport};

use report::Diagnostics;

/// Client-side component loader
pub struct Loader {
    registry: Registry,
    settings: Settings,
    version: String,
    source: Arc<dyn ContentSource>,
    cache: Mutex<CacheRecord>,
    /// Set once the loaded record has been checked against `version`
    cache_validated: AtomicBool,
    cache_store: Arc<dyn CacheStore>,
    factories: FactoryRegistry,
    host: Arc<dyn PageHost>,
    notifier: RwLock<Arc<dyn Notifier>>,
    store: AttributeStore,
    skipped: SkippedImports,
    diagnostics: Mutex<Diagnostics>,
}

impl Loader {
    /// Start building a loader for `catalog` at build `version`
    pub fn builder(catalog: CatalogManifest, version: impl Into<String>) -> LoaderBuilder {
        LoaderBuilder {
            catalog,
            version: version.into(),
            settings: Settings::default(),
            source: None,
            cache_store: None,
            factories: FactoryRegistry::new(),
            host: None,
            notifier: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn factories(&self) -> &FactoryRegistry {
        &self.factories
    }

    pub fn store(&self) -> &AttributeStore {
        &self.store
    }

    pub fn host(&self) -> &Arc<dyn PageHost> {
        &self.host
    }

    /// Keys requested but not registered, in request order
    pub fn skipped_imports(&self) -> Vec<String> {
        self.skipped.snapshot()
    }

    /// Current in-memory cache record
    pub fn cache_snapshot(&self) -> CacheRecord {
        self.cache.lock().clone()
    }

    /// The active notification channel
    pub fn notifier(&self) -> Arc<dyn Notifier> {
        self.notifier.read().clone()
    }

    /// Replace the notification channel
    pub fn set_notifier(&self, notifier: Arc<dyn Notifier>) {
        *self.notifier.write() = notifier;
    }

    /// Whether content comes from a prepackaged bundle
    pub fn is_offline(&self) -> bool {
        self.source.is_offline_bundle()
    }

    /// Validate the cache record against the build version
    ///
    /// Adopted and outdated records are persisted immediately.
    pub fn validate_cache(&self) -> CacheValidation {
        let (validation, snapshot) = {
            let mut record = self.cache.lock();
            let validation = cache::validate(&mut record, &self.version, self.is_offline());
            (validation, record.clone())
        };
        self.cache_validated.store(true, Ordering::Release);

        match &validation {
            CacheValidation::OfflineBundle => debug!("Offline bundle, skipping cache check"),
            CacheValidation::Empty => info!("No cache found, everything will be downloaded"),
            CacheValidation::Adopted => info!("Cache adopted for version {}", self.version),
            CacheValidation::Outdated { previous } => info!(
                "Cache outdated ({} -> {}), cleared",
                previous, self.version
            ),
            CacheValidation::Current => debug!("Cache is current for version {}", self.version),
        }

        if validation.needs_persist() {
            self.save_cache(&snapshot);
        }
        validation
    }

    /// Stamp the cache with the build version and save it
    pub fn persist_cache(&self) {
        if self.is_offline() {
            debug!("Offline bundle, not persisting cache");
            return;
        }
        let snapshot = {
            let mut record = self.cache.lock();
            record.version = Some(self.version.clone());
            record.clone()
        };
        self.save_cache(&snapshot);
    }

    fn save_cache(&self, record: &CacheRecord) {
        match self.cache_store.save(record) {
            Ok(()) => debug!("Cache saved to {}", self.cache_store.describe()),
            Err(e) => warn!(
                "Failed to save cache to {}: {:#}",
                self.cache_store.describe(),
                e
            ),
        }
    }

    /// Blobs are neither served nor stored before the record is validated
    fn caching_enabled(&self) -> bool {
        self.settings.use_cache
            && !self.is_offline()
            && self.cache_validated.load(Ordering::Acquire)
    }

    fn cached_blob(&self, key: &str) -> Option<String> {
        if !self.caching_enabled() {
            return None;
        }
        self.cache.lock().get(key).map(str::to_string)
    }

    fn store_blob(&self, key: &str, text: &str) {
        if self.caching_enabled() {
            self.cache.lock().insert(key, text);
        }
    }

    /// Log, record and notify a per-component failure
    ///
    /// A download failure already reported during this pass is only logged
    /// at debug level.
    fn report_failure(&self, resource: &Resource, error: LoaderError) {
        let first = self
            .diagnostics
            .lock()
            .record_error(resource.display_name(), &error);
        if !first {
            debug!("Download of '{}' already failed in this pass", resource.key());
            return;
        }
        tracing::error!("{}", error);

        let detail = self.settings.verbose_errors.then(|| error.detail());
        let message = match &error {
            LoaderError::DownloadFailure { .. } | LoaderError::DownloadTimeout { .. } => {
                notify::download_failed_message(resource.display_name(), detail.as_deref())
            }
            LoaderError::ExecutionFailure { .. } => {
                notify::execution_failed_message(resource.display_name(), detail.as_deref())
            }
            // Cycles and lookups are developer errors; the log is enough
            _ => return,
        };
        self.notifier().error(&message, ERROR_TITLE);
    }

    /// Install the bootstrap component's notifier, if it exported one
    fn adopt_notifier(&self, bootstrap_key: &str) {
        match self
            .store
            .get(bootstrap_key)
            .and_then(|export| export.notifier.clone())
        {
            Some(notifier) => {
                debug!("Notifications provided by '{}'", bootstrap_key);
                self.set_notifier(notifier);
            }
            None => warn!(
                "Component '{}' did not provide a notifier, notifications go to the log",
                bootstrap_key
            ),
        }
    }
}

/// Builder for [`Loader`]
pub struct LoaderBuilder {
    catalog: CatalogManifest,
    version: String,
    settings: Settings,
    source: Option<Arc<dyn ContentSource>>,
    cache_store: Option<Arc<dyn CacheStore>>,
    factories: FactoryRegistry,
    host: Option<Arc<dyn PageHost>>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl LoaderBuilder {
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Where resource content comes from (required)
    pub fn source(mut self, source: Arc<dyn ContentSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Cache persistence backend; defaults to an in-memory store
    pub fn cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache_store = Some(store);
        self
    }

    /// Page host; defaults to [`DetachedHost`]
    pub fn host(mut self, host: Arc<dyn PageHost>) -> Self {
        self.host = Some(host);
        self
    }

    /// Notifier used until the bootstrap component provides one
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn factory(mut self, name: impl Into<String>, factory: Arc<dyn ComponentFactory>) -> Self {
        self.factories.register(name, factory);
        self
    }

    pub fn factory_fn<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&FactoryContext<'_>) -> Result<Option<ComponentExport>> + Send + Sync + 'static,
    {
        self.factories.register_fn(name, factory);
        self
    }

    pub fn factories(mut self, factories: FactoryRegistry) -> Self {
        self.factories = factories;
        self
    }

    pub fn build(self) -> Result<Loader> {
        let Some(source) = self.source else {
            bail!("Loader requires a content source");
        };

        let check = self.catalog.check();
        for (key, dependency) in &check.missing_dependencies {
            warn!("Resource '{}' depends on unknown '{}'", key, dependency);
        }
        for cycle in &check.cycles {
            warn!("Catalog dependency cycle: {}", cycle.join(" -> "));
        }

        let cache_store = self
            .cache_store
            .unwrap_or_else(|| Arc::new(MemoryCacheStore::default()));
        let record = cache_store.load().unwrap_or_else(|e| {
            warn!(
                "Ignoring unreadable cache at {}: {:#}",
                cache_store.describe(),
                e
            );
            CacheRecord::new()
        });

        let registry = Registry::from_manifest(self.catalog);
        info!(
            "Loader ready: {} resources, {} factories, source {}",
            registry.len(),
            self.factories.len(),
            source.name()
        );

        Ok(Loader {
            registry,
            settings: self.settings,
            version: self.version,
            source,
            cache: Mutex::new(record),
            cache_validated: AtomicBool::new(false),
            cache_store,
            factories: self.factories,
            host: self.host.unwrap_or_else(|| Arc::new(DetachedHost)),
            notifier: RwLock::new(self.notifier.unwrap_or_else(notify::log_notifier)),
            store: AttributeStore::new(),
            skipped: SkippedImports::new(),
            diagnostics: Mutex::new(Diagnostics::default()),
        })
    }
}
