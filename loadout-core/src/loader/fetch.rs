//! Dependency-ordered fetching
//!
//! A resource's styles and markup are retrieved first, then its script
//! dependencies are fetched recursively, and only then is the resource
//! itself executed. Siblings within a wave run concurrently.

use anyhow::anyhow;
use futures::future::{join_all, BoxFuture};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, trace, Span};

use super::report::{describe_validation, Diagnostics, FetchReport};
use super::Loader;
use crate::catalog::{Resource, ResourceType};
use crate::component::executor;
use crate::error::LoaderError;
use crate::install;
use crate::settings::NOTIFICATION_BOOTSTRAP_KEY;
use crate::trace::generate_pass_id;

const LOADING_MESSAGE: &str = "Initializing components...";
const LOADING_TITLE: &str = "Initialization";

impl Loader {
    /// Run a full loading pass
    ///
    /// Validates the cache, bootstraps notifications, fetches every enabled
    /// feature, persists the cache and finally installs dropdown options and
    /// widgets. Individual component failures are reported, never returned.
    #[instrument(
        name = "fetch",
        skip(self),
        fields(
            pass_id = tracing::field::Empty,
            version = %self.version,
            cache = tracing::field::Empty,
            executed = tracing::field::Empty,
            failures = tracing::field::Empty,
            duration_ms = tracing::field::Empty
        )
    )]
    pub async fn fetch(&self) -> FetchReport {
        let started = Instant::now();
        let started_at = chrono::Utc::now();
        let pass_id = generate_pass_id();
        let skipped_before = self.skipped.len();

        let current_span = Span::current();
        current_span.record("pass_id", pass_id.as_str());

        *self.diagnostics.lock() = Diagnostics::default();

        // STEP 1: Cache validation
        let validation = self.validate_cache();
        current_span.record("cache", describe_validation(&validation).as_str());

        // STEP 2: Notification bootstrap, strictly before any feature
        let mut loading = None;
        if self.settings.notifications_enabled() {
            self.fetch_by_key(NOTIFICATION_BOOTSTRAP_KEY).await;
            self.adopt_notifier(NOTIFICATION_BOOTSTRAP_KEY);

            if !validation.is_valid() && self.settings.use_cache {
                loading = Some(self.notifier().info(LOADING_MESSAGE, LOADING_TITLE));
            }
        }

        // STEP 3: Enabled features, concurrently
        let features = self.settings.enabled_features();
        info!("Fetching {} enabled features", features.len());
        join_all(features.iter().map(|key| self.fetch_by_key(key))).await;

        // STEP 4: Persist and take down the loading indicator
        self.persist_cache();
        if let Some(handle) = loading {
            handle.dismiss();
        }

        // STEP 5: Installers, dropdowns before widgets
        let exports = self.store.snapshot();
        let dropdown_options_added = install::install_dropdowns(
            self.registry.iter().filter_map(|r| r.dropdown()),
            &exports,
            self.host.as_ref(),
            self.settings.dropdown_poll,
        )
        .await;
        let widgets_installed =
            install::install_widgets(&exports, &self.settings, self.host.as_ref()).await;

        let diagnostics = std::mem::take(&mut *self.diagnostics.lock());
        let skipped_imports: Vec<String> = self
            .skipped
            .snapshot()
            .into_iter()
            .skip(skipped_before)
            .collect();

        let duration = started.elapsed();
        let failures = diagnostics.download_failures.len() + diagnostics.execution_failures.len();
        current_span.record("executed", diagnostics.executed.len());
        current_span.record("failures", failures);
        current_span.record("duration_ms", duration.as_millis() as u64);

        info!(
            "Fetch complete: {} executed, {} failed, {} widgets in {:?}",
            diagnostics.executed.len(),
            failures,
            widgets_installed,
            duration
        );

        FetchReport {
            pass_id,
            version: self.version.clone(),
            cache: describe_validation(&validation),
            cache_valid: validation.is_valid(),
            started_at,
            duration_ms: duration.as_millis(),
            executed: diagnostics.executed,
            download_failures: diagnostics.download_failures,
            execution_failures: diagnostics.execution_failures,
            cycles: diagnostics.cycles,
            skipped_imports,
            widgets_installed,
            dropdown_options_added,
        }
    }

    /// Fetch one resource and everything it depends on
    ///
    /// Unregistered keys are recorded as skipped imports. Completion means
    /// the resource and its dependencies have been processed, whether or not
    /// each of them succeeded.
    pub async fn fetch_by_key(&self, key: &str) {
        self.fetch_along(key, Vec::new()).await
    }

    /// `ancestry` holds the keys currently being fetched above this one
    fn fetch_along<'a>(&'a self, key: &'a str, ancestry: Vec<String>) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let Some(resource) = self.registry.get(key).cloned() else {
                self.skipped.record(key);
                return;
            };

            if ancestry.iter().any(|k| k == key) {
                let mut path = ancestry;
                path.push(key.to_string());
                self.report_failure(&resource, LoaderError::DependencyCycle { path });
                return;
            }

            let mut ancestry = ancestry;
            ancestry.push(key.to_string());

            trace!("Fetching '{}' ({})", key, resource.kind());
            let text = match self.download(&resource).await {
                Ok(text) => Some(text),
                Err(e) => {
                    self.report_failure(&resource, e);
                    None
                }
            };

            // First wave: styles and markup the resource needs
            let passive = resource.dependencies().iter().filter_map(|dep| {
                self.registry
                    .get(dep)
                    .filter(|r| r.kind() != ResourceType::Script)
            });
            join_all(passive.map(|dep| self.fetch_passive(dep))).await;

            // Second wave: script dependencies, each with its own subtree
            let scripts = resource.dependencies().iter().filter(|dep| {
                self.registry
                    .get(dep.as_str())
                    .map_or(true, |r| r.kind() == ResourceType::Script)
            });
            join_all(scripts.map(|dep| self.fetch_along(dep, ancestry.clone()))).await;

            match resource.kind() {
                ResourceType::Script => self.execute_resource(&resource, text.as_deref()).await,
                ResourceType::Style => {
                    if let Some(css) = text.as_deref() {
                        self.host.apply_style(key, css);
                    }
                }
                ResourceType::Markup => {}
            }
        })
    }

    /// Retrieve a style or markup dependency, applying styles
    async fn fetch_passive(&self, resource: &Arc<Resource>) {
        match self.download(resource).await {
            Ok(text) if resource.kind() == ResourceType::Style => {
                self.host.apply_style(resource.key(), &text)
            }
            Ok(_) => {}
            Err(e) => self.report_failure(resource, e),
        }
    }

    /// Ensure a resource's content is present
    ///
    /// Content already held by the resource is returned without touching
    /// the cache or the source.
    pub async fn download(&self, resource: &Resource) -> Result<Arc<str>, LoaderError> {
        resource.download_with(|| self.retrieve(resource)).await
    }

    async fn retrieve(&self, resource: &Resource) -> Result<String, LoaderError> {
        if let Some(blob) = self.cached_blob(resource.key()) {
            debug!("Serving '{}' from cache", resource.key());
            return Ok(blob);
        }

        if self
            .diagnostics
            .lock()
            .failed_downloads
            .contains(resource.key())
        {
            return Err(LoaderError::DownloadFailure {
                key: resource.key().to_string(),
                display_name: resource.display_name().to_string(),
                url: resource.url().to_string(),
                source: anyhow!("an earlier attempt in this pass failed"),
            });
        }

        let result = self.retrieve_from_source(resource).await;
        if result.is_err() {
            self.diagnostics
                .lock()
                .failed_downloads
                .insert(resource.key().to_string());
        }
        result
    }

    async fn retrieve_from_source(&self, resource: &Resource) -> Result<String, LoaderError> {
        let timeout = self.settings.download_timeout();
        let fetched = tokio::time::timeout(timeout, self.source.fetch(resource.url())).await;
        let text = match fetched {
            Ok(Ok(text)) => text,
            Ok(Err(source)) => {
                return Err(LoaderError::DownloadFailure {
                    key: resource.key().to_string(),
                    display_name: resource.display_name().to_string(),
                    url: resource.url().to_string(),
                    source,
                })
            }
            Err(_) => {
                return Err(LoaderError::DownloadTimeout {
                    key: resource.key().to_string(),
                    display_name: resource.display_name().to_string(),
                    url: resource.url().to_string(),
                    timeout,
                })
            }
        };

        debug!(
            "Downloaded '{}' from {} ({} bytes)",
            resource.key(),
            self.source.name(),
            text.len()
        );
        self.store_blob(resource.key(), &text);
        Ok(text)
    }

    /// Execute downloaded text for `key` and store the export
    ///
    /// With no text (the download failed or never happened) nothing runs.
    pub async fn apply_component(&self, key: &str, text: Option<&str>) {
        match self.registry.get(key).cloned() {
            Some(resource) => self.execute_resource(&resource, text).await,
            None => self.skipped.record(key),
        }
    }

    async fn execute_resource(&self, resource: &Resource, text: Option<&str>) {
        let Some(text) = text else {
            debug!("No content for '{}', not executing", resource.key());
            return;
        };

        match executor::execute(resource, text, self).await {
            Ok(Some(export)) => {
                if self.store.insert(resource.key(), export).is_some() {
                    debug!("Component '{}' executed again, export replaced", resource.key());
                }
                self.diagnostics.lock().executed.push(resource.key().to_string());
            }
            Ok(None) => {}
            Err(e) => self.report_failure(resource, e),
        }
    }
}
