//! Shared fixtures for loader integration tests
//!
//! Everything observable goes through one [`EventLog`] so tests can assert
//! on the relative order of downloads, style applications and factory runs.

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use loadout_core::component::{ComponentExport, FactoryContext};
use loadout_core::host::{DropdownControl, OptionHandler, PageHost};
use loadout_core::notify::{NotificationHandle, Notifier};
use loadout_core::source::ContentSource;
use loadout_core::CatalogManifest;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

/// Initialize logging for tests (only once per test run)
static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_target(true)
                    .with_level(true),
            )
            .with(tracing_subscriber::filter::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Ordered record of everything the fixtures observed
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Index of the first event equal to `event`
    pub fn position(&self, event: &str) -> Option<usize> {
        self.0.lock().iter().position(|e| e == event)
    }

    pub fn count(&self, event: &str) -> usize {
        self.0.lock().iter().filter(|e| *e == event).count()
    }

    /// Assert `first` was logged before `second`
    pub fn assert_before(&self, first: &str, second: &str) {
        let events = self.events();
        let a = self
            .position(first)
            .unwrap_or_else(|| panic!("missing event {first:?} in {events:?}"));
        let b = self
            .position(second)
            .unwrap_or_else(|| panic!("missing event {second:?} in {events:?}"));
        assert!(a < b, "expected {first:?} before {second:?} in {events:?}");
    }
}

/// Content source backed by a map, with failures and delays per URL
///
/// Logs `download:<url>` when a retrieval starts and `downloaded:<url>`
/// when it succeeds.
#[derive(Default)]
pub struct MockSource {
    content: HashMap<String, String>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    hits: Mutex<HashMap<String, usize>>,
    offline: bool,
    log: EventLog,
}

impl MockSource {
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            ..Default::default()
        }
    }

    pub fn with(mut self, url: &str, content: &str) -> Self {
        self.content.insert(url.to_string(), content.to_string());
        self
    }

    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn delayed(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    /// Network retrievals attempted for `url`
    pub fn hits(&self, url: &str) -> usize {
        self.hits.lock().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ContentSource for MockSource {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.log.push(format!("download:{url}"));
        *self.hits.lock().entry(url.to_string()).or_insert(0) += 1;

        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(url) {
            bail!("HTTP 503 for {url}");
        }
        let Some(content) = self.content.get(url) else {
            bail!("HTTP 404 for {url}");
        };

        self.log.push(format!("downloaded:{url}"));
        Ok(content.clone())
    }

    fn is_offline_bundle(&self) -> bool {
        self.offline
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Dropdown control that remembers its options and value
#[derive(Default)]
pub struct RecordingDropdown {
    pub options: Mutex<Vec<(String, OptionHandler)>>,
    pub value: Mutex<Option<String>>,
}

impl RecordingDropdown {
    pub fn option_names(&self) -> Vec<String> {
        self.options.lock().iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn select(&self, item: &str) {
        let options = self.options.lock();
        if let Some((_, handler)) = options.iter().find(|(name, _)| name == item) {
            handler();
        }
    }
}

impl DropdownControl for RecordingDropdown {
    fn add_option(&self, item: &str, on_select: OptionHandler) {
        self.options.lock().push((item.to_string(), on_select));
    }

    fn set_value(&self, value: &str) {
        *self.value.lock() = Some(value.to_string());
    }
}

/// Host that logs `style:<key>` and `widget:<content>`
#[derive(Default)]
pub struct RecordingHost {
    log: EventLog,
    pub styles: Mutex<Vec<(String, String)>>,
    pub widgets: Mutex<Vec<String>>,
    dropdowns: HashMap<String, Arc<RecordingDropdown>>,
}

impl RecordingHost {
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            ..Default::default()
        }
    }

    pub fn with_dropdown(mut self, key: &str) -> Self {
        self.dropdowns
            .insert(key.to_string(), Arc::new(RecordingDropdown::default()));
        self
    }

    pub fn dropdown(&self, key: &str) -> Arc<RecordingDropdown> {
        Arc::clone(&self.dropdowns[key])
    }
}

impl PageHost for RecordingHost {
    fn apply_style(&self, key: &str, css: &str) {
        self.log.push(format!("style:{key}"));
        self.styles.lock().push((key.to_string(), css.to_string()));
    }

    fn append_widget(&self, content: &str) {
        self.log.push(format!("widget:{content}"));
        self.widgets.lock().push(content.to_string());
    }

    fn find_dropdown(&self, key: &str) -> Option<Arc<dyn DropdownControl>> {
        self.dropdowns
            .get(key)
            .map(|control| Arc::clone(control) as Arc<dyn DropdownControl>)
    }
}

/// Notifier that keeps every message
#[derive(Default)]
pub struct RecordingNotifier {
    pub errors: Mutex<Vec<(String, String)>>,
    pub infos: Mutex<Vec<String>>,
    pub dismissed: Arc<AtomicUsize>,
}

struct RecordedHandle(Arc<AtomicUsize>);

impl NotificationHandle for RecordedHandle {
    fn dismiss(self: Box<Self>) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

impl RecordingNotifier {
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.lock().iter().map(|(m, _)| m.clone()).collect()
    }

    pub fn dismiss_count(&self) -> usize {
        self.dismissed.load(Ordering::SeqCst)
    }
}

impl Notifier for RecordingNotifier {
    fn error(&self, message: &str, title: &str) {
        self.errors
            .lock()
            .push((message.to_string(), title.to_string()));
    }

    fn info(&self, message: &str, _title: &str) -> Box<dyn NotificationHandle> {
        self.infos.lock().push(message.to_string());
        Box::new(RecordedHandle(Arc::clone(&self.dismissed)))
    }
}

/// Factory that logs `exec:<key>` and exports the key it ran for
pub fn recording_factory(
    log: &EventLog,
) -> impl Fn(&FactoryContext<'_>) -> Result<Option<ComponentExport>> + Send + Sync + 'static {
    let log = log.clone();
    move |ctx: &FactoryContext<'_>| {
        log.push(format!("exec:{}", ctx.key));
        Ok(Some(ComponentExport::new().with_value("key", ctx.key)))
    }
}

/// Component document that runs [`recording_factory`]
pub const RECORDED: &str = "factory: record\n";

/// Catalog from YAML
pub fn catalog(yaml: &str) -> CatalogManifest {
    CatalogManifest::from_yaml(yaml).expect("test catalog should parse")
}
