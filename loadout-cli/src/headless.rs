//! Page host and notification channel for running passes in a terminal

use anyhow::Result;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

use loadout_core::component::{ComponentExport, FactoryContext, FactoryRegistry};
use loadout_core::host::{DropdownControl, OptionHandler, PageHost};
use loadout_core::notify::{NotificationHandle, Notifier};
use loadout_core::settings::NOTIFICATION_BOOTSTRAP_KEY;

/// Records what a page would have received
#[derive(Default)]
pub struct HeadlessHost {
    styles: Mutex<Vec<(String, usize)>>,
    widgets: Mutex<Vec<String>>,
    dropdowns: Mutex<BTreeMap<String, Arc<HeadlessDropdown>>>,
}

impl HeadlessHost {
    /// `(key, bytes)` for every applied style
    pub fn styles(&self) -> Vec<(String, usize)> {
        self.styles.lock().clone()
    }

    pub fn widgets(&self) -> Vec<String> {
        self.widgets.lock().clone()
    }

    /// Options added to each dropdown, by key
    pub fn dropdown_options(&self) -> BTreeMap<String, Vec<String>> {
        self.dropdowns
            .lock()
            .iter()
            .map(|(key, control)| (key.clone(), control.options.lock().clone()))
            .collect()
    }
}

impl PageHost for HeadlessHost {
    fn apply_style(&self, key: &str, css: &str) {
        tracing::debug!("Style {} applied ({} bytes)", key, css.len());
        self.styles.lock().push((key.to_string(), css.len()));
    }

    fn append_widget(&self, content: &str) {
        self.widgets.lock().push(content.to_string());
    }

    /// Every dropdown exists; controls are created on first lookup
    fn find_dropdown(&self, key: &str) -> Option<Arc<dyn DropdownControl>> {
        let control = Arc::clone(self.dropdowns.lock().entry(key.to_string()).or_default());
        Some(control)
    }
}

#[derive(Default)]
struct HeadlessDropdown {
    options: Mutex<Vec<String>>,
}

impl DropdownControl for HeadlessDropdown {
    fn add_option(&self, item: &str, _on_select: OptionHandler) {
        self.options.lock().push(item.to_string());
    }

    fn set_value(&self, value: &str) {
        tracing::debug!("Dropdown value set to {}", value);
    }
}

/// Prints notifications to stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

struct ConsoleNotice;

impl NotificationHandle for ConsoleNotice {
    fn dismiss(self: Box<Self>) {}
}

impl Notifier for ConsoleNotifier {
    fn error(&self, message: &str, title: &str) {
        eprintln!("[{title}] {message}");
    }

    fn info(&self, message: &str, title: &str) -> Box<dyn NotificationHandle> {
        eprintln!("[{title}] {message}");
        Box::new(ConsoleNotice)
    }
}

/// Factories available to component documents run from the CLI
///
/// `toast` provides the [`ConsoleNotifier`] for the notification bootstrap.
pub fn builtin_factories() -> FactoryRegistry {
    let mut factories = FactoryRegistry::new();
    factories.register_fn(
        NOTIFICATION_BOOTSTRAP_KEY,
        |_ctx: &FactoryContext<'_>| -> Result<Option<ComponentExport>> {
            Ok(Some(
                ComponentExport::new().with_notifier(Arc::new(ConsoleNotifier)),
            ))
        },
    );
    factories
}
