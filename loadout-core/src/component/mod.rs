//! Components: what executing a script resource produces
//!
//! A downloaded script resource is a component document (see
//! [`ComponentScript`]). Evaluating it yields a [`ComponentExport`], a
//! capability bag with a fixed schema:
//!
//! - `data`: free-form values other components may import
//! - `widget`: an optional conditional UI contribution
//! - `dropdown`: optional options for existing dropdown controls
//! - `notifier`: an optional notification channel (used by the bootstrap component)

pub mod executor;
pub mod factory;
pub mod script;

pub use factory::{ComponentFactory, FactoryContext, FactoryRegistry, FnFactory};
pub use script::{ComponentScript, ConditionSpec, WidgetSpec};

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::notify::Notifier;
use crate::settings::Settings;

/// Callback run after a widget was installed
pub type SuccessCallback = Arc<dyn Fn() + Send + Sync>;

/// Synchronous widget predicate
pub type Predicate = Arc<dyn Fn() -> bool + Send + Sync>;

/// Asynchronous widget predicate; an error counts as `false`
pub type AsyncPredicate = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<bool>> + Send + Sync>;

/// Capability object produced by a component
#[derive(Clone, Default)]
pub struct ComponentExport {
    /// Free-form exported values
    pub data: serde_json::Map<String, Value>,

    /// Conditional widget contribution
    pub widget: Option<WidgetDescriptor>,

    /// Dropdown option contribution
    pub dropdown: Option<DropdownSpec>,

    /// Notification channel contributed by the bootstrap component
    pub notifier: Option<Arc<dyn Notifier>>,
}

impl fmt::Debug for ComponentExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentExport")
            .field("data", &self.data)
            .field("widget", &self.widget)
            .field("dropdown", &self.dropdown)
            .field("notifier", &self.notifier.is_some())
            .finish()
    }
}

impl ComponentExport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an exported value
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_widget(mut self, widget: WidgetDescriptor) -> Self {
        self.widget = Some(widget);
        self
    }

    pub fn with_dropdown(mut self, dropdown: DropdownSpec) -> Self {
        self.dropdown = Some(dropdown);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Look up an exported value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Whether nothing at all is exported
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
            && self.widget.is_none()
            && self.dropdown.is_none()
            && self.notifier.is_none()
    }

    /// Fill fields this export leaves unset from `declared`
    ///
    /// Values set by the factory win; declared data keys are only added
    /// when the factory did not export the same key.
    pub fn merge_declared(mut self, declared: ComponentExport) -> Self {
        for (key, value) in declared.data {
            self.data.entry(key).or_insert(value);
        }
        if self.widget.is_none() {
            self.widget = declared.widget;
        }
        if self.dropdown.is_none() {
            self.dropdown = declared.dropdown;
        }
        if self.notifier.is_none() {
            self.notifier = declared.notifier;
        }
        self
    }
}

/// A conditional UI contribution
#[derive(Clone)]
pub struct WidgetDescriptor {
    /// When to install
    pub condition: WidgetCondition,

    /// Fragment appended to the widget container
    pub content: Option<String>,

    /// Run after the content was appended
    pub success: Option<SuccessCallback>,
}

impl fmt::Debug for WidgetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetDescriptor")
            .field("condition", &self.condition)
            .field("content", &self.content)
            .field("success", &self.success.is_some())
            .finish()
    }
}

impl WidgetDescriptor {
    /// Unconditional widget with content
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            condition: WidgetCondition::Always,
            content: Some(content.into()),
            success: None,
        }
    }

    /// Widget that only runs its success callback
    pub fn headless() -> Self {
        Self {
            condition: WidgetCondition::Always,
            content: None,
            success: None,
        }
    }

    pub fn when(mut self, condition: WidgetCondition) -> Self {
        self.condition = condition;
        self
    }

    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.success = Some(Arc::new(callback));
        self
    }
}

/// When a widget should be installed
#[derive(Clone)]
pub enum WidgetCondition {
    Always,
    Never,
    /// A feature flag or boolean setting must be on
    Setting(String),
    Predicate(Predicate),
    AsyncPredicate(AsyncPredicate),
}

impl fmt::Debug for WidgetCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WidgetCondition::Always => f.write_str("Always"),
            WidgetCondition::Never => f.write_str("Never"),
            WidgetCondition::Setting(key) => f.debug_tuple("Setting").field(key).finish(),
            WidgetCondition::Predicate(_) => f.write_str("Predicate(..)"),
            WidgetCondition::AsyncPredicate(_) => f.write_str("AsyncPredicate(..)"),
        }
    }
}

impl WidgetCondition {
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        WidgetCondition::Predicate(Arc::new(predicate))
    }

    pub fn async_predicate<F>(predicate: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, anyhow::Result<bool>> + Send + Sync + 'static,
    {
        WidgetCondition::AsyncPredicate(Arc::new(predicate))
    }

    /// Evaluate the condition; a failing async predicate yields `false`
    pub async fn evaluate(&self, settings: &Settings) -> bool {
        match self {
            WidgetCondition::Always => true,
            WidgetCondition::Never => false,
            WidgetCondition::Setting(key) => settings.flag(key),
            WidgetCondition::Predicate(predicate) => predicate(),
            WidgetCondition::AsyncPredicate(predicate) => match predicate().await {
                Ok(satisfied) => satisfied,
                Err(e) => {
                    tracing::debug!("Widget condition failed, treating as false: {:#}", e);
                    false
                }
            },
        }
    }
}

/// Options for one dropdown control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropdownDescriptor {
    /// Settings key the control is bound to
    pub key: String,

    /// Options to add
    #[serde(default)]
    pub items: Vec<String>,
}

/// One dropdown descriptor or an arbitrarily nested list of them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DropdownSpec {
    One(DropdownDescriptor),
    Many(Vec<DropdownSpec>),
}

impl DropdownSpec {
    pub fn one(key: impl Into<String>, items: &[&str]) -> Self {
        DropdownSpec::One(DropdownDescriptor {
            key: key.into(),
            items: items.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// All descriptors, depth first
    pub fn flatten(&self) -> Vec<&DropdownDescriptor> {
        let mut out = Vec::new();
        self.collect_into(&mut out);
        out
    }

    fn collect_into<'a>(&'a self, out: &mut Vec<&'a DropdownDescriptor>) {
        match self {
            DropdownSpec::One(descriptor) => out.push(descriptor),
            DropdownSpec::Many(specs) => {
                for spec in specs {
                    spec.collect_into(out);
                }
            }
        }
    }
}
