//! Component documents
//!
//! A script resource downloads as a YAML (or JSON) document. It either names
//! a native factory registered with the loader, declares its export
//! directly, or both:
//!
//! ```yaml
//! factory: toast            # optional, a registered ComponentFactory
//! options:                  # optional, handed to the factory
//!   position: bottom-right
//! exports:                  # optional, free-form exported values
//!   version: 2
//! widget:                   # optional
//!   content: <button class="dark-toggle">Dark</button>
//!   condition: { setting: darkMode }
//! dropdown:                 # optional, a descriptor or a nested list
//!   key: darkSchedule
//!   items: [always, sunset]
//! ```
//!
//! Documents are data, never code: evaluating one only selects a factory
//! that was compiled into the host application.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ComponentExport, DropdownSpec, WidgetCondition, WidgetDescriptor};

/// Parsed component document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentScript {
    /// Name of the native factory to invoke
    #[serde(default)]
    pub factory: Option<String>,

    /// Factory options
    #[serde(default)]
    pub options: Value,

    /// Declared exported values
    #[serde(default)]
    pub exports: serde_json::Map<String, Value>,

    /// Declared widget
    #[serde(default)]
    pub widget: Option<WidgetSpec>,

    /// Declared dropdown options
    #[serde(default)]
    pub dropdown: Option<DropdownSpec>,
}

/// Declarative widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WidgetSpec {
    /// Fragment appended to the widget container
    #[serde(default)]
    pub content: Option<String>,

    /// When to install; defaults to always
    #[serde(default)]
    pub condition: ConditionSpec,
}

/// Declarative widget condition: a literal or a settings lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionSpec {
    Literal(bool),
    Setting { setting: String },
}

impl Default for ConditionSpec {
    fn default() -> Self {
        ConditionSpec::Literal(true)
    }
}

impl From<ConditionSpec> for WidgetCondition {
    fn from(spec: ConditionSpec) -> Self {
        match spec {
            ConditionSpec::Literal(true) => WidgetCondition::Always,
            ConditionSpec::Literal(false) => WidgetCondition::Never,
            ConditionSpec::Setting { setting } => WidgetCondition::Setting(setting),
        }
    }
}

impl ComponentScript {
    /// Parse a downloaded document
    ///
    /// Blank text produces no component (`Ok(None)`), mirroring a script
    /// that evaluates to nothing.
    pub fn parse(text: &str) -> Result<Option<Self>> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let script = serde_yaml_ng::from_str(text).context("Invalid component document")?;
        Ok(Some(script))
    }

    /// The export described by the declarative fields alone
    pub fn declared_export(&self) -> ComponentExport {
        ComponentExport {
            data: self.exports.clone(),
            widget: self.widget.clone().map(|spec| WidgetDescriptor {
                condition: spec.condition.into(),
                content: spec.content,
                success: None,
            }),
            dropdown: self.dropdown.clone(),
            notifier: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_document_is_no_component() {
        assert!(ComponentScript::parse("").unwrap().is_none());
        assert!(ComponentScript::parse("  \n\t").unwrap().is_none());
    }

    #[test]
    fn test_full_document() {
        let script = ComponentScript::parse(
            r#"
factory: darkMode
options:
  strength: 0.8
exports:
  version: 2
widget:
  content: <button>Dark</button>
  condition: { setting: darkMode }
dropdown:
  - key: darkSchedule
    items: [always, sunset]
"#,
        )
        .unwrap()
        .unwrap();

        assert_eq!(script.factory.as_deref(), Some("darkMode"));
        assert_eq!(script.options["strength"], Value::from(0.8));

        let export = script.declared_export();
        assert_eq!(export.get("version"), Some(&Value::from(2)));
        let widget = export.widget.unwrap();
        assert_eq!(widget.content.as_deref(), Some("<button>Dark</button>"));
        assert!(matches!(widget.condition, WidgetCondition::Setting(ref k) if k == "darkMode"));
        assert_eq!(export.dropdown.unwrap().flatten()[0].items, vec!["always", "sunset"]);
    }

    #[test]
    fn test_literal_conditions() {
        let script = ComponentScript::parse("widget:\n  content: x\n  condition: false\n")
            .unwrap()
            .unwrap();
        let export = script.declared_export();
        assert!(matches!(export.widget.unwrap().condition, WidgetCondition::Never));

        let script = ComponentScript::parse("widget:\n  content: x\n").unwrap().unwrap();
        let export = script.declared_export();
        assert!(matches!(export.widget.unwrap().condition, WidgetCondition::Always));
    }

    #[test]
    fn test_json_document() {
        let script = ComponentScript::parse(r#"{"exports": {"ready": true}}"#)
            .unwrap()
            .unwrap();
        assert!(script.factory.is_none());
        assert_eq!(script.declared_export().get("ready"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_rejects_non_documents() {
        assert!(ComponentScript::parse("(function(){ return 1 })()").is_err());
        assert!(ComponentScript::parse("factroy: typo").is_err());
    }
}
