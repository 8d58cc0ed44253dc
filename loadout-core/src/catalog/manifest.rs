//! Resource catalog parsing and static checks
//!
//! The catalog lists every resource the loader may fetch:
//!
//! ```yaml
//! resources:
//!   toast:
//!     displayName: Toast notifications
//!     type: script
//!     url: https://cdn.example.com/min/toast.min.js
//!     dependencies: [toastStyle]
//!   toastStyle:
//!     displayName: Toast style
//!     type: style
//!     url: https://cdn.example.com/min/toast.min.css
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

use crate::component::DropdownSpec;

/// Kind of content a resource carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// Markup fragment, imported as text
    #[serde(alias = "html")]
    Markup,
    /// Stylesheet, applied to the page when fetched
    #[serde(alias = "css")]
    Style,
    /// Component document, executed into an export
    Script,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceType::Markup => "markup",
            ResourceType::Style => "style",
            ResourceType::Script => "script",
        };
        f.write_str(name)
    }
}

/// A single catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEntry {
    /// Human readable name used in notifications
    pub display_name: String,

    /// Content kind
    #[serde(rename = "type")]
    pub kind: ResourceType,

    /// Where the content is fetched from
    pub url: String,

    /// Keys of resources that must be fetched first
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Options contributed to an existing dropdown control
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropdown: Option<DropdownSpec>,
}

/// The whole catalog, keyed by resource key
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogManifest {
    /// All resources, keyed by their unique key
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceEntry>,
}

/// Problems found by [`CatalogManifest::check`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogCheck {
    /// `(resource, dependency)` pairs whose dependency is not in the catalog
    pub missing_dependencies: Vec<(String, String)>,

    /// Dependency loops, each listed from its first key back to itself
    pub cycles: Vec<Vec<String>>,
}

impl CatalogCheck {
    /// Whether the catalog is free of problems
    pub fn is_clean(&self) -> bool {
        self.missing_dependencies.is_empty() && self.cycles.is_empty()
    }
}

impl CatalogManifest {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from YAML (JSON is accepted as well)
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml_ng::from_str(content).context("Failed to parse resource catalog")
    }

    /// Load a catalog file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog: {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Invalid catalog: {}", path.display()))
    }

    /// Add or replace an entry
    pub fn insert(&mut self, key: impl Into<String>, entry: ResourceEntry) {
        self.resources.insert(key.into(), entry);
    }

    /// Number of resources
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the catalog has no resources
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Report dangling dependency keys and dependency cycles
    ///
    /// Neither is fatal to the loader: missing keys become skipped imports
    /// and cycles are cut at runtime. This is for catalog authors.
    pub fn check(&self) -> CatalogCheck {
        let mut check = CatalogCheck::default();

        for (key, entry) in &self.resources {
            for dep in &entry.dependencies {
                if !self.resources.contains_key(dep) {
                    check.missing_dependencies.push((key.clone(), dep.clone()));
                }
            }
        }

        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit<'a>(
            key: &'a str,
            resources: &'a BTreeMap<String, ResourceEntry>,
            marks: &mut HashMap<&'a str, Mark>,
            stack: &mut Vec<&'a str>,
            cycles: &mut Vec<Vec<String>>,
        ) {
            match marks.get(key) {
                Some(Mark::Done) => return,
                Some(Mark::Visiting) => {
                    if let Some(start) = stack.iter().position(|k| *k == key) {
                        let mut cycle: Vec<String> =
                            stack[start..].iter().map(|k| k.to_string()).collect();
                        cycle.push(key.to_string());
                        cycles.push(cycle);
                    }
                    return;
                }
                None => {}
            }

            let Some(entry) = resources.get(key) else {
                return;
            };

            marks.insert(key, Mark::Visiting);
            stack.push(key);
            for dep in &entry.dependencies {
                visit(dep, resources, marks, stack, cycles);
            }
            stack.pop();
            marks.insert(key, Mark::Done);
        }

        let mut marks = HashMap::new();
        let mut stack = Vec::new();
        for key in self.resources.keys() {
            visit(key, &self.resources, &mut marks, &mut stack, &mut check.cycles);
        }

        check
    }
}
