//! Resource catalog and runtime registry
//!
//! ```text
//! catalog.yaml            ← keys, display names, types, URLs, dependencies
//!      │
//!      ▼
//! CatalogManifest         ← parsed, checkable
//!      │
//!      ▼
//! Registry                ← one Resource per key, single-flight downloads
//! ```

mod manifest;
mod registry;

pub use manifest::{CatalogCheck, CatalogManifest, ResourceEntry, ResourceType};
pub use registry::{Registry, Resource, MINIFIED_SCRIPT_SUFFIX};
