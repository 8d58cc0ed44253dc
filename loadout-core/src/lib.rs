//! Loadout library exports
//!
//! Loads features described by a resource catalog: downloads their content,
//! resolves dependencies in order, executes components behind a failure
//! boundary and installs their widgets and dropdown options.

pub mod cache;
pub mod catalog;
pub mod component;
pub mod error;
pub mod host;
pub mod install;
pub mod loader;
pub mod notify;
pub mod settings;
pub mod source;
pub mod store;
pub mod trace;

pub use catalog::{CatalogManifest, ResourceType};
pub use component::ComponentExport;
pub use error::LoaderError;
pub use loader::{FetchReport, Imported, Loader, LoaderBuilder};
pub use settings::Settings;
