//! Loader settings
//!
//! Settings are loaded once and passed by reference down the whole
//! fetch/execute chain; factories receive the same object.
//!
//! ```json
//! {
//!   "features": { "toast": true, "darkMode": true, "oldPlayer": false },
//!   "use_cache": true,
//!   "verbose_errors": false,
//!   "download_timeout_seconds": 30,
//!   "dropdown_poll": { "interval_ms": 200, "max_attempts": 50 },
//!   "themeColor": "#00a1d6"
//! }
//! ```
//!
//! Unrecognized keys are kept in [`Settings::values`] for factories.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::host::PollPolicy;

/// Key of the feature that provides the notification channel
pub const NOTIFICATION_BOOTSTRAP_KEY: &str = "toast";

/// Default download timeout (matches the HTTP client default)
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECONDS: u64 = 30;

/// Runtime settings shared by the loader and component factories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Feature enablement map; every `true` key is fetched
    #[serde(default)]
    pub features: BTreeMap<String, bool>,

    /// Serve and store downloaded content through the cache record
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,

    /// Append raw error details to user-visible failure notifications
    #[serde(default)]
    pub verbose_errors: bool,

    /// Upper bound for a single download
    #[serde(default = "default_download_timeout")]
    pub download_timeout_seconds: u64,

    /// Polling policy used while waiting for dropdown controls
    #[serde(default)]
    pub dropdown_poll: PollPolicy,

    /// Free-form options consumed by component factories
    #[serde(flatten)]
    pub values: serde_json::Map<String, serde_json::Value>,
}

fn default_use_cache() -> bool {
    true
}

fn default_download_timeout() -> u64 {
    DEFAULT_DOWNLOAD_TIMEOUT_SECONDS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            features: BTreeMap::new(),
            use_cache: default_use_cache(),
            verbose_errors: false,
            download_timeout_seconds: default_download_timeout(),
            dropdown_poll: PollPolicy::default(),
            values: serde_json::Map::new(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file, or defaults if the file does not exist
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;

        Self::from_json(&content)
            .with_context(|| format!("Failed to parse settings: {}", path.display()))
    }

    /// Parse settings from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Invalid settings JSON")
    }

    /// Enable or disable a feature
    pub fn set_feature(&mut self, key: &str, enabled: bool) {
        self.features.insert(key.to_string(), enabled);
    }

    /// Whether a feature is switched on
    pub fn is_enabled(&self, key: &str) -> bool {
        self.features.get(key).copied().unwrap_or(false)
    }

    /// Whether the notification bootstrap feature is switched on
    pub fn notifications_enabled(&self) -> bool {
        self.is_enabled(NOTIFICATION_BOOTSTRAP_KEY)
    }

    /// Enabled features other than the notification bootstrap, in key order
    pub fn enabled_features(&self) -> Vec<&str> {
        self.features
            .iter()
            .filter(|(key, enabled)| **enabled && key.as_str() != NOTIFICATION_BOOTSTRAP_KEY)
            .map(|(key, _)| key.as_str())
            .collect()
    }

    /// Download timeout as a [`Duration`]
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_seconds.max(1))
    }

    /// Look up a free-form value by key
    pub fn value(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    /// Truthiness of a flag, checking the feature map first and free-form values second
    pub fn flag(&self, key: &str) -> bool {
        if let Some(enabled) = self.features.get(key) {
            return *enabled;
        }
        self.values
            .get(key)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }
}
