//! Notification channel
//!
//! The real channel is contributed by the notification bootstrap component
//! (see [`crate::settings::NOTIFICATION_BOOTSTRAP_KEY`]). Until it is
//! loaded, or if it fails to load, [`LogNotifier`] reports to the log only.

use std::sync::Arc;

/// Title used for failure notifications
pub const ERROR_TITLE: &str = "Error";

/// A shown notification that can be taken down again
pub trait NotificationHandle: Send {
    fn dismiss(self: Box<Self>);
}

/// User-visible notification channel
pub trait Notifier: Send + Sync {
    /// Show a failure message
    fn error(&self, message: &str, title: &str);

    /// Show an informational message that stays until dismissed
    fn info(&self, message: &str, title: &str) -> Box<dyn NotificationHandle>;
}

/// Log-only notifier
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

struct LoggedNotification {
    title: String,
}

impl NotificationHandle for LoggedNotification {
    fn dismiss(self: Box<Self>) {
        tracing::debug!("Dismissed notification: {}", self.title);
    }
}

impl Notifier for LogNotifier {
    fn error(&self, message: &str, title: &str) {
        tracing::error!(target: "loadout::notify", "{}: {}", title, message);
    }

    fn info(&self, message: &str, title: &str) -> Box<dyn NotificationHandle> {
        tracing::info!(target: "loadout::notify", "{}: {}", title, message);
        Box::new(LoggedNotification {
            title: title.to_string(),
        })
    }
}

/// Shared default notifier
pub fn log_notifier() -> Arc<dyn Notifier> {
    Arc::new(LogNotifier)
}

/// Message for a component whose content could not be retrieved
pub fn download_failed_message(display_name: &str, detail: Option<&str>) -> String {
    with_detail(format!("Could not download component {display_name}"), detail)
}

/// Message for a component whose factory failed
pub fn execution_failed_message(display_name: &str, detail: Option<&str>) -> String {
    with_detail(format!("Failed to load component {display_name}"), detail)
}

fn with_detail(mut message: String, detail: Option<&str>) -> String {
    if let Some(detail) = detail {
        message.push('\n');
        message.push_str(detail);
    }
    message
}
