//! Page host interface
//!
//! The loader decides what to show; the host owns the page and does the
//! actual rendering. Hosts are expected to treat `apply_style` as
//! idempotent per key.

mod poll;

pub use poll::{wait_for, PollPolicy};

use std::sync::Arc;

/// Called when the user picks a dropdown option
pub type OptionHandler = Box<dyn Fn() + Send + Sync>;

/// The page the loader installs into
pub trait PageHost: Send + Sync {
    /// Apply a stylesheet identified by its resource key
    fn apply_style(&self, key: &str, css: &str);

    /// Append a fragment to the widget container
    fn append_widget(&self, content: &str);

    /// Find the dropdown control bound to a settings key, if it exists yet
    fn find_dropdown(&self, key: &str) -> Option<Arc<dyn DropdownControl>>;
}

/// An existing dropdown control on the page
pub trait DropdownControl: Send + Sync {
    /// Append a selectable option
    fn add_option(&self, item: &str, on_select: OptionHandler);

    /// Set the control's value and notify its listeners
    fn set_value(&self, value: &str);
}

/// Host with no page attached; styles and widgets only go to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedHost;

impl PageHost for DetachedHost {
    fn apply_style(&self, key: &str, css: &str) {
        tracing::debug!("Detached host: style {} ({} bytes)", key, css.len());
    }

    fn append_widget(&self, content: &str) {
        tracing::debug!("Detached host: widget ({} bytes)", content.len());
    }

    fn find_dropdown(&self, _key: &str) -> Option<Arc<dyn DropdownControl>> {
        None
    }
}
