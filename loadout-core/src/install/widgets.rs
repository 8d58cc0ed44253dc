use futures::future::join_all;
use futures::FutureExt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::component::{ComponentExport, WidgetDescriptor};
use crate::host::PageHost;
use crate::settings::Settings;

/// Install every export's widget whose condition holds
///
/// Widgets are evaluated concurrently. A condition or success callback that
/// panics affects only its own widget. Returns the number installed.
pub async fn install_widgets(
    exports: &[(String, Arc<ComponentExport>)],
    settings: &Settings,
    host: &dyn PageHost,
) -> usize {
    let candidates = exports
        .iter()
        .filter_map(|(key, export)| export.widget.as_ref().map(|widget| (key.as_str(), widget)));

    let installed = join_all(
        candidates.map(|(key, widget)| install_widget(key, widget, settings, host)),
    )
    .await
    .into_iter()
    .filter(|installed| *installed)
    .count();

    debug!("Installed {} widgets", installed);
    installed
}

async fn install_widget(
    key: &str,
    widget: &WidgetDescriptor,
    settings: &Settings,
    host: &dyn PageHost,
) -> bool {
    let satisfied = AssertUnwindSafe(widget.condition.evaluate(settings))
        .catch_unwind()
        .await
        .unwrap_or_else(|_| {
            warn!("Widget condition of '{}' panicked", key);
            false
        });

    if !satisfied {
        trace!("Widget of '{}' not shown, condition is false", key);
        return false;
    }

    if let Some(content) = widget.content.as_deref() {
        host.append_widget(content);
    }
    if let Some(success) = &widget.success {
        if panic::catch_unwind(AssertUnwindSafe(|| success())).is_err() {
            warn!("Widget success callback of '{}' panicked", key);
        }
    }
    true
}
