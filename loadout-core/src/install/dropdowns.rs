use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::component::{ComponentExport, DropdownDescriptor, DropdownSpec};
use crate::host::{wait_for, PageHost, PollPolicy};

/// Add dropdown options from catalog entries and exports
///
/// Each descriptor waits for its control under `policy`; a control that
/// never appears is logged and skipped. Returns the number of options added.
pub async fn install_dropdowns<'a>(
    catalog_specs: impl IntoIterator<Item = &'a DropdownSpec>,
    exports: &'a [(String, Arc<ComponentExport>)],
    host: &dyn PageHost,
    policy: PollPolicy,
) -> usize {
    let descriptors: Vec<&DropdownDescriptor> = catalog_specs
        .into_iter()
        .chain(exports.iter().filter_map(|(_, export)| export.dropdown.as_ref()))
        .flat_map(DropdownSpec::flatten)
        .collect();

    let added = join_all(
        descriptors
            .into_iter()
            .map(|descriptor| install_dropdown(descriptor, host, policy)),
    )
    .await
    .into_iter()
    .sum::<usize>();

    debug!("Added {} dropdown options", added);
    added
}

async fn install_dropdown(
    descriptor: &DropdownDescriptor,
    host: &dyn PageHost,
    policy: PollPolicy,
) -> usize {
    let Some(control) = wait_for(policy, || host.find_dropdown(&descriptor.key)).await else {
        warn!(
            "Dropdown '{}' did not appear after {} attempts",
            descriptor.key, policy.max_attempts
        );
        return 0;
    };

    for item in &descriptor.items {
        let target = Arc::downgrade(&control);
        let value = item.clone();
        control.add_option(
            item,
            Box::new(move || {
                if let Some(control) = target.upgrade() {
                    control.set_value(&value);
                }
            }),
        );
    }
    descriptor.items.len()
}
