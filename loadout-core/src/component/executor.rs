//! Component executor
//!
//! Turns downloaded document text into a [`ComponentExport`]. Evaluation
//! and factory invocation run inside a failure boundary: parse errors,
//! unknown factories, factory errors and factory panics all come back as
//! [`LoaderError::ExecutionFailure`] for this component alone.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::{debug, trace};

use super::{ComponentExport, ComponentScript, FactoryContext};
use crate::catalog::Resource;
use crate::error::LoaderError;
use crate::loader::Loader;

/// Evaluate `text` for `resource`
///
/// Returns `Ok(None)` when the document is blank and yields no component.
pub async fn execute(
    resource: &Resource,
    text: &str,
    loader: &Loader,
) -> Result<Option<ComponentExport>, LoaderError> {
    let failure = |reason: String| LoaderError::ExecutionFailure {
        key: resource.key().to_string(),
        display_name: resource.display_name().to_string(),
        reason,
    };

    let script = match ComponentScript::parse(text) {
        Ok(Some(script)) => script,
        Ok(None) => {
            debug!("Component '{}' evaluated to nothing", resource.key());
            return Ok(None);
        }
        Err(e) => return Err(failure(format!("{e:#}"))),
    };

    let declared = script.declared_export();

    let Some(factory_name) = script.factory.as_deref() else {
        trace!("Component '{}' is purely declarative", resource.key());
        return Ok(Some(declared));
    };

    let factory = loader
        .factories()
        .get(factory_name)
        .cloned()
        .ok_or_else(|| failure(format!("unknown factory '{factory_name}'")))?;

    debug!(
        "Invoking factory '{}' for component '{}'",
        factory_name,
        resource.key()
    );

    let ctx = FactoryContext {
        key: resource.key(),
        display_name: resource.display_name(),
        settings: loader.settings(),
        loader,
        options: &script.options,
    };

    match AssertUnwindSafe(factory.create(ctx)).catch_unwind().await {
        Ok(Ok(Some(export))) => Ok(Some(export.merge_declared(declared))),
        Ok(Ok(None)) => Ok(Some(declared)),
        Ok(Err(e)) => Err(failure(format!("{e:#}"))),
        Err(panic) => Err(failure(format!(
            "factory '{factory_name}' panicked: {}",
            panic_message(panic.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(panic_message(payload.as_ref()), "owned boom");

        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
