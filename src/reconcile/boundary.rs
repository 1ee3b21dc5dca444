//! Error boundary propagation.
//!
//! A failure walks the ancestor chain. The first live instance that defines
//! `did_catch` and is not already handling a failure catches it: its
//! `caught` flag is set and the hook runs. The flag clears once the
//! boundary's next render completes, so a failing fallback escalates while
//! a recovered boundary catches again. A catch hook that fails passes its
//! own error further up. If nobody catches, the error escapes as
//! [`ReconcileError::Uncaught`].

use std::rc::Rc;

use super::ReconcileError;
use crate::component::instance::{InstanceId, Registry};
use crate::component::{ComponentError, ComponentHandle, Phase};

pub(crate) fn propagate(
    registry: &Rc<Registry>,
    start: Option<InstanceId>,
    error: ComponentError,
) -> Result<(), ReconcileError> {
    let mut error = error;
    let mut cursor = start;

    while let Some(id) = cursor {
        let Some(instance) = registry.get(id) else {
            break;
        };
        cursor = instance.ancestor;

        let Some(hook) = &instance.def.hooks().did_catch else {
            continue;
        };
        let (caught, phase) = {
            let data = instance.data();
            (data.caught, data.phase)
        };
        if caught || matches!(phase, Phase::Unmounting | Phase::Unmounted) {
            continue;
        }

        instance.data.borrow_mut().caught = true;
        tracing::debug!(boundary = instance.name(), %error, "error caught");
        match hook(&ComponentHandle::new(id, registry), &error) {
            Ok(()) => return Ok(()),
            Err(next) => error = next.raised_in(instance.name()),
        }
    }

    let component = error.component().unwrap_or("<root>").to_owned();
    tracing::debug!(component, %error, "error escaped every boundary");
    Err(ReconcileError::Uncaught {
        component,
        source: error,
    })
}
