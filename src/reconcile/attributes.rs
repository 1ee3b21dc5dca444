//! Attribute reconciliation: set, remove, and listener binding.
//!
//! An attribute named `on<event>` whose value is a [`Callback`] is a
//! listener; it is attached and detached through the host instead of being
//! set. Event names are lowercased, so `onClick` binds `click`.

use crate::dom::{Host, NodeId};
use crate::value::{Map, Value};

/// The event a listener-shaped attribute binds, if it is one.
pub(crate) fn listener_event(name: &str, value: &Value) -> Option<String> {
    match value {
        Value::Callback(_) => name
            .strip_prefix("on")
            .filter(|event| !event.is_empty())
            .map(str::to_lowercase),
        _ => None,
    }
}

/// Bring the attributes of `node` from `prev` to `next`.
///
/// Changed and added attributes are applied first, then attributes missing
/// from `next` are removed. Unchanged attributes produce no host call; values
/// compare by equality and callbacks by identity. A `Null` value removes the
/// attribute.
pub(crate) fn reconcile<H: Host + ?Sized>(host: &mut H, node: NodeId, prev: Option<&Map>, next: &Map) {
    for (name, value) in next.iter() {
        let old = prev.and_then(|prev| prev.get(name));
        if old == Some(value) {
            continue;
        }
        let old_event = old.and_then(|old| listener_event(name, old));
        match (listener_event(name, value), value) {
            (Some(event), Value::Callback(listener)) => {
                if old_event.is_none() && old.is_some() {
                    host.remove_attribute(node, name);
                }
                tracing::trace!(?node, event, "bind listener");
                host.add_listener(node, &event, listener.clone());
            }
            _ => {
                if let Some(event) = old_event {
                    host.remove_listener(node, &event);
                }
                if value == &Value::Null {
                    host.remove_attribute(node, name);
                } else {
                    tracing::trace!(?node, name, "set attribute");
                    host.set_attribute(node, name, value);
                }
            }
        }
    }

    let Some(prev) = prev else {
        return;
    };
    for (name, value) in prev.iter() {
        if next.contains_key(name) {
            continue;
        }
        match listener_event(name, value) {
            Some(event) => host.remove_listener(node, &event),
            None => host.remove_attribute(node, name),
        }
    }
}
