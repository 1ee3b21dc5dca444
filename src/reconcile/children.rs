//! Child list reconciliation.
//!
//! Keyed children match the previous child with the same key wherever it
//! was. Unkeyed children match the unkeyed previous child at the same index.
//! Unmatched previous children are removed; unmatched next children are
//! mounted. A final placement pass moves each output node to its index,
//! touching only nodes that are out of place.

use std::collections::HashMap;

use super::engine::{Engine, Pass};
use super::mounted::Mounted;
use super::ReconcileError;
use crate::component::InstanceId;
use crate::dom::{Host, NodeId};
use crate::value::Map;
use crate::vnode::{Key, VNode};

impl<H: Host> Engine<H> {
    pub(super) fn diff_children(
        &mut self,
        parent: NodeId,
        prev: Vec<Mounted>,
        next: &[VNode],
        ancestor: Option<InstanceId>,
        context: &Map,
        pass: &mut Pass,
    ) -> Result<Vec<Mounted>, ReconcileError> {
        let mut old: Vec<Option<Mounted>> = prev.into_iter().map(Some).collect();

        // First occurrence wins; later duplicates mount fresh.
        let mut keyed: HashMap<Key, usize> = HashMap::new();
        for (index, child) in old.iter().enumerate() {
            if let Some(key) = child.as_ref().and_then(Mounted::key) {
                keyed.entry(key.clone()).or_insert(index);
            }
        }

        let mut out = Vec::with_capacity(next.len());
        for (index, child) in next.iter().enumerate() {
            let matched = match child.key() {
                Some(key) => keyed.get(key).and_then(|&at| old[at].take()),
                None => match old.get_mut(index) {
                    Some(slot) if slot.as_ref().is_some_and(|m| m.key().is_none()) => slot.take(),
                    _ => None,
                },
            };
            if let Some(mounted) = self.diff(matched, Some(child), ancestor, context, pass)? {
                out.push(mounted);
            }
        }

        for leftover in old.into_iter().flatten() {
            self.remove(leftover)?;
        }

        for (index, mounted) in out.iter().enumerate() {
            let Some(node) = self.node_of(mounted) else {
                continue;
            };
            if self.host.child_at(parent, index) != Some(node) {
                tracing::trace!(?node, index, "place child");
                self.host.insert(parent, node, index);
            }
        }

        Ok(out)
    }
}
