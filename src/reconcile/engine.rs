//! The diff engine: mounts, patches, replaces, and tears down positions, and
//! drives component instances through their lifecycle.

use std::collections::HashMap;
use std::rc::Rc;

use super::attributes;
use super::boundary;
use super::mounted::Mounted;
use super::ReconcileError;
use crate::component::instance::{Instance, InstanceData, InstanceId, Registry};
use crate::component::{
    Component, ComponentError, ComponentHandle, LifecycleEvent, LifecycleTracker, Phase, Scope,
};
use crate::dom::{Host, NodeId};
use crate::value::Map;
use crate::vnode::{ComponentRef, Element, NodeRef, Props, VNode};

// ---------------------------------------------------------------------------
// Pass bookkeeping
// ---------------------------------------------------------------------------

/// Work collected during one render pass and flushed when it ends.
#[derive(Default)]
pub(super) struct Pass {
    /// Instances whose first render completed, children before parents.
    mounts: Vec<InstanceId>,
}

/// Why an instance is being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Mount,
    /// The parent re-rendered with new props.
    Props,
    /// Drained from the render queue.
    Queued,
    /// `force_update`: skips "should update?".
    Force,
}

/// A failed component render: either the component's own code failed (and a
/// boundary may recover) or the engine hit a fatal condition.
enum Failure {
    Component(ComponentError),
    Fatal(ReconcileError),
}

impl From<ComponentError> for Failure {
    fn from(err: ComponentError) -> Self {
        Failure::Component(err)
    }
}

impl From<ReconcileError> for Failure {
    fn from(err: ReconcileError) -> Self {
        Failure::Fatal(err)
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub(crate) struct Engine<H: Host> {
    pub host: H,
    registry: Rc<Registry>,
    /// Roots rendered into each container, in render order.
    roots: HashMap<NodeId, Vec<Mounted>>,
    lifecycle: LifecycleTracker,
    max_passes: usize,
}

impl<H: Host> Engine<H> {
    pub fn new(host: H, registry: Rc<Registry>, max_passes: usize) -> Self {
        Self {
            host,
            registry,
            roots: HashMap::new(),
            lifecycle: LifecycleTracker::new(),
            max_passes: max_passes.max(1),
        }
    }

    pub fn take_lifecycle_events(&mut self) -> Vec<LifecycleEvent> {
        self.lifecycle.pending_events()
    }

    /// Host nodes of the roots rendered into `container`.
    pub fn roots(&self, container: NodeId) -> Vec<NodeId> {
        self.roots
            .get(&container)
            .map(|roots| roots.iter().filter_map(|m| self.node_of(m)).collect())
            .unwrap_or_default()
    }

    pub(super) fn node_of(&self, mounted: &Mounted) -> Option<NodeId> {
        mounted.node(&self.registry)
    }

    fn handle(&self, id: InstanceId) -> ComponentHandle {
        ComponentHandle::new(id, &self.registry)
    }

    // ── Entry points ─────────────────────────────────────────────────

    /// Mount `vnode` into `container`, or diff it against the root at
    /// `existing`.
    pub fn render_root(
        &mut self,
        vnode: &VNode,
        container: NodeId,
        existing: Option<NodeId>,
    ) -> Result<NodeId, ReconcileError> {
        let _span = tracing::debug_span!("render_pass", ?container).entered();
        let mut pass = Pass::default();

        let (mounted, slot) = match existing {
            None => {
                tracing::debug!(root = %vnode.summary(), "mounting root");
                let mounted = self.mount(vnode, None, &Map::new(), &mut pass)?;
                if let Some(node) = self.node_of(&mounted) {
                    let end = self.host.child_count(container);
                    self.host.insert(container, node, end);
                }
                (mounted, None)
            }
            Some(existing) => {
                let index = self
                    .roots
                    .get(&container)
                    .and_then(|roots| {
                        roots
                            .iter()
                            .position(|m| self.node_of(m) == Some(existing))
                    })
                    .ok_or(ReconcileError::UnknownRoot { container })?;
                let prev = self
                    .roots
                    .get_mut(&container)
                    .map(|roots| roots.remove(index))
                    .ok_or(ReconcileError::UnknownRoot { container })?;
                tracing::debug!(root = %vnode.summary(), "diffing root");
                (self.patch(prev, vnode, None, &Map::new(), &mut pass)?, Some(index))
            }
        };

        let node = self
            .node_of(&mounted)
            .ok_or(ReconcileError::UnknownRoot { container })?;
        let roots = self.roots.entry(container).or_default();
        match slot {
            Some(index) if index <= roots.len() => roots.insert(index, mounted),
            _ => roots.push(mounted),
        }

        self.flush_mounts(pass)?;
        self.run_forced()?;
        Ok(node)
    }

    /// Tear down every root rendered into `container`.
    pub fn unmount_container(&mut self, container: NodeId) -> Result<(), ReconcileError> {
        let _span = tracing::debug_span!("render_pass", ?container).entered();
        let roots = self.roots.remove(&container).unwrap_or_default();
        tracing::debug!(roots = roots.len(), "unmounting container");
        let mut first_error = None;
        for root in roots {
            if let Err(err) = self.remove(root) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Re-render one instance outside of a parent's pass.
    pub fn rerender(&mut self, id: InstanceId, force: bool) -> Result<(), ReconcileError> {
        let Some(instance) = self.registry.get(id) else {
            return Ok(());
        };
        if !force && !instance.data().dirty {
            return Ok(());
        }
        let _span = tracing::debug_span!("render_pass", component = instance.name()).entered();
        tracing::debug!(force, "re-rendering component");

        let mut pass = Pass::default();
        let mode = if force { Mode::Force } else { Mode::Queued };
        self.render_component(id, mode, &mut pass)?;
        self.flush_mounts(pass)?;
        self.run_forced()
    }

    /// Run force updates that arrived while a pass was running.
    fn run_forced(&mut self) -> Result<(), ReconcileError> {
        let mut passes = 0usize;
        loop {
            let forced = self.registry.take_forced();
            if forced.is_empty() {
                return Ok(());
            }
            for id in forced {
                passes += 1;
                if passes > self.max_passes {
                    return Err(ReconcileError::RunawayUpdates {
                        limit: self.max_passes,
                    });
                }
                let mut pass = Pass::default();
                self.render_component(id, Mode::Force, &mut pass)?;
                self.flush_mounts(pass)?;
            }
        }
    }

    /// Run "after mount" hooks and queued callbacks, children first.
    fn flush_mounts(&mut self, pass: Pass) -> Result<(), ReconcileError> {
        for id in pass.mounts {
            let Some(instance) = self.registry.get(id) else {
                continue;
            };
            if instance.data().phase != Phase::Mounting {
                continue;
            }
            instance.data.borrow_mut().enter(Phase::Mounted);
            self.lifecycle.on_mount(id, instance.name());

            let handle = self.handle(id);
            if let Some(hook) = &instance.def.hooks().did_mount {
                if let Err(err) = hook(&handle) {
                    boundary::propagate(&self.registry, Some(id), err.raised_in(instance.name()))?;
                    continue;
                }
            }
            for callback in handle.take_callbacks() {
                callback();
            }
        }
        Ok(())
    }

    // ── Diff ─────────────────────────────────────────────────────────

    /// Reconcile one position.
    pub(super) fn diff(
        &mut self,
        prev: Option<Mounted>,
        next: Option<&VNode>,
        ancestor: Option<InstanceId>,
        context: &Map,
        pass: &mut Pass,
    ) -> Result<Option<Mounted>, ReconcileError> {
        match (prev, next) {
            (None, None) => Ok(None),
            (Some(prev), None) => {
                self.remove(prev)?;
                Ok(None)
            }
            (None, Some(next)) => self.mount(next, ancestor, context, pass).map(Some),
            (Some(prev), Some(next)) => self.patch(prev, next, ancestor, context, pass).map(Some),
        }
    }

    fn patch(
        &mut self,
        prev: Mounted,
        next: &VNode,
        ancestor: Option<InstanceId>,
        context: &Map,
        pass: &mut Pass,
    ) -> Result<Mounted, ReconcileError> {
        let placeholder;
        let next = if next.is_unresolved() {
            tracing::warn!("unresolved component renders nothing");
            placeholder = VNode::empty();
            &placeholder
        } else {
            next
        };

        match (prev, next) {
            (Mounted::Text { node, text }, VNode::Text(next_text)) => {
                if *text != **next_text {
                    tracing::trace!(?node, "set text");
                    self.host.set_text(node, next_text);
                }
                Ok(Mounted::Text {
                    node,
                    text: next_text.clone(),
                })
            }
            (
                Mounted::Element {
                    node,
                    element,
                    children,
                },
                VNode::Element(next_el),
            ) if element.tag == next_el.tag => {
                attributes::reconcile(&mut self.host, node, Some(&element.attributes), &next_el.attributes);
                let children =
                    self.diff_children(node, children, &next_el.children, ancestor, context, pass)?;
                update_ref(&next_el.tag, element.node_ref.as_ref(), next_el.node_ref.as_ref(), node)?;
                Ok(Mounted::Element {
                    node,
                    element: next_el.clone(),
                    children,
                })
            }
            (Mounted::Component { id, component, .. }, VNode::Component(next_ref))
                if next_ref
                    .component
                    .as_ref()
                    .is_some_and(|def| Rc::ptr_eq(def, &component)) =>
            {
                self.update_component(id, next_ref, context, pass)?;
                Ok(Mounted::Component {
                    id,
                    component,
                    key: next_ref.key.clone(),
                })
            }
            (prev, next) => self.replace(prev, next, ancestor, context, pass),
        }
    }

    /// Mount `next` fresh, put it where `prev` was, then remove `prev`.
    fn replace(
        &mut self,
        prev: Mounted,
        next: &VNode,
        ancestor: Option<InstanceId>,
        context: &Map,
        pass: &mut Pass,
    ) -> Result<Mounted, ReconcileError> {
        let position = self.node_of(&prev).and_then(|node| self.host.position(node));
        tracing::trace!(next = %next.summary(), "replacing position");
        let mounted = self.mount(next, ancestor, context, pass)?;
        if let (Some((parent, index)), Some(node)) = (position, self.node_of(&mounted)) {
            self.host.insert(parent, node, index);
        }
        self.remove(prev)?;
        Ok(mounted)
    }

    // ── Mount ────────────────────────────────────────────────────────

    fn mount(
        &mut self,
        vnode: &VNode,
        ancestor: Option<InstanceId>,
        context: &Map,
        pass: &mut Pass,
    ) -> Result<Mounted, ReconcileError> {
        match vnode {
            VNode::Text(text) => Ok(Mounted::Text {
                node: self.host.create_text(text),
                text: text.clone(),
            }),
            VNode::Element(element) => self.mount_element(element, ancestor, context, pass),
            VNode::Component(reference) => match &reference.component {
                Some(def) => self.mount_component(def, reference, ancestor, context, pass),
                None => {
                    tracing::warn!("unresolved component renders nothing");
                    self.mount(&VNode::empty(), ancestor, context, pass)
                }
            },
        }
    }

    fn mount_element(
        &mut self,
        element: &Rc<Element>,
        ancestor: Option<InstanceId>,
        context: &Map,
        pass: &mut Pass,
    ) -> Result<Mounted, ReconcileError> {
        let node = self.host.create_element(&element.tag);
        attributes::reconcile(&mut self.host, node, None, &element.attributes);

        let mut children = Vec::with_capacity(element.children.len());
        for (index, child) in element.children.iter().enumerate() {
            let mounted = self.mount(child, ancestor, context, pass)?;
            if let Some(child_node) = self.node_of(&mounted) {
                self.host.insert(node, child_node, index);
            }
            children.push(mounted);
        }

        update_ref(&element.tag, None, element.node_ref.as_ref(), node)?;
        Ok(Mounted::Element {
            node,
            element: element.clone(),
            children,
        })
    }

    fn mount_component(
        &mut self,
        def: &Rc<Component>,
        reference: &ComponentRef,
        ancestor: Option<InstanceId>,
        context: &Map,
        pass: &mut Pass,
    ) -> Result<Mounted, ReconcileError> {
        let mut data = InstanceData::new(reference.props.clone(), context.clone());
        if let Some(initial_state) = &def.hooks().initial_state {
            data.state = initial_state(&reference.props, context);
        }
        data.node_ref = reference.node_ref.clone();
        data.key = reference.key.clone();

        let id = self.registry.insert(def.clone(), ancestor, data);
        tracing::trace!(component = def.name(), ?id, "instance created");
        self.render_component(id, Mode::Mount, pass)?;

        Ok(Mounted::Component {
            id,
            component: def.clone(),
            key: reference.key.clone(),
        })
    }

    // ── Components ───────────────────────────────────────────────────

    /// Feed an existing instance new props from its parent's render.
    fn update_component(
        &mut self,
        id: InstanceId,
        reference: &ComponentRef,
        context: &Map,
        pass: &mut Pass,
    ) -> Result<(), ReconcileError> {
        let Some(instance) = self.registry.get(id) else {
            return Ok(());
        };

        // Dirty while receiving props so `set_state` merges into this render.
        instance.data.borrow_mut().dirty = true;
        if let Some(hook) = &instance.def.hooks().will_receive_props {
            if let Err(err) = hook(&self.handle(id), &reference.props, context) {
                instance.data.borrow_mut().dirty = false;
                return boundary::propagate(&self.registry, Some(id), err.raised_in(instance.name()));
            }
        }

        let (ref_changed, old_ref) = {
            let mut data = instance.data.borrow_mut();
            let old_props = std::mem::replace(&mut data.props, reference.props.clone());
            if data.prev_props.is_none() {
                data.prev_props = Some(old_props);
            }
            let old_context = std::mem::replace(&mut data.context, context.clone());
            if data.prev_context.is_none() {
                data.prev_context = Some(old_context);
            }
            if same_ref(data.node_ref.as_ref(), reference.node_ref.as_ref()) {
                (false, None)
            } else {
                (true, std::mem::replace(&mut data.node_ref, reference.node_ref.clone()))
            }
        };
        if let Some(NodeRef::Callback(old_ref)) = old_ref {
            old_ref.call(None);
        }

        let before = self.instance_node(id);
        self.render_component(id, Mode::Props, pass)?;
        let after = self.instance_node(id);

        // A changed root node already re-ran the ref during the render.
        if ref_changed && before == after {
            if let Some(node) = after {
                update_ref(instance.name(), None, reference.node_ref.as_ref(), node)?;
            }
        }
        Ok(())
    }

    fn instance_node(&self, id: InstanceId) -> Option<NodeId> {
        let instance = self.registry.get(id)?;
        let data = instance.data();
        data.rendered.as_ref()?.node(&self.registry)
    }

    /// Render one instance, routing its own failures to the boundary chain.
    fn render_component(&mut self, id: InstanceId, mode: Mode, pass: &mut Pass) -> Result<(), ReconcileError> {
        let Some(instance) = self.registry.get(id) else {
            return Ok(());
        };
        if mode != Mode::Mount && !instance.data().phase.is_live() {
            return Ok(());
        }

        match self.try_render_component(&instance, id, mode, pass) {
            Ok(()) => Ok(()),
            Err(Failure::Fatal(err)) => Err(err),
            Err(Failure::Component(err)) => {
                let err = err.raised_in(instance.name());
                tracing::debug!(component = instance.name(), %err, "component failed");
                self.recover(&instance, id, mode)?;
                boundary::propagate(&self.registry, Some(id), err)
            }
        }
    }

    /// Leave a failed instance in a consistent, mounted state: an instance
    /// that never rendered gets the empty placeholder.
    fn recover(&mut self, instance: &Rc<Instance>, id: InstanceId, mode: Mode) -> Result<(), ReconcileError> {
        let needs_placeholder = instance.data().rendered.is_none();
        if needs_placeholder {
            let mut pass = Pass::default();
            let placeholder = self.mount(&VNode::empty(), Some(id), &Map::new(), &mut pass)?;
            instance.data.borrow_mut().rendered = Some(placeholder);
        }
        {
            let mut data = instance.data.borrow_mut();
            data.dirty = false;
            data.prev_props = None;
            data.prev_state = None;
            data.prev_context = None;
            data.phase = Phase::Mounted;
        }
        if mode == Mode::Mount {
            self.lifecycle.on_mount(id, instance.name());
        }
        Ok(())
    }

    fn try_render_component(
        &mut self,
        instance: &Rc<Instance>,
        id: InstanceId,
        mode: Mode,
        pass: &mut Pass,
    ) -> Result<(), Failure> {
        let def = instance.def.clone();
        let hooks = def.hooks();
        let handle = self.handle(id);

        let (was_caught, props, state, context, prev_props, prev_state, prev_context) = {
            let data = instance.data();
            (
                data.caught,
                data.props.clone(),
                data.state.clone(),
                data.context.clone(),
                data.prev_props.clone().unwrap_or_else(|| data.props.clone()),
                data.prev_state.clone().unwrap_or_else(|| data.state.clone()),
                data.prev_context.clone().unwrap_or_else(|| data.context.clone()),
            )
        };

        let mut skip = false;
        if mode == Mode::Mount {
            instance.data.borrow_mut().enter(Phase::Mounting);
            if let Some(hook) = &hooks.will_mount {
                hook(&handle)?;
            }
        } else if hooks.should_update.is_some() || hooks.will_update.is_some() {
            // The hooks see the previous values through the handle and the
            // pending ones as arguments.
            swap_values(instance, &prev_props, &prev_state, &prev_context);
            let decision = (|| -> Result<bool, ComponentError> {
                if mode != Mode::Force {
                    if let Some(should_update) = &hooks.should_update {
                        if !should_update(&handle, &props, &state, &context)? {
                            return Ok(false);
                        }
                    }
                }
                if let Some(will_update) = &hooks.will_update {
                    will_update(&handle, &props, &state, &context)?;
                }
                Ok(true)
            })();
            let discarded = instance.data().state != prev_state;
            swap_values(instance, &props, &state, &context);
            if discarded {
                tracing::warn!(component = def.name(), "set_state during should_update/will_update ignored");
            }
            skip = !decision?;
        }

        // Commit the bookkeeping, rendered or not.
        let state = instance.data().state.clone();
        {
            let mut data = instance.data.borrow_mut();
            data.prev_props = None;
            data.prev_state = None;
            data.prev_context = None;
            data.dirty = false;
        }

        if skip {
            tracing::trace!(component = def.name(), "update skipped");
            for callback in handle.take_callbacks() {
                callback();
            }
            return Ok(());
        }

        if mode != Mode::Mount {
            instance.data.borrow_mut().enter(Phase::Updating);
        }

        let (rendered, child_context) = {
            let scope = Scope {
                props: &props,
                state: &state,
                context: &context,
                this: &handle,
            };
            let rendered = def.render(&scope)?;
            let child_context = match &hooks.child_context {
                Some(child_context) => context.merge(&child_context(&scope)),
                None => context.clone(),
            };
            (rendered, child_context)
        };
        let vnode = rendered.unwrap_or_else(VNode::empty);

        // An update flushes the mounts it causes before its own "after update".
        let mut nested = Pass::default();
        let subtree_pass = if mode == Mode::Mount { &mut *pass } else { &mut nested };
        let prev_rendered = instance.data.borrow_mut().rendered.take();
        let prev_node = prev_rendered.as_ref().and_then(|m| self.node_of(m));
        let next = self.diff(prev_rendered, Some(&vnode), Some(id), &child_context, subtree_pass)?;
        let node = next.as_ref().and_then(|m| self.node_of(m));
        {
            let mut data = instance.data.borrow_mut();
            data.rendered = next;
            // The fallback is on screen: the boundary can catch again.
            if was_caught {
                data.caught = false;
            }
        }

        let node_ref = instance.data().node_ref.clone();
        if mode == Mode::Mount {
            if let Some(node) = node {
                update_ref(def.name(), None, node_ref.as_ref(), node)?;
            }
            pass.mounts.push(id);
            return Ok(());
        }

        self.flush_mounts(nested)?;
        instance.data.borrow_mut().enter(Phase::Mounted);
        self.lifecycle.on_update(id, def.name());
        if node != prev_node {
            if let Some(node) = node {
                update_ref(def.name(), None, node_ref.as_ref(), node)?;
            }
        }
        if let Some(did_update) = &hooks.did_update {
            did_update(&handle, &prev_props, &prev_state, &prev_context)?;
        }
        for callback in handle.take_callbacks() {
            callback();
        }
        Ok(())
    }

    // ── Teardown ─────────────────────────────────────────────────────

    /// Tear `prev` down and remove its topmost host node.
    pub(super) fn remove(&mut self, prev: Mounted) -> Result<(), ReconcileError> {
        let node = self.node_of(&prev);
        let mut first_error = None;
        self.teardown(prev, &mut first_error);
        if let Some(node) = node {
            tracing::trace!(?node, "remove");
            self.host.remove(node);
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Top-down teardown. Keeps going past failures and reports the first.
    fn teardown(&mut self, mounted: Mounted, first_error: &mut Option<ReconcileError>) {
        match mounted {
            Mounted::Text { .. } => {}
            Mounted::Element {
                element, children, ..
            } => {
                if let Some(NodeRef::Callback(node_ref)) = &element.node_ref {
                    node_ref.call(None);
                }
                for child in children {
                    self.teardown(child, first_error);
                }
            }
            Mounted::Component { id, .. } => self.teardown_component(id, first_error),
        }
    }

    fn teardown_component(&mut self, id: InstanceId, first_error: &mut Option<ReconcileError>) {
        let Some(instance) = self.registry.get(id) else {
            return;
        };
        instance.data.borrow_mut().enter(Phase::Unmounting);

        if let Some(hook) = &instance.def.hooks().will_unmount {
            if let Err(err) = hook(&self.handle(id)) {
                tracing::warn!(component = instance.name(), %err, "will_unmount failed");
                if let Err(escaped) =
                    boundary::propagate(&self.registry, instance.ancestor, err.raised_in(instance.name()))
                {
                    first_error.get_or_insert(escaped);
                }
            }
        }

        let (rendered, node_ref) = {
            let mut data = instance.data.borrow_mut();
            data.callbacks.clear();
            data.dirty = false;
            (data.rendered.take(), data.node_ref.take())
        };
        if let Some(NodeRef::Callback(node_ref)) = node_ref {
            node_ref.call(None);
        }
        if let Some(rendered) = rendered {
            self.teardown(rendered, first_error);
        }

        instance.data.borrow_mut().enter(Phase::Unmounted);
        self.lifecycle.on_unmount(id, instance.name());
        self.registry.remove(id);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn swap_values(instance: &Instance, props: &Props, state: &Map, context: &Map) {
    let mut data = instance.data.borrow_mut();
    data.props = props.clone();
    data.state = state.clone();
    data.context = context.clone();
}

fn same_ref(prev: Option<&NodeRef>, next: Option<&NodeRef>) -> bool {
    match (prev, next) {
        (None, None) => true,
        (Some(NodeRef::Callback(a)), Some(NodeRef::Callback(b))) => a.ptr_eq(b),
        _ => false,
    }
}

/// Run the ref transition from `prev` to `next` for `node`.
///
/// Unchanged refs are not called. A malformed `next` ref is fatal.
fn update_ref(owner: &str, prev: Option<&NodeRef>, next: Option<&NodeRef>, node: NodeId) -> Result<(), ReconcileError> {
    if same_ref(prev, next) {
        return Ok(());
    }
    if let Some(NodeRef::Callback(prev)) = prev {
        prev.call(None);
    }
    match next {
        None => Ok(()),
        Some(NodeRef::Callback(next)) => {
            next.call(Some(node));
            Ok(())
        }
        Some(NodeRef::Malformed(found)) => Err(ReconcileError::MalformedRef {
            tag: owner.to_owned(),
            found,
        }),
    }
}
