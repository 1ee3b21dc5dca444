//! Component instances and the registry that owns them.
//!
//! An instance is addressed by an [`InstanceId`] into the [`Registry`]. The
//! ancestor link is an id too, so parents and children never hold strong
//! references to each other. The registry is shared between the engine and
//! every [`ComponentHandle`](super::ComponentHandle) as an `Rc`; handles keep
//! only a `Weak`.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use slotmap::SlotMap;

use super::definition::Component;
use super::lifecycle::Phase;
use crate::reconcile::mounted::Mounted;
use crate::reconcile::ReconcileError;
use crate::value::Map;
use crate::vnode::{Key, NodeRef, Props};

slotmap::new_key_type! {
    /// Identifies a component instance in the [`Registry`].
    pub struct InstanceId;
}

// ---------------------------------------------------------------------------
// Instance
// ---------------------------------------------------------------------------

/// Mutable bookkeeping of one instance.
pub(crate) struct InstanceData {
    pub props: Props,
    pub state: Map,
    pub context: Map,
    /// Values in effect at the last completed render, kept until the next one
    /// finishes.
    pub prev_props: Option<Props>,
    pub prev_state: Option<Map>,
    pub prev_context: Option<Map>,
    /// Queued for (or in the middle of) a render that has not started yet.
    pub dirty: bool,
    /// Currently handling a descendant failure.
    pub caught: bool,
    pub phase: Phase,
    /// Post-render callbacks in enqueue order.
    pub callbacks: Vec<Box<dyn FnOnce()>>,
    /// Output of the last render.
    pub rendered: Option<Mounted>,
    pub node_ref: Option<NodeRef>,
    pub key: Option<Key>,
}

impl InstanceData {
    pub fn new(props: Props, context: Map) -> Self {
        Self {
            props,
            state: Map::new(),
            context,
            prev_props: None,
            prev_state: None,
            prev_context: None,
            dirty: true,
            caught: false,
            phase: Phase::Unmounted,
            callbacks: Vec::new(),
            rendered: None,
            node_ref: None,
            key: None,
        }
    }

    /// Move to `next`, logging transitions the phase machine does not allow.
    pub fn enter(&mut self, next: Phase) {
        if !self.phase.can_transition(next) {
            tracing::warn!(from = ?self.phase, to = ?next, "unexpected lifecycle transition");
        }
        self.phase = next;
    }
}

pub(crate) struct Instance {
    pub def: Rc<Component>,
    pub ancestor: Option<InstanceId>,
    pub data: RefCell<InstanceData>,
}

impl Instance {
    pub fn name(&self) -> &str {
        self.def.name()
    }

    pub fn data(&self) -> Ref<'_, InstanceData> {
        self.data.borrow()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data.borrow();
        f.debug_struct("Instance")
            .field("component", &self.def.name())
            .field("ancestor", &self.ancestor)
            .field("phase", &data.phase)
            .field("dirty", &data.dirty)
            .field("caught", &data.caught)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Rerender
// ---------------------------------------------------------------------------

/// Capability to re-render one instance, implemented by the engine.
pub(crate) trait Rerender {
    /// Render the instance now. `force` bypasses the "should update?" hook.
    fn rerender(&self, id: InstanceId, force: bool) -> Result<(), ReconcileError>;

    /// Whether a pass is already running on this engine.
    fn is_busy(&self) -> bool;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Owns every live instance of one renderer.
pub(crate) struct Registry {
    instances: RefCell<SlotMap<InstanceId, Rc<Instance>>>,
    /// Force updates requested while the engine was busy.
    forced: RefCell<Vec<InstanceId>>,
    renderer: RefCell<Option<Weak<dyn Rerender>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            instances: RefCell::new(SlotMap::with_key()),
            forced: RefCell::new(Vec::new()),
            renderer: RefCell::new(None),
        }
    }

    pub fn insert(
        &self,
        def: Rc<Component>,
        ancestor: Option<InstanceId>,
        data: InstanceData,
    ) -> InstanceId {
        self.instances.borrow_mut().insert(Rc::new(Instance {
            def,
            ancestor,
            data: RefCell::new(data),
        }))
    }

    /// The instance behind `id`, if it is still alive.
    pub fn get(&self, id: InstanceId) -> Option<Rc<Instance>> {
        self.instances.borrow().get(id).cloned()
    }

    pub fn remove(&self, id: InstanceId) -> Option<Rc<Instance>> {
        self.instances.borrow_mut().remove(id)
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.instances.borrow().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.instances.borrow().len()
    }

    pub fn attach(&self, renderer: Weak<dyn Rerender>) {
        *self.renderer.borrow_mut() = Some(renderer);
    }

    pub fn renderer(&self) -> Option<Rc<dyn Rerender>> {
        self.renderer.borrow().as_ref().and_then(Weak::upgrade)
    }

    /// Park a force update until the running pass finishes.
    pub fn defer_force(&self, id: InstanceId) {
        let mut forced = self.forced.borrow_mut();
        if !forced.contains(&id) {
            forced.push(id);
        }
    }

    pub fn take_forced(&self) -> Vec<InstanceId> {
        std::mem::take(&mut *self.forced.borrow_mut())
    }
}
