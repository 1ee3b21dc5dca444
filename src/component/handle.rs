//! `ComponentHandle`: the "this" a component's hooks and listeners act through.

use std::fmt;
use std::rc::{Rc, Weak};

use super::definition::ComponentError;
use super::instance::{Instance, InstanceId, Registry};
use super::lifecycle::Phase;
use crate::reconcile::{boundary, ReconcileError};
use crate::scheduler;
use crate::value::Map;
use crate::vnode::Props;

// ---------------------------------------------------------------------------
// StateUpdate
// ---------------------------------------------------------------------------

type UpdateFn = dyn FnOnce(&Map, &Props) -> Map;

/// Argument to [`ComponentHandle::set_state`].
pub enum StateUpdate {
    /// Entries merged shallowly over the current state.
    Partial(Map),
    /// Computes the partial state from `(previous_state, current_props)`.
    With(Box<UpdateFn>),
}

impl StateUpdate {
    pub fn with(f: impl FnOnce(&Map, &Props) -> Map + 'static) -> Self {
        StateUpdate::With(Box::new(f))
    }
}

impl From<Map> for StateUpdate {
    fn from(partial: Map) -> Self {
        StateUpdate::Partial(partial)
    }
}

impl fmt::Debug for StateUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateUpdate::Partial(map) => f.debug_tuple("Partial").field(map).finish(),
            StateUpdate::With(_) => f.write_str("With(..)"),
        }
    }
}

// ---------------------------------------------------------------------------
// ComponentHandle
// ---------------------------------------------------------------------------

/// Non-owning reference to a component instance.
///
/// Handles are cheap to clone and may be captured by listeners. Once the
/// instance is torn down every operation is a no-op.
#[derive(Clone)]
pub struct ComponentHandle {
    id: InstanceId,
    registry: Weak<Registry>,
}

impl ComponentHandle {
    pub(crate) fn new(id: InstanceId, registry: &Rc<Registry>) -> Self {
        Self {
            id,
            registry: Rc::downgrade(registry),
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    fn registry(&self) -> Option<Rc<Registry>> {
        self.registry.upgrade()
    }

    fn instance(&self) -> Option<Rc<Instance>> {
        self.registry()?.get(self.id)
    }

    /// Whether both handles address the same instance.
    pub fn same_instance(&self, other: &ComponentHandle) -> bool {
        self.id == other.id && Weak::ptr_eq(&self.registry, &other.registry)
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn props(&self) -> Props {
        self.instance()
            .map(|i| i.data().props.clone())
            .unwrap_or_default()
    }

    pub fn state(&self) -> Map {
        self.instance()
            .map(|i| i.data().state.clone())
            .unwrap_or_default()
    }

    pub fn context(&self) -> Map {
        self.instance()
            .map(|i| i.data().context.clone())
            .unwrap_or_default()
    }

    pub fn phase(&self) -> Phase {
        self.instance()
            .map(|i| i.data().phase)
            .unwrap_or(Phase::Unmounted)
    }

    pub fn is_mounted(&self) -> bool {
        self.phase().is_live()
    }

    /// Whether this instance is handling a descendant failure.
    pub fn is_caught(&self) -> bool {
        self.instance().is_some_and(|i| i.data().caught)
    }

    /// Re-arm this boundary without waiting for its next render.
    pub fn clear_caught(&self) {
        if let Some(instance) = self.instance() {
            instance.data.borrow_mut().caught = false;
        }
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.instance().is_some_and(|i| i.data().dirty)
    }

    pub(crate) fn reset_dirty(&self) {
        if let Some(instance) = self.instance() {
            instance.data.borrow_mut().dirty = false;
        }
    }

    // ── Updates ──────────────────────────────────────────────────────

    /// Merge a partial state and schedule a re-render.
    ///
    /// Updates issued before the render starts are merged into the same
    /// pass. Inside "before mount" or "receiving new props" the merge lands
    /// in the render that is about to happen.
    pub fn set_state(&self, update: impl Into<StateUpdate>) {
        self.apply_state(update.into(), None);
    }

    /// Like [`set_state`](Self::set_state), running `callback` after the next
    /// completed render of this instance.
    pub fn set_state_then(&self, update: impl Into<StateUpdate>, callback: impl FnOnce() + 'static) {
        self.apply_state(update.into(), Some(Box::new(callback)));
    }

    fn apply_state(&self, update: StateUpdate, callback: Option<Box<dyn FnOnce()>>) {
        let Some(instance) = self.instance() else {
            tracing::warn!(instance = ?self.id, "set_state on an unmounted component ignored");
            return;
        };

        // User code runs without any borrow held.
        let partial = match update {
            StateUpdate::Partial(partial) => partial,
            StateUpdate::With(f) => {
                let (state, props) = {
                    let data = instance.data();
                    (data.state.clone(), data.props.clone())
                };
                f(&state, &props)
            }
        };

        let enqueue = {
            let mut data = instance.data.borrow_mut();
            if data.prev_state.is_none() {
                data.prev_state = Some(data.state.clone());
            }
            data.state = data.state.merge(&partial);
            if let Some(callback) = callback {
                data.callbacks.push(callback);
            }
            !std::mem::replace(&mut data.dirty, true)
        };

        if enqueue {
            scheduler::enqueue(self.clone());
        }
    }

    /// Re-render now, skipping the queue and the "should update?" hook.
    ///
    /// Called while the renderer is mid-pass, the update runs when that pass
    /// finishes.
    pub fn force_update(&self) -> Result<(), ReconcileError> {
        self.force(None)
    }

    /// Like [`force_update`](Self::force_update), running `callback` after the
    /// render.
    pub fn force_update_then(&self, callback: impl FnOnce() + 'static) -> Result<(), ReconcileError> {
        self.force(Some(Box::new(callback)))
    }

    fn force(&self, callback: Option<Box<dyn FnOnce()>>) -> Result<(), ReconcileError> {
        let Some(registry) = self.registry() else {
            return Ok(());
        };
        let Some(instance) = registry.get(self.id) else {
            return Ok(());
        };
        if let Some(callback) = callback {
            instance.data.borrow_mut().callbacks.push(callback);
        }
        let Some(renderer) = registry.renderer() else {
            return Ok(());
        };
        if renderer.is_busy() {
            tracing::debug!(component = instance.name(), "force update deferred to end of pass");
            registry.defer_force(self.id);
            return Ok(());
        }
        renderer.rerender(self.id, true)?;
        scheduler::resume()
    }

    /// Render a queued update (drain path).
    pub(crate) fn rerender(&self) -> Result<(), ReconcileError> {
        let Some(renderer) = self.registry().and_then(|r| r.renderer()) else {
            return Ok(());
        };
        renderer.rerender(self.id, false)
    }

    /// Hand an error to the nearest ancestor boundary.
    pub fn raise_error(&self, error: impl Into<ComponentError>) -> Result<(), ReconcileError> {
        let Some(registry) = self.registry() else {
            return Ok(());
        };
        let Some(instance) = registry.get(self.id) else {
            return Ok(());
        };
        let error = error.into().raised_in(instance.name());
        boundary::propagate(&registry, instance.ancestor, error)
    }

    /// Drain this instance's post-render callbacks.
    pub(crate) fn take_callbacks(&self) -> Vec<Box<dyn FnOnce()>> {
        self.instance()
            .map(|i| std::mem::take(&mut i.data.borrow_mut().callbacks))
            .unwrap_or_default()
    }
}

impl PartialEq for ComponentHandle {
    fn eq(&self, other: &Self) -> bool {
        self.same_instance(other)
    }
}

impl fmt::Debug for ComponentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentHandle").field("id", &self.id).finish()
    }
}
