//! Component lifecycle: the per-instance phase machine and the event log.
//!
//! Every instance walks `Unmounted -> Mounting -> Mounted -> Updating* ->
//! Unmounting -> Unmounted`. The `LifecycleTracker` records which instances
//! are currently mounted and accumulates lifecycle events (`Mount`, `Update`,
//! `Unmount`) that can be drained by the host or by tests.

use std::collections::HashSet;

use super::instance::InstanceId;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Where an instance is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Unmounted,
    /// Created; "before mount" and the first render are running.
    Mounting,
    Mounted,
    /// A re-render is running.
    Updating,
    /// Teardown has started.
    Unmounting,
}

impl Phase {
    /// Whether the machine allows moving from `self` to `next`.
    pub fn can_transition(self, next: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, next),
            (Unmounted, Mounting)
                | (Mounting, Mounted)
                | (Mounted, Updating)
                | (Updating, Mounted)
                | (Mounting, Unmounting)
                | (Mounted, Unmounting)
                | (Updating, Unmounting)
                | (Unmounting, Unmounted)
        )
    }

    /// Whether the instance has output attached (mounted or re-rendering).
    pub fn is_live(self) -> bool {
        matches!(self, Phase::Mounted | Phase::Updating)
    }
}

// ---------------------------------------------------------------------------
// LifecycleEvent
// ---------------------------------------------------------------------------

/// Events emitted as instances move through their lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// An instance finished its first render and is attached.
    Mount { instance: InstanceId, component: String },
    /// A mounted instance re-rendered.
    Update { instance: InstanceId, component: String },
    /// An instance was torn down.
    Unmount { instance: InstanceId, component: String },
}

impl LifecycleEvent {
    pub fn instance(&self) -> InstanceId {
        match self {
            LifecycleEvent::Mount { instance, .. }
            | LifecycleEvent::Update { instance, .. }
            | LifecycleEvent::Unmount { instance, .. } => *instance,
        }
    }

    pub fn component(&self) -> &str {
        match self {
            LifecycleEvent::Mount { component, .. }
            | LifecycleEvent::Update { component, .. }
            | LifecycleEvent::Unmount { component, .. } => component,
        }
    }
}

// ---------------------------------------------------------------------------
// LifecycleTracker
// ---------------------------------------------------------------------------

/// Tracks which instances are mounted and accumulates lifecycle events.
#[derive(Debug, Default)]
pub struct LifecycleTracker {
    mounted: HashSet<InstanceId>,
    pending: Vec<LifecycleEvent>,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a mount. Mounting twice is a no-op.
    pub fn on_mount(&mut self, instance: InstanceId, component: &str) {
        if self.mounted.insert(instance) {
            tracing::trace!(?instance, component, "mounted");
            self.pending.push(LifecycleEvent::Mount {
                instance,
                component: component.to_owned(),
            });
        }
    }

    /// Record a teardown. Ignored for instances that never mounted.
    pub fn on_unmount(&mut self, instance: InstanceId, component: &str) {
        if self.mounted.remove(&instance) {
            tracing::trace!(?instance, component, "unmounted");
            self.pending.push(LifecycleEvent::Unmount {
                instance,
                component: component.to_owned(),
            });
        }
    }

    /// Record a re-render. Ignored for instances that are not mounted.
    pub fn on_update(&mut self, instance: InstanceId, component: &str) {
        if self.mounted.contains(&instance) {
            tracing::trace!(?instance, component, "updated");
            self.pending.push(LifecycleEvent::Update {
                instance,
                component: component.to_owned(),
            });
        }
    }

    /// Drain all pending events.
    pub fn pending_events(&mut self) -> Vec<LifecycleEvent> {
        std::mem::take(&mut self.pending)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
