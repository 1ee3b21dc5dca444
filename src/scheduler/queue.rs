//! The render queue: a thread-local, deduplicated FIFO of dirty instances.
//!
//! `set_state` enqueues; a drain renders each queued instance once, in the
//! order it was first enqueued. Instances enqueued while a drain is running
//! are appended and handled by that same drain, up to a pass bound.

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::component::ComponentHandle;
use crate::config::{Config, Debounce, DEFAULT_MAX_DRAIN_PASSES};
use crate::reconcile::ReconcileError;

// ---------------------------------------------------------------------------
// Queue state
// ---------------------------------------------------------------------------

struct RenderQueue {
    items: VecDeque<ComponentHandle>,
    /// A drain is running; prevents re-entrant double drains.
    draining: bool,
    /// A drain stopped because the target renderer was mid-pass.
    stalled: bool,
    debounce: Debounce,
    max_passes: usize,
}

impl RenderQueue {
    fn new() -> Self {
        Self {
            items: VecDeque::new(),
            draining: false,
            stalled: false,
            debounce: Debounce::Manual,
            max_passes: DEFAULT_MAX_DRAIN_PASSES,
        }
    }
}

thread_local! {
    static QUEUE: RefCell<RenderQueue> = RefCell::new(RenderQueue::new());
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Apply the queue settings of `config`.
pub fn configure(config: &Config) {
    QUEUE.with(|q| {
        let mut q = q.borrow_mut();
        q.debounce = config.debounce.clone();
        q.max_passes = config.max_drain_passes.max(1);
    });
}

/// Restore the pristine state: empty, not draining, default settings.
///
/// Handles still queued are dropped without rendering.
pub fn reset() {
    QUEUE.with(|q| *q.borrow_mut() = RenderQueue::new());
}

/// Number of instances waiting for a drain.
pub fn pending() -> usize {
    QUEUE.with(|q| q.borrow().items.len())
}

/// Whether a drain is running.
pub fn is_draining() -> bool {
    QUEUE.with(|q| q.borrow().draining)
}

// ---------------------------------------------------------------------------
// Enqueue
// ---------------------------------------------------------------------------

/// Queue an instance for re-rendering.
///
/// The first enqueue of a cycle schedules a drain through the configured
/// [`Debounce`]. Queuing an instance that is already waiting is a no-op.
pub(crate) fn enqueue(handle: ComponentHandle) {
    let schedule = QUEUE.with(|q| {
        let mut q = q.borrow_mut();
        if q.items.iter().any(|queued| queued.same_instance(&handle)) {
            return None;
        }
        q.items.push_back(handle);
        (q.items.len() == 1 && !q.draining).then(|| q.debounce.clone())
    });
    if let Some(debounce) = schedule {
        schedule_drain(debounce);
    }
}

fn schedule_drain(debounce: Debounce) {
    match debounce {
        Debounce::Manual => {}
        Debounce::Tokio => {
            if tokio::runtime::Handle::try_current().is_err() {
                tracing::warn!("no tokio runtime on this thread, queue waits for flush()");
                return;
            }
            tokio::task::spawn_local(async {
                tokio::task::yield_now().await;
                deferred_flush();
            });
        }
        Debounce::Custom(defer) => defer(Box::new(deferred_flush)),
    }
}

/// Drain entry point for deferred strategies, which have no caller to hand
/// an error to.
fn deferred_flush() {
    if let Err(err) = flush() {
        tracing::warn!(%err, "deferred render drain failed");
    }
}

// ---------------------------------------------------------------------------
// Drain
// ---------------------------------------------------------------------------

/// Drain the queue now.
///
/// Called while a drain is already running this returns immediately; the
/// running drain picks up anything appended.
pub fn flush() -> Result<(), ReconcileError> {
    let started = QUEUE.with(|q| {
        let mut q = q.borrow_mut();
        if q.draining {
            return None;
        }
        q.draining = true;
        Some((q.max_passes, q.debounce.clone()))
    });
    let Some((max_passes, debounce)) = started else {
        return Ok(());
    };

    let result = {
        let _span = tracing::debug_span!("drain").entered();
        drain(max_passes)
    };

    let leftover = QUEUE.with(|q| {
        let mut q = q.borrow_mut();
        q.draining = false;
        q.items.len()
    });
    // A failed drain leaves later items queued; give them a new cycle.
    if result.is_err() && leftover > 0 {
        schedule_drain(debounce);
    }
    result
}

/// Run `f`, then drain everything it enqueued.
///
/// ```ignore
/// scheduler::batch(|| {
///     counter.set_state(Map::new().with("n", 1));
///     label.set_state(Map::new().with("text", "one"));
/// })?;
/// ```
pub fn batch<R>(f: impl FnOnce() -> R) -> Result<R, ReconcileError> {
    let value = f();
    flush()?;
    Ok(value)
}

/// Restart a drain that stalled on a busy renderer.
pub(crate) fn resume() -> Result<(), ReconcileError> {
    let stalled = QUEUE.with(|q| {
        let mut q = q.borrow_mut();
        !q.draining && std::mem::take(&mut q.stalled)
    });
    if stalled {
        tracing::debug!("resuming stalled drain");
        flush()
    } else {
        Ok(())
    }
}

fn pop() -> Option<ComponentHandle> {
    QUEUE.with(|q| q.borrow_mut().items.pop_front())
}

fn drain(max_passes: usize) -> Result<(), ReconcileError> {
    let mut passes = 0usize;
    tracing::debug!(pending = pending(), "drain started");

    while let Some(handle) = pop() {
        // Already rendered through its parent since it was queued.
        if !handle.is_dirty() {
            continue;
        }
        passes += 1;
        if passes > max_passes {
            abort(&handle);
            tracing::warn!(limit = max_passes, "render drain aborted");
            return Err(ReconcileError::RunawayUpdates { limit: max_passes });
        }
        match handle.rerender() {
            Ok(()) => {}
            Err(ReconcileError::EngineBusy) => {
                QUEUE.with(|q| {
                    let mut q = q.borrow_mut();
                    q.items.push_front(handle);
                    q.stalled = true;
                });
                tracing::debug!("renderer busy, drain stalled");
                return Ok(());
            }
            Err(err) => return Err(err),
        }
    }

    tracing::debug!(passes, "drain finished");
    Ok(())
}

/// Drop everything queued and clear the dirty flags so later updates can
/// enqueue again.
fn abort(current: &ComponentHandle) {
    current.reset_dirty();
    let dropped: Vec<ComponentHandle> = QUEUE.with(|q| q.borrow_mut().items.drain(..).collect());
    for handle in dropped {
        handle.reset_dirty();
    }
}

// ===========================================================================
// Tests
// ===========================================================================
