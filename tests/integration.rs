//! Integration tests for gilt-vdom.
//!
//! These tests exercise the public API from outside the crate: components
//! rendered into the reference `Dom` host, driven through the render queue
//! and inspected through the mutation log, lifecycle events, and markup.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gilt_vdom::component::LifecycleEvent;
use gilt_vdom::scheduler;
use gilt_vdom::testing::{to_markup, to_pretty_markup};
use gilt_vdom::vnode::debug::{self, Diagnostic};
use gilt_vdom::{
    h, text, Attrs, Component, ComponentHandle, Config, Debounce, Dom, Event, Map, NodeId,
    ReconcileError, Renderer, StateUpdate, VNode,
};
use pretty_assertions::assert_eq;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn setup() -> (Renderer<Dom>, NodeId) {
    setup_with(Config::default())
}

fn setup_with(config: Config) -> (Renderer<Dom>, NodeId) {
    scheduler::reset();
    let mut dom = Dom::new();
    let container = dom.container("root");
    (Renderer::with_config(dom, config), container)
}

fn markup(renderer: &Renderer<Dom>, container: NodeId) -> String {
    to_markup(&renderer.host(), container)
}

/// Collects handles of mounted instances, in mount order.
type Handles = Rc<RefCell<Vec<ComponentHandle>>>;

/// `<li>{label}</li>`, remembering its handle and its label at mount.
fn item(handles: &Handles) -> Rc<Component> {
    let handles = handles.clone();
    Component::new("Item", |scope| {
        let label = scope.props.get("label").map(|v| v.to_string()).unwrap_or_default();
        Ok(Some(h("li", Attrs::new(), [label])))
    })
    .initial_state(|props, _| {
        Map::new().with(
            "mounted_as",
            props.get("label").map(|v| v.to_string()).unwrap_or_default(),
        )
    })
    .did_mount(move |this| {
        handles.borrow_mut().push(this.clone());
        Ok(())
    })
    .build()
}

fn list_of(item: &Rc<Component>, labels: &[&str], keyed: bool) -> VNode {
    let children: Vec<VNode> = labels
        .iter()
        .map(|label| {
            let attrs = Attrs::new().with("label", *label);
            let attrs = if keyed { attrs.key(*label) } else { attrs };
            h(item, attrs, None::<VNode>)
        })
        .collect();
    h("ul", Attrs::new(), [children])
}

// ---------------------------------------------------------------------------
// Idempotence
// ---------------------------------------------------------------------------

#[test]
fn test_rerender_of_same_tree_is_silent() {
    let (renderer, container) = setup();
    let handles: Handles = Rc::default();
    let item = item(&handles);
    let tree = h(
        "section",
        Attrs::new().with("id", "main").on("click", |_| {}),
        [list_of(&item, &["a", "b"], true), text("footer")],
    );

    let root = renderer.render(&tree, container, None).unwrap();
    renderer.host_mut().take_mutations();

    renderer.render(&tree, container, Some(root)).unwrap();
    assert!(renderer.host().mutations().is_empty());
}

// ---------------------------------------------------------------------------
// Key stability
// ---------------------------------------------------------------------------

#[test]
fn test_keyed_reorder_reuses_nodes_and_instances() {
    let (renderer, container) = setup();
    let handles: Handles = Rc::default();
    let item = item(&handles);

    let root = renderer
        .render(&list_of(&item, &["A", "B", "C"], true), container, None)
        .unwrap();
    let nodes = renderer.host().children(root).to_vec();
    renderer.host_mut().take_mutations();
    renderer.take_lifecycle_events();

    renderer
        .render(&list_of(&item, &["C", "A", "B"], true), container, Some(root))
        .unwrap();

    let log = renderer.host_mut().take_mutations();
    assert_eq!(log.len(), 1);
    assert!(log[0].is_move());
    assert_eq!(renderer.host().children(root), &[nodes[2], nodes[0], nodes[1]]);

    // No instance was created or destroyed, and each kept its state.
    let events = renderer.take_lifecycle_events();
    assert!(events.iter().all(|e| matches!(e, LifecycleEvent::Update { .. })));
    assert_eq!(renderer.instance_count(), 3);
    for (handle, label) in handles.borrow().iter().zip(["A", "B", "C"]) {
        assert!(handle.is_mounted());
        assert_eq!(handle.state().get("mounted_as").and_then(|v| v.as_str()), Some(label));
        assert_eq!(handle.props().get("label").and_then(|v| v.as_str()), Some(label));
    }
}

// ---------------------------------------------------------------------------
// Unkeyed positional matching
// ---------------------------------------------------------------------------

#[test]
fn test_unkeyed_removal_of_first_child() {
    let (renderer, container) = setup();
    let handles: Handles = Rc::default();
    let item = item(&handles);

    let root = renderer
        .render(&list_of(&item, &["X", "Y", "Z"], false), container, None)
        .unwrap();
    renderer.take_lifecycle_events();
    let ids: Vec<_> = handles.borrow().iter().map(ComponentHandle::id).collect();

    renderer
        .render(&list_of(&item, &["Y", "Z"], false), container, Some(root))
        .unwrap();

    let events = renderer.take_lifecycle_events();
    assert_eq!(
        events,
        vec![
            LifecycleEvent::Update { instance: ids[0], component: "Item".into() },
            LifecycleEvent::Update { instance: ids[1], component: "Item".into() },
            LifecycleEvent::Unmount { instance: ids[2], component: "Item".into() },
        ]
    );
    assert_eq!(markup(&renderer, container), "<root><ul><li>Y</li><li>Z</li></ul></root>");
    // Positional reuse: the first instance now carries "Y" but was mounted as "X".
    let first = handles.borrow()[0].clone();
    assert_eq!(first.state().get("mounted_as").and_then(|v| v.as_str()), Some("X"));
}

// ---------------------------------------------------------------------------
// Batching
// ---------------------------------------------------------------------------

#[test]
fn test_synchronous_set_state_calls_collapse_into_one_render() {
    let (renderer, container) = setup();
    let renders = Rc::new(Cell::new(0));
    let handle: Rc<RefCell<Option<ComponentHandle>>> = Rc::default();

    let counter = {
        let renders = renders.clone();
        let handle = handle.clone();
        Component::new("Counter", move |scope| {
            renders.set(renders.get() + 1);
            let sum = ["a", "b", "c"]
                .iter()
                .filter_map(|k| scope.state.get(k).and_then(|v| v.as_int()))
                .sum::<i64>();
            Ok(Some(text(sum.to_string())))
        })
        .did_mount(move |this| {
            *handle.borrow_mut() = Some(this.clone());
            Ok(())
        })
        .build()
    };

    renderer
        .render(&h(&counter, Attrs::new(), None::<VNode>), container, None)
        .unwrap();
    assert_eq!(renders.get(), 1);

    let this = handle.borrow().clone().unwrap();
    let order = Rc::new(RefCell::new(Vec::new()));
    for (n, key) in ["a", "b"].iter().enumerate() {
        let order = order.clone();
        this.set_state_then(Map::new().with(*key, 1), move || order.borrow_mut().push(n));
    }
    {
        let order = order.clone();
        this.set_state_then(
            StateUpdate::with(|state, _| {
                let a = state.get("a").and_then(|v| v.as_int()).unwrap_or(0);
                let b = state.get("b").and_then(|v| v.as_int()).unwrap_or(0);
                Map::new().with("c", a + b)
            }),
            move || order.borrow_mut().push(2),
        );
    }

    assert_eq!(scheduler::pending(), 1);
    assert_eq!(renders.get(), 1, "set_state must not render synchronously");

    renderer.flush().unwrap();
    assert_eq!(renders.get(), 2);
    assert_eq!(*order.borrow(), vec![0, 1, 2]);
    assert_eq!(markup(&renderer, container), "<root>4</root>");
}

#[test]
fn test_batch_drains_what_it_enqueued() {
    let (renderer, container) = setup();
    let handles: Handles = Rc::default();
    let label = {
        let handles = handles.clone();
        Component::new("Label", |scope| {
            let value = scope.state.get("value").map(|v| v.to_string()).unwrap_or_default();
            Ok(Some(h("span", Attrs::new(), [value])))
        })
        .did_mount(move |this| {
            handles.borrow_mut().push(this.clone());
            Ok(())
        })
        .build()
    };
    let tree = h(
        "div",
        Attrs::new(),
        [
            h(&label, Attrs::new(), None::<VNode>),
            h(&label, Attrs::new(), None::<VNode>),
        ],
    );
    renderer.render(&tree, container, None).unwrap();

    let handles = handles.borrow().clone();
    scheduler::batch(|| {
        handles[1].set_state(Map::new().with("value", "two"));
        handles[0].set_state(Map::new().with("value", "one"));
    })
    .unwrap();

    assert_eq!(scheduler::pending(), 0);
    assert_eq!(
        markup(&renderer, container),
        "<root><div><span>one</span><span>two</span></div></root>"
    );
}

// ---------------------------------------------------------------------------
// Error containment
// ---------------------------------------------------------------------------

struct BoundaryFixture {
    root: Rc<Component>,
    root_renders: Rc<Cell<usize>>,
    boundary: Rc<RefCell<Option<ComponentHandle>>>,
    caught: Rc<RefCell<Vec<String>>>,
}

fn boundary_fixture(leaf: Rc<Component>) -> BoundaryFixture {
    let caught = Rc::new(RefCell::new(Vec::new()));
    let boundary_handle: Rc<RefCell<Option<ComponentHandle>>> = Rc::default();

    let boundary = {
        let caught = caught.clone();
        let boundary_handle = boundary_handle.clone();
        Component::new("Boundary", move |scope| {
            if scope.state.get("failed").and_then(|v| v.as_bool()) == Some(true) {
                return Ok(Some(h("div", Attrs::new(), ["fallback"])));
            }
            Ok(Some(h("div", Attrs::new(), [h(&leaf, Attrs::new(), None::<VNode>)])))
        })
        .will_mount(move |this| {
            *boundary_handle.borrow_mut() = Some(this.clone());
            Ok(())
        })
        .did_catch(move |this, error| {
            caught.borrow_mut().push(error.to_string());
            this.set_state(Map::new().with("failed", true));
            Ok(())
        })
        .build()
    };

    let root_renders = Rc::new(Cell::new(0));
    let root = {
        let root_renders = root_renders.clone();
        Component::new("Root", move |_| {
            root_renders.set(root_renders.get() + 1);
            Ok(Some(h("main", Attrs::new(), [h(&boundary, Attrs::new(), None::<VNode>)])))
        })
        .build()
    };

    BoundaryFixture {
        root,
        root_renders,
        boundary: boundary_handle,
        caught,
    }
}

#[test]
fn test_render_error_is_contained_by_boundary() {
    let (renderer, container) = setup();
    let leaf = Component::new("Leaf", |_| Err("boom".into())).build();
    let fixture = boundary_fixture(leaf);

    renderer
        .render(&h(&fixture.root, Attrs::new(), None::<VNode>), container, None)
        .unwrap();

    let boundary = fixture.boundary.borrow().clone().unwrap();
    assert!(boundary.is_caught());
    assert_eq!(*fixture.caught.borrow(), vec!["boom".to_owned()]);
    // The failed leaf holds its position with an empty placeholder.
    assert_eq!(markup(&renderer, container), "<root><main><div></div></main></root>");

    renderer.flush().unwrap();
    assert_eq!(
        markup(&renderer, container),
        "<root><main><div>fallback</div></main></root>"
    );
    assert_eq!(fixture.root_renders.get(), 1);
    assert_eq!(renderer.instance_count(), 2);
}

#[test]
fn test_raise_error_from_event_handler() {
    let (renderer, container) = setup();
    let leaf = Component::new("Leaf", |scope| {
        let this = scope.this.clone();
        Ok(Some(h(
            "button",
            Attrs::new().with("id", "go").on("click", move |_| {
                // A boundary exists, so nothing escapes.
                let _ = this.raise_error("bad click");
            }),
            ["go"],
        )))
    })
    .build();
    let fixture = boundary_fixture(leaf);

    renderer
        .render(&h(&fixture.root, Attrs::new(), None::<VNode>), container, None)
        .unwrap();
    let button = {
        let host = renderer.host();
        let main = host.children(container)[0];
        let div = host.children(main)[0];
        host.children(div)[0]
    };

    assert!(renderer.dispatch(&Event::new("click", button)).unwrap());
    assert_eq!(*fixture.caught.borrow(), vec!["bad click".to_owned()]);

    renderer.flush().unwrap();
    assert_eq!(
        markup(&renderer, container),
        "<root><main><div>fallback</div></main></root>"
    );
}

#[test]
fn test_uncaught_error_reaches_caller() {
    let (renderer, container) = setup();
    let leaf = Component::new("Leaf", |_| Err("boom".into())).build();
    let tree = h("div", Attrs::new(), [h(&leaf, Attrs::new(), None::<VNode>), text("kept")]);

    let err = renderer.render(&tree, container, None).unwrap_err();
    assert_eq!(err.to_string(), "uncaught error in <Leaf>: boom");
    assert!(matches!(err, ReconcileError::Uncaught { ref component, .. } if component == "Leaf"));
}

#[test]
fn test_failing_fallback_escalates_past_caught_boundary() {
    let (renderer, container) = setup();
    let leaf = Component::new("Leaf", |_| Err("boom".into())).build();
    // Catches, but its fallback render fails too.
    let fragile = Component::new("Fragile", move |scope| {
        if scope.state.get("failed").is_some() {
            return Err("fallback broke".into());
        }
        Ok(Some(h(&leaf, Attrs::new(), None::<VNode>)))
    })
    .did_catch(|this, _| {
        this.set_state(Map::new().with("failed", true));
        Ok(())
    })
    .build();

    renderer
        .render(&h(&fragile, Attrs::new(), None::<VNode>), container, None)
        .unwrap();
    let err = renderer.flush().unwrap_err();
    assert_eq!(err.to_string(), "uncaught error in <Fragile>: fallback broke");
}

#[test]
fn test_recovered_boundary_catches_the_next_failure() {
    let (renderer, container) = setup();
    let fail = Rc::new(Cell::new(true));
    let leaf = {
        let fail = fail.clone();
        Component::new("Leaf", move |_| {
            if fail.get() {
                return Err("boom".into());
            }
            Ok(Some(text("leaf")))
        })
        .build()
    };
    let fixture = boundary_fixture(leaf);

    renderer
        .render(&h(&fixture.root, Attrs::new(), None::<VNode>), container, None)
        .unwrap();
    renderer.flush().unwrap();
    let boundary = fixture.boundary.borrow().clone().unwrap();
    // Rendering the fallback re-arms the boundary.
    assert!(!boundary.is_caught());
    assert_eq!(
        markup(&renderer, container),
        "<root><main><div>fallback</div></main></root>"
    );

    fail.set(false);
    boundary.set_state(Map::new().with("failed", false));
    renderer.flush().unwrap();
    assert_eq!(markup(&renderer, container), "<root><main><div>leaf</div></main></root>");

    fail.set(true);
    boundary.set_state(Map::new().with("failed", false));
    renderer.flush().unwrap();
    assert_eq!(*fixture.caught.borrow(), vec!["boom".to_owned(), "boom".to_owned()]);
    assert_eq!(
        markup(&renderer, container),
        "<root><main><div>fallback</div></main></root>"
    );
    assert!(!boundary.is_caught());
    assert_eq!(fixture.root_renders.get(), 1);
}

// ---------------------------------------------------------------------------
// Type-change replace
// ---------------------------------------------------------------------------

#[test]
fn test_tag_change_unmounts_subtree_and_mounts_fresh() {
    let (renderer, container) = setup();
    let handles: Handles = Rc::default();
    let item = item(&handles);

    let root = renderer
        .render(
            &h("div", Attrs::new(), [h(&item, Attrs::new().with("label", "a"), None::<VNode>)]),
            container,
            None,
        )
        .unwrap();
    renderer.take_lifecycle_events();
    let old_id = handles.borrow()[0].id();

    let next = renderer
        .render(
            &h("span", Attrs::new(), [h(&item, Attrs::new().with("label", "a"), None::<VNode>)]),
            container,
            Some(root),
        )
        .unwrap();

    assert_ne!(next, root);
    assert!(!renderer.host().contains(root));
    let events = renderer.take_lifecycle_events();
    assert!(events.contains(&LifecycleEvent::Unmount {
        instance: old_id,
        component: "Item".into()
    }));
    assert!(events.iter().any(|e| matches!(e, LifecycleEvent::Mount { .. })));
    assert!(!handles.borrow()[0].is_mounted());
    assert!(handles.borrow()[1].is_mounted());
    assert_eq!(markup(&renderer, container), "<root><span><li>a</li></span></root>");
}

#[test]
fn test_component_definition_change_replaces_instance() {
    let (renderer, container) = setup();
    let a = Component::stateless("A", |_| Ok(Some(text("a")))).build();
    let b = Component::stateless("B", |_| Ok(Some(text("b")))).build();

    let root = renderer.render(&h(&a, Attrs::new(), None::<VNode>), container, None).unwrap();
    renderer.take_lifecycle_events();
    renderer.render(&h(&b, Attrs::new(), None::<VNode>), container, Some(root)).unwrap();

    let events = renderer.take_lifecycle_events();
    let kinds: Vec<_> = events
        .iter()
        .map(|e| match e {
            LifecycleEvent::Mount { component, .. } => format!("mount {component}"),
            LifecycleEvent::Update { component, .. } => format!("update {component}"),
            LifecycleEvent::Unmount { component, .. } => format!("unmount {component}"),
        })
        .collect();
    assert_eq!(kinds, vec!["unmount A", "mount B"]);
    assert_eq!(markup(&renderer, container), "<root>b</root>");
}

// ---------------------------------------------------------------------------
// Should-update short-circuit
// ---------------------------------------------------------------------------

#[test]
fn test_should_update_false_skips_render_but_keeps_bookkeeping() {
    let (renderer, container) = setup();
    let renders = Rc::new(Cell::new(0));
    let handle: Rc<RefCell<Option<ComponentHandle>>> = Rc::default();
    let frozen = {
        let renders = renders.clone();
        let handle = handle.clone();
        Component::new("Frozen", move |scope| {
            renders.set(renders.get() + 1);
            let label = scope.props.get("label").map(|v| v.to_string()).unwrap_or_default();
            Ok(Some(h("p", Attrs::new(), [label])))
        })
        .should_update(|_, _, _, _| Ok(false))
        .did_mount(move |this| {
            *handle.borrow_mut() = Some(this.clone());
            Ok(())
        })
        .build()
    };

    let root = renderer
        .render(&h(&frozen, Attrs::new().with("label", "one"), None::<VNode>), container, None)
        .unwrap();
    renderer.host_mut().take_mutations();

    renderer
        .render(&h(&frozen, Attrs::new().with("label", "two"), None::<VNode>), container, Some(root))
        .unwrap();
    assert_eq!(renders.get(), 1);
    assert!(renderer.host().mutations().is_empty());
    assert_eq!(markup(&renderer, container), "<root><p>one</p></root>");

    let this = handle.borrow().clone().unwrap();
    assert_eq!(this.props().get("label").and_then(|v| v.as_str()), Some("two"));

    // State bookkeeping too, and the callback still runs.
    let ran = Rc::new(Cell::new(false));
    let flag = ran.clone();
    this.set_state_then(Map::new().with("n", 1), move || flag.set(true));
    renderer.flush().unwrap();
    assert_eq!(renders.get(), 1);
    assert!(ran.get());
    assert_eq!(this.state().get("n").and_then(|v| v.as_int()), Some(1));
}

// ---------------------------------------------------------------------------
// Lifecycle ordering
// ---------------------------------------------------------------------------

fn traced(name: &'static str, log: &Rc<RefCell<Vec<String>>>, child: Option<Rc<Component>>) -> Rc<Component> {
    let (a, b, c, d, e) = (log.clone(), log.clone(), log.clone(), log.clone(), log.clone());
    Component::new(name, move |_| {
        a.borrow_mut().push(format!("{name}.render"));
        Ok(Some(match &child {
            Some(child) => h("div", Attrs::new(), [h(child, Attrs::new(), None::<VNode>)]),
            None => text(name),
        }))
    })
    .will_mount(move |_| {
        b.borrow_mut().push(format!("{name}.will_mount"));
        Ok(())
    })
    .did_mount(move |_| {
        c.borrow_mut().push(format!("{name}.did_mount"));
        Ok(())
    })
    .did_update(move |_, _, _, _| {
        d.borrow_mut().push(format!("{name}.did_update"));
        Ok(())
    })
    .will_unmount(move |_| {
        e.borrow_mut().push(format!("{name}.will_unmount"));
        Ok(())
    })
    .build()
}

#[test]
fn test_lifecycle_order_mount_update_unmount() {
    let (renderer, container) = setup();
    let log = Rc::new(RefCell::new(Vec::new()));
    let child = traced("Child", &log, None);
    let parent = traced("Parent", &log, Some(child));
    let tree = h(&parent, Attrs::new(), None::<VNode>);

    let root = renderer.render(&tree, container, None).unwrap();
    assert_eq!(
        log.take(),
        vec![
            "Parent.will_mount",
            "Parent.render",
            "Child.will_mount",
            "Child.render",
            "Child.did_mount",
            "Parent.did_mount",
        ]
    );

    renderer.render(&tree, container, Some(root)).unwrap();
    assert_eq!(
        log.take(),
        vec!["Parent.render", "Child.render", "Child.did_update", "Parent.did_update"]
    );

    renderer.unmount(container).unwrap();
    assert_eq!(log.take(), vec!["Parent.will_unmount", "Child.will_unmount"]);
}

#[test]
fn test_children_mounted_by_an_update_finish_before_parent_did_update() {
    let (renderer, container) = setup();
    let log = Rc::new(RefCell::new(Vec::new()));
    let child = traced("Child", &log, None);
    let parent_handle: Rc<RefCell<Option<ComponentHandle>>> = Rc::default();
    let parent = {
        let (render_log, update_log) = (log.clone(), log.clone());
        let slot = parent_handle.clone();
        Component::new("Parent", move |scope| {
            render_log.borrow_mut().push("Parent.render".to_owned());
            *slot.borrow_mut() = Some(scope.this.clone());
            let show = scope.state.get("show").and_then(|v| v.as_bool()) == Some(true);
            let children: Vec<VNode> = if show {
                vec![h(&child, Attrs::new(), None::<VNode>)]
            } else {
                Vec::new()
            };
            Ok(Some(h("div", Attrs::new(), [children])))
        })
        .did_update(move |_, _, _, _| {
            update_log.borrow_mut().push("Parent.did_update".to_owned());
            Ok(())
        })
        .build()
    };

    renderer
        .render(&h(&parent, Attrs::new(), None::<VNode>), container, None)
        .unwrap();
    log.take();

    let handle = parent_handle.borrow().clone().unwrap();
    handle.set_state(Map::new().with("show", true));
    renderer.flush().unwrap();
    assert_eq!(
        log.take(),
        vec![
            "Parent.render",
            "Child.will_mount",
            "Child.render",
            "Child.did_mount",
            "Parent.did_update",
        ]
    );
    assert_eq!(markup(&renderer, container), "<root><div>Child</div></root>");
}

#[test]
fn test_will_mount_set_state_lands_in_first_render() {
    let (renderer, container) = setup();
    let renders = Rc::new(Cell::new(0));
    let ready = {
        let renders = renders.clone();
        Component::new("Ready", move |scope| {
            renders.set(renders.get() + 1);
            let ready = scope.state.get("ready").and_then(|v| v.as_bool()) == Some(true);
            Ok(Some(text(if ready { "ready" } else { "waiting" })))
        })
        .will_mount(|this| {
            this.set_state(Map::new().with("ready", true));
            Ok(())
        })
        .build()
    };

    renderer
        .render(&h(&ready, Attrs::new(), None::<VNode>), container, None)
        .unwrap();
    assert_eq!(markup(&renderer, container), "<root>ready</root>");
    assert_eq!(renders.get(), 1);
    assert_eq!(scheduler::pending(), 0);
}

#[test]
fn test_set_state_after_unmount_is_ignored() {
    let (renderer, container) = setup();
    let handles: Handles = Rc::default();
    let item = item(&handles);
    renderer
        .render(&h(&item, Attrs::new().with("label", "x"), None::<VNode>), container, None)
        .unwrap();
    renderer.unmount(container).unwrap();

    let stale = handles.borrow()[0].clone();
    stale.set_state(Map::new().with("n", 1));
    assert_eq!(scheduler::pending(), 0);
    assert!(!stale.is_mounted());
}

#[test]
fn test_pending_callbacks_are_dropped_on_unmount() {
    let (renderer, container) = setup();
    let handles: Handles = Rc::default();
    let item = item(&handles);
    renderer
        .render(&h(&item, Attrs::new().with("label", "x"), None::<VNode>), container, None)
        .unwrap();

    let ran = Rc::new(Cell::new(false));
    let flag = ran.clone();
    let handle = handles.borrow()[0].clone();
    handle.set_state_then(Map::new().with("n", 1), move || flag.set(true));
    assert_eq!(scheduler::pending(), 1);

    renderer.unmount(container).unwrap();
    renderer.flush().unwrap();
    assert!(!ran.get());
    assert_eq!(scheduler::pending(), 0);
}

// ---------------------------------------------------------------------------
// Force update
// ---------------------------------------------------------------------------

#[test]
fn test_force_update_bypasses_should_update_and_queue() {
    let (renderer, container) = setup();
    let renders = Rc::new(Cell::new(0));
    let handle: Rc<RefCell<Option<ComponentHandle>>> = Rc::default();
    let stubborn = {
        let renders = renders.clone();
        let handle = handle.clone();
        Component::new("Stubborn", move |_| {
            renders.set(renders.get() + 1);
            Ok(Some(text(renders.get().to_string())))
        })
        .should_update(|_, _, _, _| Ok(false))
        .did_mount(move |this| {
            *handle.borrow_mut() = Some(this.clone());
            Ok(())
        })
        .build()
    };
    renderer
        .render(&h(&stubborn, Attrs::new(), None::<VNode>), container, None)
        .unwrap();

    let this = handle.borrow().clone().unwrap();
    let ran = Rc::new(Cell::new(false));
    let flag = ran.clone();
    this.force_update_then(move || flag.set(true)).unwrap();

    assert_eq!(renders.get(), 2);
    assert!(ran.get());
    assert_eq!(scheduler::pending(), 0);
    assert_eq!(markup(&renderer, container), "<root>2</root>");
}

#[test]
fn test_force_update_during_pass_runs_before_render_returns() {
    let (renderer, container) = setup();
    let renders = Rc::new(Cell::new(0));
    let eager = {
        let renders = renders.clone();
        Component::new("Eager", move |_| {
            renders.set(renders.get() + 1);
            Ok(Some(text(renders.get().to_string())))
        })
        .did_mount(|this| {
            this.force_update().map_err(|e| e.to_string())?;
            Ok(())
        })
        .build()
    };

    renderer
        .render(&h(&eager, Attrs::new(), None::<VNode>), container, None)
        .unwrap();
    assert_eq!(renders.get(), 2);
    assert_eq!(markup(&renderer, container), "<root>2</root>");
}

// ---------------------------------------------------------------------------
// Runaway self-update
// ---------------------------------------------------------------------------

#[test]
fn test_runaway_self_update_is_fatal() {
    let (renderer, container) = setup_with(Config::new().with_max_drain_passes(5));
    let restless = Component::new("Restless", |scope| {
        let n = scope.state.get("n").and_then(|v| v.as_int()).unwrap_or(0);
        Ok(Some(text(n.to_string())))
    })
    .did_mount(|this| {
        this.set_state(Map::new().with("n", 1));
        Ok(())
    })
    .did_update(|this, _, _, _| {
        this.set_state(StateUpdate::with(|state, _| {
            let n = state.get("n").and_then(|v| v.as_int()).unwrap_or(0);
            Map::new().with("n", n + 1)
        }));
        Ok(())
    })
    .build();

    renderer
        .render(&h(&restless, Attrs::new(), None::<VNode>), container, None)
        .unwrap();
    let err = renderer.flush().unwrap_err();

    assert_eq!(err, ReconcileError::RunawayUpdates { limit: 5 });
    assert_eq!(scheduler::pending(), 0);
    assert!(!scheduler::is_draining());
    // Every pass that ran was committed.
    assert_eq!(markup(&renderer, container), "<root>5</root>");
}

// ---------------------------------------------------------------------------
// Refs
// ---------------------------------------------------------------------------

#[test]
fn test_component_ref_receives_output_node() {
    let (renderer, container) = setup();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    let badge = Component::stateless("Badge", |_| Ok(Some(h("b", Attrs::new(), ["!"])))).build();

    let root = renderer
        .render(
            &h(&badge, Attrs::new().node_ref(move |node| log.borrow_mut().push(node)), None::<VNode>),
            container,
            None,
        )
        .unwrap();
    renderer.unmount(container).unwrap();

    assert_eq!(*seen.borrow(), vec![Some(root), None]);
}

#[test]
fn test_malformed_component_ref_is_fatal() {
    let (renderer, container) = setup();
    let badge = Component::stateless("Badge", |_| Ok(Some(text("!")))).build();
    let err = renderer
        .render(&h(&badge, Attrs::new().with("ref", 5), None::<VNode>), container, None)
        .unwrap_err();
    assert_eq!(
        err,
        ReconcileError::MalformedRef {
            tag: "Badge".into(),
            found: "int"
        }
    );
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

#[test]
fn test_child_context_flows_to_descendants() {
    let (renderer, container) = setup();
    let consumer = Component::new("Consumer", |scope| {
        let theme = scope.context.get("theme").map(|v| v.to_string()).unwrap_or_default();
        Ok(Some(h("span", Attrs::new().with("class", theme), ["themed"])))
    })
    .build();
    let provider = {
        let consumer = consumer.clone();
        Component::new("Provider", move |_| {
            Ok(Some(h("div", Attrs::new(), [h(&consumer, Attrs::new(), None::<VNode>)])))
        })
        .child_context(|scope| {
            let theme = scope.props.get("theme").cloned().unwrap_or_else(|| "light".into());
            Map::new().with("theme", theme)
        })
        .build()
    };

    let root = renderer
        .render(&h(&provider, Attrs::new().with("theme", "dark"), None::<VNode>), container, None)
        .unwrap();
    assert_eq!(
        markup(&renderer, container),
        r#"<root><div><span class="dark">themed</span></div></root>"#
    );

    renderer
        .render(&h(&provider, Attrs::new().with("theme", "sepia"), None::<VNode>), container, Some(root))
        .unwrap();
    assert_eq!(
        markup(&renderer, container),
        r#"<root><div><span class="sepia">themed</span></div></root>"#
    );
}

// ---------------------------------------------------------------------------
// Unresolved components
// ---------------------------------------------------------------------------

#[test]
fn test_unresolved_component_renders_nothing() {
    let (renderer, container) = setup();
    let tree = h(
        "div",
        Attrs::new(),
        [h(None::<Rc<Component>>, Attrs::new(), None::<VNode>), text("sibling")],
    );
    let root = renderer.render(&tree, container, None).unwrap();
    assert_eq!(renderer.host().children(root).len(), 2);
    assert_eq!(markup(&renderer, container), "<root><div>sibling</div></root>");
}

// ---------------------------------------------------------------------------
// Debounce strategies
// ---------------------------------------------------------------------------

fn clicker() -> Rc<Component> {
    Component::new("Clicker", |scope| {
        let n = scope.state.get("n").and_then(|v| v.as_int()).unwrap_or(0);
        let this = scope.this.clone();
        Ok(Some(h(
            "button",
            Attrs::new().on("click", move |_| {
                this.set_state(Map::new().with("n", n + 1));
            }),
            [n.to_string()],
        )))
    })
    .build()
}

#[test]
fn test_custom_debounce_receives_drain() {
    let deferred: Rc<RefCell<Vec<Box<dyn FnOnce()>>>> = Rc::default();
    let sink = deferred.clone();
    let (renderer, container) =
        setup_with(Config::new().with_debounce(Debounce::custom(move |drain| sink.borrow_mut().push(drain))));

    let root = renderer
        .render(&h(&clicker(), Attrs::new(), None::<VNode>), container, None)
        .unwrap();
    renderer.dispatch(&Event::new("click", root)).unwrap();
    renderer.dispatch(&Event::new("click", root)).unwrap();

    // One drain scheduled for the whole cycle.
    assert_eq!(deferred.borrow().len(), 1);
    assert_eq!(markup(&renderer, container), "<root><button>0</button></root>");

    let drains: Vec<_> = deferred.borrow_mut().drain(..).collect();
    for drain in drains {
        drain();
    }
    assert_eq!(markup(&renderer, container), "<root><button>1</button></root>");
}

#[test]
fn test_tokio_debounce_drains_after_yield() {
    tokio_test::block_on(async {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let (renderer, container) = setup_with(Config::new().with_debounce(Debounce::Tokio));
                let root = renderer
                    .render(&h(&clicker(), Attrs::new(), None::<VNode>), container, None)
                    .unwrap();

                renderer.dispatch(&Event::new("click", root)).unwrap();
                assert_eq!(scheduler::pending(), 1);

                for _ in 0..8 {
                    tokio::task::yield_now().await;
                }
                assert_eq!(scheduler::pending(), 0);
                assert_eq!(markup(&renderer, container), "<root><button>1</button></root>");
            })
            .await;
    });
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

#[test]
fn test_debug_hook_sees_nodes_built_during_render() {
    debug::reset_hooks();
    let (renderer, container) = setup();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let names = seen.clone();
    debug::install_hook(move |node| names.borrow_mut().push(node.name().to_owned()));

    let badge = Component::stateless("Badge", |_| Ok(Some(h("span", Attrs::new(), ["!"])))).build();
    let tree = h("div", Attrs::new(), [h(&badge, Attrs::new(), None::<VNode>)]);
    assert_eq!(*seen.borrow(), vec!["Badge", "div"]);

    renderer.render(&tree, container, None).unwrap();
    debug::reset_hooks();
    assert_eq!(*seen.borrow(), vec!["Badge", "div", "span"]);
}

#[test]
fn test_diagnose_reports_structural_mistakes() {
    let tree = h(
        "ul",
        Attrs::new(),
        [
            h("li", Attrs::new().key("a"), ["1"]),
            h("li", Attrs::new().key("a"), ["2"]),
        ],
    );
    let found = debug::diagnose(&tree);
    assert!(matches!(found.as_slice(), [Diagnostic::DuplicateKey { .. }]));

    let found = debug::diagnose(&h(None::<Rc<Component>>, Attrs::new(), None::<VNode>));
    assert!(matches!(found.as_slice(), [Diagnostic::UnresolvedComponent { .. }]));
}

#[test]
fn test_diagnostics_do_not_alter_rendering() {
    debug::reset_hooks();
    let (renderer, container) = setup_with(Config::new().with_diagnostics(true));
    let tree = h(
        "ul",
        Attrs::new(),
        [
            h("li", Attrs::new().key("dup"), ["1"]),
            h("li", Attrs::new().key("dup"), ["2"]),
        ],
    );
    renderer.render(&tree, container, None).unwrap();
    debug::reset_hooks();
    assert_eq!(markup(&renderer, container), "<root><ul><li>1</li><li>2</li></ul></root>");
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

#[test]
fn test_todo_list_snapshot() {
    let (renderer, container) = setup();
    let todo = Component::stateless("Todo", |props| {
        let title = props.get("title").map(|v| v.to_string()).unwrap_or_default();
        let done = props.get("done").and_then(|v| v.as_bool()).unwrap_or(false);
        Ok(Some(h(
            "li",
            Attrs::new().with("class", if done { "done" } else { "open" }),
            [title],
        )))
    })
    .build();
    let app = |items: &[(&str, bool)]| {
        let todos: Vec<VNode> = items
            .iter()
            .map(|(title, done)| {
                h(&todo, Attrs::new().key(*title).with("title", *title).with("done", *done), None::<VNode>)
            })
            .collect();
        h(
            "section",
            Attrs::new().with("id", "todos"),
            [h("h1", Attrs::new(), ["Todos"]), h("ul", Attrs::new(), [todos])],
        )
    };

    let root = renderer
        .render(&app(&[("write", false), ("test", true)]), container, None)
        .unwrap();
    renderer
        .render(&app(&[("test", true), ("ship", false), ("write", true)]), container, Some(root))
        .unwrap();

    insta::assert_snapshot!(to_pretty_markup(&renderer.host(), container), @r###"
    <root>
      <section id="todos">
        <h1>
          "Todos"
        </h1>
        <ul>
          <li class="done">
            "test"
          </li>
          <li class="open">
            "ship"
          </li>
          <li class="done">
            "write"
          </li>
        </ul>
      </section>
    </root>
    "###);
}
