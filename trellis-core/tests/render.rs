//! Integration Tests for Rendering
//!
//! These tests mount component trees into a `MemoryDom` and check that the
//! live nodes follow the signals they were built from.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::{json, Value};
use trellis_core::dom::{create_ref, Dom, MemoryDom, NodeRef};
use trellis_core::render::{
    case, comment, create_component, create_node, each, expression, handler, mount, portal,
    reactive, slot, slot_with, use_directive, Branch, Component, DirectiveHooks, MountOptions,
    View,
};
use trellis_core::{Error, Mode, Runtime, RuntimeConfig};

fn runtime(mode: Mode) -> Runtime {
    Runtime::with_config(RuntimeConfig::default().mode(mode))
}

fn setup(mode: Mode) -> (Runtime, Rc<MemoryDom>, NodeRef) {
    let dom = Rc::new(MemoryDom::new());
    let root = dom.create_element("main");
    (runtime(mode), dom, root)
}

fn elements(dom: &MemoryDom, parent: NodeRef, tag: &str) -> Vec<NodeRef> {
    dom.children(parent)
        .into_iter()
        .filter(|node| dom.tag(*node).as_deref() == Some(tag))
        .collect()
}

/// Test the full path from a signal write to the DOM text.
#[test]
fn signal_write_reaches_the_dom_after_tick() {
    let (rt, dom, root) = setup(Mode::Production);
    let (count, set_count) = rt.create_signal(0);

    let app = Component::new("App", move |_, _| {
        let count = count.clone();
        create_node("span")
            .child(expression(move || count.get()))
            .build()
    });
    let handle = mount(&rt, dom.clone(), &app, root, MountOptions::new()).unwrap();
    assert_eq!(dom.text_content(root), "0");

    set_count.set(5);
    assert_eq!(dom.text_content(root), "0");
    rt.tick();
    assert_eq!(dom.text_content(root), "5");

    handle.destroy();
    handle.destroy();
    assert!(handle.is_destroyed());
    assert!(dom.children(root).is_empty());
}

/// Test keyed reconciliation of `[a, b, c]` into `[b, a, d]`.
#[test]
fn keyed_list_reuses_moves_and_destroys() {
    let (rt, dom, root) = setup(Mode::Production);
    let items = rt.signal(vec!["a", "b", "c"]);
    let rendered = Rc::new(RefCell::new(Vec::new()));
    let list = create_ref();

    let app = Component::new("App", {
        let items = items.clone();
        let rendered = rendered.clone();
        let list = list.clone();
        move |_, _| {
            let items = items.clone();
            let rendered = rendered.clone();
            create_node("ul")
                .prop("ref", list.clone())
                .child(
                    each(move || items.get(), move |item, index| {
                        rendered.borrow_mut().push(item.get_untracked());
                        create_node("li")
                            .child(expression(move || format!("{}:{}", index.get(), item.get())))
                            .build()
                    })
                    .key(|item| item.to_string()),
                )
                .build()
        }
    });
    let _handle = mount(&rt, dom.clone(), &app, root, MountOptions::new()).unwrap();

    let ul = list.get().unwrap();
    let before = elements(&dom, ul, "li");
    assert_eq!(dom.text_content(ul), "0:a1:b2:c");

    items.set(vec!["b", "a", "d"]);
    rt.tick();

    let after = elements(&dom, ul, "li");
    assert_eq!(after.len(), 3);
    assert_eq!(after[0], before[1]);
    assert_eq!(after[1], before[0]);
    assert!(!before.contains(&after[2]));
    assert_eq!(dom.parent(before[2]), None);
    assert_eq!(dom.text_content(ul), "0:b1:a2:d");
    assert_eq!(*rendered.borrow(), vec!["a", "b", "c", "d"]);
}

/// Test that list items are keyed by position by default.
#[test]
fn list_without_key_updates_items_in_place() {
    let (rt, dom, root) = setup(Mode::Production);
    let items = rt.signal(vec![1, 2]);
    let renders = Rc::new(Cell::new(0));

    let app = Component::new("App", {
        let items = items.clone();
        let renders = renders.clone();
        move |_, _| {
            let items = items.clone();
            let renders = renders.clone();
            create_node("ol")
                .child(each(move || items.get(), move |item, _| {
                    renders.set(renders.get() + 1);
                    Ok(expression(move || item.get()))
                }))
                .build()
        }
    });
    let _handle = mount(&rt, dom.clone(), &app, root, MountOptions::new()).unwrap();
    assert_eq!(dom.text_content(root), "12");

    items.set(vec![3, 2, 5]);
    rt.tick();
    assert_eq!(dom.text_content(root), "325");
    assert_eq!(renders.get(), 3);

    items.set(Vec::new());
    rt.tick();
    assert_eq!(dom.text_content(root), "");
}

/// Test that duplicate keys are rejected.
#[test]
fn duplicate_list_keys_fail() {
    let (rt, dom, root) = setup(Mode::Production);
    let app = Component::new("App", |_, _| {
        create_node("ul")
            .child(each(|| vec![1, 1], |_, _| Ok(View::from("x"))).key(|item| *item))
            .build()
    });

    let err = mount(&rt, dom.clone(), &app, root, MountOptions::new()).unwrap_err();
    assert!(matches!(err, Error::DuplicateKey(key) if key == "1"));
    assert!(dom.children(root).is_empty());
}

/// Test that switching branches mounts a fresh component and cleans up the
/// old one.
#[test]
fn case_switch_remounts_branch() {
    let (rt, dom, root) = setup(Mode::Production);
    let show = rt.signal(true);
    let mounts = Rc::new(Cell::new(0));
    let cleanups = Rc::new(Cell::new(0));

    let x = Component::new("X", {
        let mounts = mounts.clone();
        let cleanups = cleanups.clone();
        move |rt, _| {
            mounts.set(mounts.get() + 1);
            let cleanups = cleanups.clone();
            rt.create_effect(move || {
                let cleanups = cleanups.clone();
                Some(move || cleanups.set(cleanups.get() + 1))
            })?;
            create_node("b").child("X").build()
        }
    });

    let app = Component::new("App", {
        let show = show.clone();
        move |_, _| {
            let show = show.clone();
            create_node("div")
                .child(case(vec![
                    Branch::when(move || show.get(), create_component(&x).build()?),
                    Branch::otherwise("none"),
                ])?)
                .build()
        }
    });
    let handle = mount(&rt, dom.clone(), &app, root, MountOptions::new()).unwrap();
    assert_eq!(dom.text_content(root), "X");
    assert_eq!(mounts.get(), 1);

    show.set(false);
    rt.tick();
    assert_eq!(dom.text_content(root), "none");
    assert_eq!(cleanups.get(), 1);

    show.set(true);
    rt.tick();
    assert_eq!(dom.text_content(root), "X");
    assert_eq!(mounts.get(), 2);

    handle.destroy();
    assert_eq!(cleanups.get(), 2);
    assert_eq!(show.subscriber_count(), 0);
}

/// Test that a case with no matching branch renders nothing.
#[test]
fn case_without_match_renders_nothing() {
    let (rt, dom, root) = setup(Mode::Production);
    let level = rt.signal(0);

    let app = Component::new("App", {
        let level = level.clone();
        move |_, _| {
            let low = level.clone();
            let high = level.clone();
            create_node("p")
                .child(case(vec![
                    Branch::when(move || low.get() == 1, "low"),
                    Branch::when(move || high.get() > 1, "high"),
                ])?)
                .build()
        }
    });
    let _handle = mount(&rt, dom.clone(), &app, root, MountOptions::new()).unwrap();
    assert_eq!(dom.text_content(root), "");

    level.set(1);
    rt.tick();
    assert_eq!(dom.text_content(root), "low");

    level.set(3);
    rt.tick();
    assert_eq!(dom.text_content(root), "high");
}

/// Test that later conditions are only tracked once evaluation reaches them.
#[test]
fn case_tracks_conditions_lazily() {
    let (rt, dom, root) = setup(Mode::Production);
    let first = rt.signal(true);
    let second = rt.signal(false);

    let app = Component::new("App", {
        let first = first.clone();
        let second = second.clone();
        move |_, _| {
            let first = first.clone();
            let second = second.clone();
            create_node("p")
                .child(case(vec![
                    Branch::when(move || first.get(), "X"),
                    Branch::when(move || second.get(), "Y"),
                    Branch::otherwise("Z"),
                ])?)
                .build()
        }
    });
    let _handle = mount(&rt, dom.clone(), &app, root, MountOptions::new()).unwrap();
    assert_eq!(dom.text_content(root), "X");
    assert_eq!(second.subscriber_count(), 0);

    first.set(false);
    rt.tick();
    assert_eq!(dom.text_content(root), "Z");
    assert_eq!(second.subscriber_count(), 1);

    second.set(true);
    rt.tick();
    assert_eq!(dom.text_content(root), "Y");

    first.set(true);
    rt.tick();
    assert_eq!(dom.text_content(root), "X");
    assert_eq!(second.subscriber_count(), 1);
}

/// Test that malformed conditionals fail at construction.
#[test]
fn case_rejects_empty_input() {
    assert!(matches!(case(Vec::new()), Err(Error::NoBranches)));
    assert!(matches!(
        case(vec![Branch::otherwise(View::empty())]),
        Err(Error::EmptyBranch)
    ));
}

/// Test that effects re-run on change and clean up before each run.
#[test]
fn effects_clean_up_before_rerun_and_on_destroy() {
    let (rt, dom, root) = setup(Mode::Production);
    let count = rt.signal(0);
    let log = Rc::new(RefCell::new(Vec::new()));

    let app = Component::new("App", {
        let count = count.clone();
        let log = log.clone();
        move |rt, _| {
            let count = count.clone();
            let log = log.clone();
            rt.create_effect(move || {
                let value = count.get();
                log.borrow_mut().push(format!("run {value}"));
                let log = log.clone();
                Some(move || log.borrow_mut().push(format!("cleanup {value}")))
            })?;
            Ok(View::from("app"))
        }
    });
    let handle = mount(&rt, dom.clone(), &app, root, MountOptions::new()).unwrap();

    count.set(1);
    rt.tick();
    handle.destroy();

    assert_eq!(
        *log.borrow(),
        vec!["run 0", "cleanup 0", "run 1", "cleanup 1"]
    );
}

/// Test that in development mode a failing component does not take its
/// siblings down.
#[test]
fn development_mode_isolates_failing_component() {
    let (rt, dom, root) = setup(Mode::Development);
    let errors = Rc::new(RefCell::new(Vec::new()));

    let broken = Component::new("Broken", |_, _| Err(Error::component("Broken", "boom")));
    let fine = Component::new("Fine", |_, _| create_node("i").child("ok").build());
    let app = Component::new("App", move |_, _| {
        create_node("div")
            .child(create_component(&broken).build()?)
            .child(create_component(&fine).build()?)
            .build()
    });

    let options = MountOptions::new().error_handler({
        let errors = errors.clone();
        move |err, ancestry| errors.borrow_mut().push(format!("{ancestry}: {err}"))
    });
    let _handle = mount(&rt, dom.clone(), &app, root, options).unwrap();

    assert_eq!(dom.text_content(root), "ok");
    assert_eq!(
        *errors.borrow(),
        vec!["App > Broken: component `Broken` failed: boom"]
    );
}

/// Test that in production mode component failures propagate.
#[test]
fn production_mode_propagates_failures() {
    let (rt, dom, root) = setup(Mode::Production);

    let broken = Component::new("Broken", |_, _| Err(Error::component("Broken", "boom")));
    let app = Component::new("App", move |_, _| {
        create_node("div")
            .child("before")
            .child(create_component(&broken).build()?)
            .build()
    });

    let err = mount(&rt, dom.clone(), &app, root, MountOptions::new()).unwrap_err();
    assert!(matches!(err, Error::Component { component, .. } if component == "Broken"));
    assert!(dom.children(root).is_empty());
}

/// Test that components must render something.
#[test]
fn empty_component_is_an_error() {
    let (rt, dom, root) = setup(Mode::Production);
    let app = Component::new("Blank", |_, _| Ok(View::empty()));

    let err = mount(&rt, dom.clone(), &app, root, MountOptions::new()).unwrap_err();
    assert!(matches!(err, Error::EmptyComponent(name) if name == "Blank"));
}

/// Test that mount validates its target and props.
#[test]
fn mount_validates_target_and_props() {
    let (rt, dom, root) = setup(Mode::Production);
    let app = Component::new("App", |_, _| Ok(View::from("x")));

    let text = dom.create_text("not an element");
    let err = mount(&rt, dom.clone(), &app, text, MountOptions::new()).unwrap_err();
    assert!(matches!(err, Error::InvalidTarget));

    let options = MountOptions::new().props(json!([1, 2]));
    let err = mount(&rt, dom.clone(), &app, root, options).unwrap_err();
    assert!(matches!(err, Error::InvalidProp { key, .. } if key == "props"));
}

/// Test registered components, globals and initial props.
#[test]
fn registered_components_and_globals() {
    let (rt, dom, root) = setup(Mode::Production);

    let greeting = Component::new("greeting", |_, props| {
        let word = props.global("word").and_then(|v| v.as_str().map(str::to_owned));
        let name = props.get_str("name").unwrap_or_default();
        create_node("span")
            .child(format!("{} {}", word.unwrap_or_default(), name))
            .build()
    });
    let app = Component::new("App", |_, props| {
        create_node("p:greeting")
            .prop("name", props.get("who").unwrap_or(Value::Null))
            .build()
    });

    let options = MountOptions::new()
        .component(greeting)
        .global("word", json!("Hello"))
        .props(json!({ "who": "Ada" }));
    let _handle = mount(&rt, dom.clone(), &app, root, options).unwrap();
    assert_eq!(dom.text_content(root), "Hello Ada");

    let missing = Component::new("App", |_, _| create_node("p:nowhere").build());
    let err = mount(&rt, dom.clone(), &missing, root, MountOptions::new()).unwrap_err();
    assert!(matches!(err, Error::UnknownComponent(name) if name == "nowhere"));
}

/// Test that reactive props reach a child through a reader.
#[test]
fn reactive_props_flow_into_children() {
    let (rt, dom, root) = setup(Mode::Production);
    let name = rt.signal(String::from("Ada"));

    let label = Component::new("Label", |_, props| {
        let read = props.reader("text");
        Ok(expression(move || read().as_str().unwrap_or_default().to_owned()))
    });
    let app = Component::new("App", {
        let name = name.clone();
        move |_, _| {
            let name = name.clone();
            create_component(&label)
                .prop("text", reactive(move || name.get()))
                .build()
        }
    });
    let _handle = mount(&rt, dom.clone(), &app, root, MountOptions::new()).unwrap();
    assert_eq!(dom.text_content(root), "Ada");

    name.set(String::from("Grace"));
    rt.tick();
    assert_eq!(dom.text_content(root), "Grace");
}

/// Test that portal content lives in its target and leaves with its owner.
#[test]
fn portal_renders_into_target() {
    let (rt, dom, root) = setup(Mode::Production);
    let overlay = dom.create_element("aside");

    let app = Component::new("App", move |_, _| {
        create_node("div")
            .child(portal(overlay, create_node("p").child("modal").build()?))
            .build()
    });
    let handle = mount(&rt, dom.clone(), &app, root, MountOptions::new()).unwrap();
    assert_eq!(dom.text_content(overlay), "modal");
    assert_eq!(dom.text_content(root), "");

    handle.destroy();
    assert!(dom.children(overlay).is_empty());

    let text = dom.create_text("x");
    let bad = Component::new("Bad", move |_, _| {
        create_node("div").child(portal(text, "nope")).build()
    });
    let err = mount(&rt, dom.clone(), &bad, root, MountOptions::new()).unwrap_err();
    assert!(matches!(err, Error::InvalidTarget));
}

/// Test directive attach, update and destroy hooks.
#[test]
fn directives_receive_updates_and_destroy() {
    let (rt, dom, root) = setup(Mode::Production);
    let tip = rt.signal(String::from("hello"));
    let log = Rc::new(RefCell::new(Vec::new()));

    let options = MountOptions::new().directive("tooltip", {
        let log = log.clone();
        move |cx, value, args| {
            log.borrow_mut().push(format!("attach {} {}", value, args.len()));
            cx.dom.set_attribute(cx.element, "title", value.as_str().unwrap_or_default());

            let dom = cx.dom.clone();
            let element = cx.element;
            let log = log.clone();
            Ok(DirectiveHooks::none()
                .on_update(move |value| {
                    dom.set_attribute(element, "title", value.as_str().unwrap_or_default())
                })
                .on_destroy(move || log.borrow_mut().push("destroy".to_owned())))
        }
    });

    let button = create_ref();
    let app = Component::new("App", {
        let tip = tip.clone();
        let button = button.clone();
        move |_, _| {
            let tip = tip.clone();
            create_node("button")
                .prop("ref", button.clone())
                .prop(
                    "use",
                    use_directive("tooltip")
                        .value(reactive(move || tip.get()))?
                        .arg("top"),
                )
                .build()
        }
    });
    let handle = mount(&rt, dom.clone(), &app, root, options).unwrap();
    let node = button.get().unwrap();
    assert_eq!(dom.attribute(node, "title").as_deref(), Some("hello"));

    tip.set(String::from("bye"));
    rt.tick();
    assert_eq!(dom.attribute(node, "title").as_deref(), Some("bye"));

    handle.destroy();
    assert_eq!(*log.borrow(), vec!["attach \"hello\" 1", "destroy"]);
    assert_eq!(tip.subscriber_count(), 0);
}

/// Test that unknown directives fail.
#[test]
fn unknown_directive_fails() {
    let (rt, dom, root) = setup(Mode::Production);
    let app = Component::new("App", |_, _| {
        create_node("div").prop("use", use_directive("ghost")).build()
    });

    let err = mount(&rt, dom.clone(), &app, root, MountOptions::new()).unwrap_err();
    assert!(matches!(err, Error::UnknownDirective(name) if name == "ghost"));
}

/// Test reactive style and bind reconciliation.
#[test]
fn style_and_bind_drop_stale_entries() {
    let (rt, dom, root) = setup(Mode::Production);
    let wide = rt.signal(true);
    let panel = create_ref();

    let app = Component::new("App", {
        let wide = wide.clone();
        let panel = panel.clone();
        move |_, _| {
            let style = wide.clone();
            let bind = wide.clone();
            create_node("div")
                .prop("ref", panel.clone())
                .prop("style", reactive(move || {
                    if style.get() {
                        json!({ "width": 100, "color": "red" })
                    } else {
                        json!({ "color": "blue" })
                    }
                }))
                .prop("bind", reactive(move || {
                    if bind.get() {
                        json!({ "data-a": 1, "data-b": "x" })
                    } else {
                        json!({ "data-b": "y" })
                    }
                }))
                .build()
        }
    });
    let _handle = mount(&rt, dom.clone(), &app, root, MountOptions::new()).unwrap();
    let node = panel.get().unwrap();
    assert_eq!(dom.style(node, "width").as_deref(), Some("100px"));
    assert_eq!(dom.attribute(node, "data-a").as_deref(), Some("1"));

    wide.set(false);
    rt.tick();
    assert_eq!(dom.style(node, "width"), None);
    assert_eq!(dom.style(node, "color").as_deref(), Some("blue"));
    assert_eq!(dom.attribute(node, "data-a"), None);
    assert_eq!(dom.attribute(node, "data-b").as_deref(), Some("y"));
}

/// Test that event listeners fire and are removed on destroy.
#[test]
fn events_dispatch_to_handlers() {
    let (rt, dom, root) = setup(Mode::Production);
    let clicks = rt.signal(0);
    let button = create_ref();

    let app = Component::new("App", {
        let clicks = clicks.clone();
        let button = button.clone();
        move |_, _| {
            let shown = clicks.clone();
            let on_click = clicks.clone();
            let on_press = clicks.clone();
            create_node("button")
                .prop("ref", button.clone())
                .on("click", move |_| on_click.update(|n| n + 1))
                .prop("onPress", handler(move |event| {
                    let step = event.detail.as_i64().unwrap_or(0) as i32;
                    on_press.update(|n| n + step)
                }))
                .child(expression(move || shown.get()))
                .build()
        }
    });
    let handle = mount(&rt, dom.clone(), &app, root, MountOptions::new()).unwrap();
    let node = button.get().unwrap();

    assert_eq!(dom.dispatch(node, "click", Value::Null), 1);
    assert_eq!(dom.dispatch(node, "press", json!(10)), 1);
    rt.tick();
    assert_eq!(dom.text_content(root), "11");

    handle.destroy();
    assert_eq!(dom.listener_count(node), 0);
}

/// Test slots and comments.
#[test]
fn slots_and_comments_render() {
    let (rt, dom, root) = setup(Mode::Production);
    let count = rt.signal(1);

    let app = Component::new("App", {
        let count = count.clone();
        move |_, _| {
            let count = count.clone();
            create_node("section")
                .child(comment("start"))
                .child(slot("fixed "))
                .child(slot_with(
                    [("n", reactive(move || count.get()))],
                    |_, props| {
                        let n = props.reader("n");
                        Ok(expression(move || n()))
                    },
                ))
                .build()
        }
    });
    let _handle = mount(&rt, dom.clone(), &app, root, MountOptions::new()).unwrap();
    assert!(dom.inner_html(root).contains("<section><!--start-->fixed 1</section>"));

    count.set(2);
    rt.tick();
    assert_eq!(dom.text_content(root), "fixed 2");
}
