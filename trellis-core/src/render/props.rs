//! Property binding.
//!
//! Wires classified element bindings to a live node. Static values are
//! applied once. Reactive values are observed, and the observation's
//! unsubscribe handle is registered as a cleanup on the owning holder.

use std::cell::{OnceCell, RefCell};
use std::rc::Rc;

use serde_json::Value;

use super::holder::Holder;
use super::materialize::RenderCtx;
use super::registry::{DirectiveContext, DirectiveSource, DirectiveUse};
use super::view::{Binding, Source};
use crate::dom::{Dom, NodeRef};
use crate::reactive::Runtime;
use crate::{Error, Result};

/// Apply `read()` through `apply` now and every time a signal it read
/// changes.
///
/// Later reads are untracked; the dependency set is the one captured here.
pub(crate) fn watch<T, R, A>(cx: &RenderCtx, read: R, apply: A, holder: &mut Holder) -> Result<()>
where
    T: 'static,
    R: Fn() -> T + 'static,
    A: Fn(T) -> Result<()> + 'static,
{
    let read = Rc::new(read);
    let apply = Rc::new(apply);

    let callback = {
        let runtime = cx.rt.downgrade();
        let read = Rc::clone(&read);
        let apply = Rc::clone(&apply);
        let report = cx.reporter();
        move || {
            let Some(rt) = Runtime::from_weak(&runtime) else {
                return;
            };
            let value = rt.untrack(|| read());
            if let Err(err) = apply(value) {
                report(&err);
            }
        }
    };

    let (initial, unsubscribe) = cx.rt.observe_with(callback, || read())?;
    if let Err(err) = apply(initial) {
        unsubscribe.unsubscribe();
        return Err(err);
    }

    if !unsubscribe.is_noop() {
        holder.push_cleanup(unsubscribe.into_cleanup());
    }
    Ok(())
}

fn bind_source<A>(cx: &RenderCtx, source: &Source, apply: A, holder: &mut Holder) -> Result<()>
where
    A: Fn(Value) -> Result<()> + 'static,
{
    match source {
        Source::Static(value) => apply(value.clone()),
        Source::Reactive(read) => {
            let read = Rc::clone(read);
            watch(cx, move || read(), apply, holder)
        }
    }
}

/// Bind every classified property of `node`.
pub(crate) fn bind_props(cx: &RenderCtx, node: NodeRef, bindings: &[Binding], holder: &mut Holder) -> Result<()> {
    for binding in bindings {
        let dom = Rc::clone(&cx.dom);
        match binding {
            Binding::Attribute { name, source } => {
                let name = name.clone();
                bind_source(cx, source, move |value| {
                    apply_attribute(&*dom, node, &name, &value);
                    Ok(())
                }, holder)?;
            }
            Binding::Class(source) => {
                bind_source(cx, source, move |value| {
                    let mut classes = Vec::new();
                    class_list(&value, &mut classes);
                    if classes.is_empty() {
                        dom.remove_attribute(node, "class");
                    } else {
                        dom.set_attribute(node, "class", &classes.join(" "));
                    }
                    Ok(())
                }, holder)?;
            }
            Binding::Style(source) => {
                let cache = RefCell::new(StyleCache::default());
                bind_source(cx, source, move |value| {
                    cache.borrow_mut().apply(&*dom, node, value)
                }, holder)?;
            }
            Binding::Bind(source) => {
                let previous = RefCell::new(Vec::<String>::new());
                bind_source(cx, source, move |value| {
                    let mut previous = previous.borrow_mut();
                    let attributes = match value {
                        Value::Object(map) => map,
                        Value::Null => Default::default(),
                        other => return Err(Error::InvalidBind(other.to_string())),
                    };
                    for stale in previous.iter().filter(|key| !attributes.contains_key(*key)) {
                        dom.remove_attribute(node, stale);
                    }
                    for (key, value) in &attributes {
                        apply_attribute(&*dom, node, key, value);
                    }
                    *previous = attributes.into_iter().map(|(key, _)| key).collect();
                    Ok(())
                }, holder)?;
            }
            Binding::Event { name, handler } => {
                let listener = dom.add_event_listener(node, name, Rc::clone(handler));
                holder.push_cleanup(Box::new(move || dom.remove_event_listener(node, listener)));
            }
        }
    }
    Ok(())
}

/// Attach the `use` directives of an element, in order.
pub(crate) fn attach_directives(
    cx: &RenderCtx,
    node: NodeRef,
    directives: &[DirectiveUse],
    holder: &mut Holder,
) -> Result<()> {
    for usage in directives {
        let directive = match &usage.directive {
            DirectiveSource::Inline(directive) => Rc::clone(directive),
            DirectiveSource::Named(name) => cx
                .registry
                .directive(name)
                .cloned()
                .ok_or_else(|| Error::UnknownDirective(name.clone()))?,
        };
        let context = DirectiveContext {
            runtime: &cx.rt,
            dom: &cx.dom,
            element: node,
        };

        let hooks = match &usage.value {
            Source::Static(value) => directive.attach(&context, value.clone(), &usage.args)?,
            Source::Reactive(read) => {
                let update: Rc<OnceCell<Box<dyn Fn(Value)>>> = Rc::new(OnceCell::new());
                let callback = {
                    let runtime = cx.rt.downgrade();
                    let read = Rc::clone(read);
                    let update = Rc::clone(&update);
                    move || {
                        let Some(rt) = Runtime::from_weak(&runtime) else {
                            return;
                        };
                        if let Some(update) = update.get() {
                            update(rt.untrack(|| read()));
                        }
                    }
                };

                let (initial, unsubscribe) = cx.rt.observe_with(callback, || read())?;
                let mut hooks = match directive.attach(&context, initial, &usage.args) {
                    Ok(hooks) => hooks,
                    Err(err) => {
                        unsubscribe.unsubscribe();
                        return Err(err);
                    }
                };
                if let Some(hook) = hooks.update.take() {
                    let _ = update.set(hook);
                }
                if !unsubscribe.is_noop() {
                    holder.push_cleanup(unsubscribe.into_cleanup());
                }
                hooks
            }
        };

        if let Some(destroy) = hooks.destroy {
            holder.push_cleanup(destroy);
        }
        tracing::trace!(directive = ?usage.name(), "directive attached");
    }
    Ok(())
}

/// JavaScript-style truthiness for class maps.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn apply_attribute(dom: &dyn Dom, node: NodeRef, name: &str, value: &Value) {
    match attribute_text(value) {
        Some(text) => dom.set_attribute(node, name, &text),
        None => dom.remove_attribute(node, name),
    }
}

/// Text for an attribute value, or `None` when the attribute is removed.
fn attribute_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::Bool(true) => Some(String::new()),
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        other => Some(other.to_string()),
    }
}

/// Flatten a class value: a string, a nested array, or a map of class name
/// to condition.
fn class_list(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(text) => out.extend(text.split_whitespace().map(str::to_owned)),
        Value::Array(items) => items.iter().for_each(|item| class_list(item, out)),
        Value::Object(map) => out.extend(
            map.iter()
                .filter(|(_, on)| truthy(on))
                .map(|(name, _)| name.clone()),
        ),
        Value::Number(number) => out.push(number.to_string()),
        Value::Null | Value::Bool(_) => {}
    }
}

/// CSS text for one style property. Numbers are lengths in pixels.
fn style_value(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(format!("{number}px")),
        other => Some(other.to_string()),
    }
}

/// What the last style application set.
#[derive(Default)]
struct StyleCache {
    properties: Vec<String>,
    text: bool,
}

impl StyleCache {
    fn apply(&mut self, dom: &dyn Dom, node: NodeRef, value: Value) -> Result<()> {
        match value {
            Value::String(css) => {
                dom.set_style_text(node, &css);
                self.properties.clear();
                self.text = true;
            }
            Value::Null => {
                dom.set_style_text(node, "");
                self.properties.clear();
                self.text = false;
            }
            Value::Object(map) => {
                if std::mem::take(&mut self.text) {
                    dom.set_style_text(node, "");
                }
                for stale in self.properties.iter().filter(|key| !map.contains_key(*key)) {
                    dom.set_style(node, stale, None);
                }
                self.properties.clear();
                for (property, value) in &map {
                    let text = style_value(value);
                    dom.set_style(node, property, text.as_deref());
                    if text.is_some() {
                        self.properties.push(property.clone());
                    }
                }
            }
            other => return Err(Error::InvalidStyle(other.to_string())),
        }
        Ok(())
    }
}
