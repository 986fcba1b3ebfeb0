//! Component Lifecycle
//!
//! # How Components Are Instantiated
//!
//! 1. A root marker (an empty text node) is inserted at the cursor. The
//!    component's nodes always follow it.
//!
//! 2. The props are wrapped in a [`Props`] store. Reactive inputs are
//!    evaluated on every access, so a child that reads a prop inside a
//!    binding reacts to it without knowing it was reactive.
//!
//! 3. The component function runs once, untracked, inside an effect frame.
//!    The frame is popped as soon as the function returns, so effects never
//!    leak into child components.
//!
//! 4. The returned view is materialized into the instance's own holder.
//!
//! 5. The staged effects are started: each runs once and re-runs on change,
//!    disposing of its previous cleanup first.
//!
//! # Failures
//!
//! In development mode a failing component is reported to the error handler
//! with its ancestry and renders nothing; its siblings are unaffected. In
//! production mode the error propagates.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use super::holder::{Cursor, Holder, Instance};
use super::materialize::{materialize, RenderCtx};
use super::registry::{DirectiveUse, Registry};
use super::view::{ComponentSource, ComponentView, PropValue, View};
use crate::dom::{Dom, EventHandler, NodeRef};
use crate::reactive::Cleanup;
use crate::{Error, Result};

/// One level of the component ancestry, kept for diagnostics.
pub struct Frame {
    name: String,
    parent: Option<Rc<Frame>>,
}

impl Frame {
    pub(crate) fn new(name: &str, parent: Option<Rc<Frame>>) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_owned(),
            parent,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(parent) = &self.parent {
            write!(f, "{parent} > ")?;
        }
        f.write_str(&self.name)
    }
}

/// The property store handed to a component.
pub struct Props {
    values: IndexMap<String, PropValue>,
    children: Vec<View>,
    directives: Vec<DirectiveUse>,
    registry: Rc<Registry>,
}

impl Props {
    pub(crate) fn new(
        values: IndexMap<String, PropValue>,
        children: Vec<View>,
        directives: Vec<DirectiveUse>,
        registry: Rc<Registry>,
    ) -> Self {
        Self {
            values,
            children,
            directives,
            registry,
        }
    }

    /// Read a prop. Reactive props are evaluated on every call, and keys
    /// missing from the props fall back to the `bind` object.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self.values.get(key) {
            Some(PropValue::Value(value)) => Some(value.clone()),
            Some(PropValue::Reactive(read)) => Some(read()),
            Some(_) => None,
            None => self.bound(key),
        }
    }

    fn bound(&self, key: &str) -> Option<Value> {
        let bind = match self.values.get("bind")? {
            PropValue::Value(value) => value.clone(),
            PropValue::Reactive(read) => read(),
            _ => return None,
        };
        match bind {
            Value::Object(mut map) => map.remove(key),
            _ => None,
        }
    }

    /// Read a prop as a string.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(text) => Some(text),
            other => Some(other.to_string()),
        }
    }

    /// A reader that evaluates the prop on every call, for use inside
    /// bindings that outlive the component body.
    pub fn reader(&self, key: &str) -> impl Fn() -> Value + 'static {
        let raw = self.values.get(key).cloned();
        move || match &raw {
            Some(PropValue::Value(value)) => value.clone(),
            Some(PropValue::Reactive(read)) => read(),
            _ => Value::Null,
        }
    }

    /// The raw value, for forwarding a prop to a child without reading it.
    pub fn raw(&self, key: &str) -> Option<PropValue> {
        self.values.get(key).cloned()
    }

    pub fn handler(&self, key: &str) -> Option<EventHandler> {
        match self.values.get(key)? {
            PropValue::Handler(handler) => Some(Rc::clone(handler)),
            _ => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// The children given to the component, as one fragment.
    pub fn children(&self) -> View {
        View::Fragment(self.children.clone())
    }

    /// Directives passed with `use`, for the component to place itself.
    pub fn directives(&self) -> &[DirectiveUse] {
        &self.directives
    }

    /// A global value registered at mount time.
    pub fn global(&self, key: &str) -> Option<Value> {
        self.registry.global(key).cloned()
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Props")
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .field("children", &self.children.len())
            .finish()
    }
}

/// A live component.
pub(crate) struct ComponentInstance {
    dom: Rc<dyn Dom>,
    parent: NodeRef,
    marker: NodeRef,
    effects: RefCell<Vec<Cleanup>>,
    holder: RefCell<Holder>,
    destroyed: Cell<bool>,
}

impl ComponentInstance {
    fn new(dom: Rc<dyn Dom>, parent: NodeRef, marker: NodeRef) -> Self {
        Self {
            dom,
            parent,
            marker,
            effects: RefCell::new(Vec::new()),
            holder: RefCell::new(Holder::default()),
            destroyed: Cell::new(false),
        }
    }
}

impl Instance for ComponentInstance {
    fn first(&self) -> NodeRef {
        self.marker
    }

    fn last(&self) -> NodeRef {
        self.holder.borrow().last().unwrap_or(self.marker)
    }

    fn destroy(&self, detach: bool) {
        if self.destroyed.replace(true) {
            return;
        }

        let effects = std::mem::take(&mut *self.effects.borrow_mut());
        for cleanup in effects {
            cleanup();
        }

        let mut holder = std::mem::take(&mut *self.holder.borrow_mut());
        holder.destroy(&*self.dom, detach);

        if detach {
            self.dom.detach(self.marker);
        }
    }

    fn move_after(&self, anchor: NodeRef) -> NodeRef {
        self.dom.insert_after(self.parent, self.marker, Some(anchor));
        self.holder
            .borrow()
            .move_after(&*self.dom, self.parent, self.marker)
    }
}

pub(crate) fn materialize_component(
    cx: &RenderCtx,
    view: &ComponentView,
    cursor: &mut Cursor,
    holder: &mut Holder,
) -> Result<()> {
    let component = match &view.source {
        ComponentSource::Function(component) => component.clone(),
        ComponentSource::Registered(name) => cx
            .registry
            .component(name)
            .cloned()
            .ok_or_else(|| Error::UnknownComponent(name.clone()))?,
    };

    let cx = cx.enter(&view.name);
    let marker = cx.dom.create_text("");
    cursor.insert(&*cx.dom, marker);

    let instance = Rc::new(ComponentInstance::new(
        Rc::clone(&cx.dom),
        cursor.parent,
        marker,
    ));
    let props = Props::new(
        view.props.clone(),
        view.children.clone(),
        view.directives.clone(),
        Rc::clone(&cx.registry),
    );

    let rendered = instantiate(&cx, &view.name, &instance, marker, || {
        cx.rt.untrack(|| component.call(&cx.rt, &props))
    });

    if let Err(err) = rendered {
        if !cx.isolates_errors() {
            cx.dom.detach(marker);
            return Err(err);
        }
        cx.report(&err);
    }

    cursor.advance(instance.last());
    holder.push_instance(instance);
    Ok(())
}

/// Run a component body and fill `instance` with what it rendered.
///
/// On failure everything built so far is torn down and the instance is left
/// empty.
fn instantiate(
    cx: &RenderCtx,
    name: &str,
    instance: &ComponentInstance,
    marker: NodeRef,
    body: impl FnOnce() -> Result<View>,
) -> Result<()> {
    let (view, staged) = cx.rt.stage_effects(body);
    let view = view?;
    if view.is_empty() {
        return Err(Error::EmptyComponent(name.to_owned()));
    }

    let mut holder = Holder::default();
    let mut cursor = Cursor::after(instance.parent, marker);
    if let Err(err) = materialize(cx, &view, &mut cursor, &mut holder) {
        holder.destroy(&*cx.dom, true);
        return Err(err);
    }

    let mut effects = Vec::with_capacity(staged.len());
    for effect in &staged {
        match cx.rt.start_effect(effect) {
            Ok(cleanup) => effects.push(cleanup),
            Err(err) => {
                for cleanup in effects {
                    cleanup();
                }
                holder.destroy(&*cx.dom, true);
                return Err(err);
            }
        }
    }

    *instance.holder.borrow_mut() = holder;
    *instance.effects.borrow_mut() = effects;
    tracing::trace!(component = %cx.ancestry(), effects = staged.len(), "component mounted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::view::reactive;
    use crate::reactive::Runtime;
    use serde_json::json;

    fn props(values: Vec<(&str, PropValue)>) -> Props {
        let mut registry = Registry::default();
        registry.register_global("theme", json!("dark"));
        Props::new(
            values.into_iter().map(|(k, v)| (k.to_owned(), v)).collect(),
            vec![View::from("child")],
            Vec::new(),
            Rc::new(registry),
        )
    }

    #[test]
    fn reactive_props_are_read_on_access() {
        let rt = Runtime::new();
        let count = rt.signal(1);
        let props = props(vec![
            ("label", PropValue::from("hi")),
            ("count", reactive({
                let count = count.clone();
                move || count.get()
            })),
        ]);

        assert_eq!(props.get("count"), Some(json!(1)));
        count.set(2);
        assert_eq!(props.get("count"), Some(json!(2)));
        assert_eq!(props.get_str("label").as_deref(), Some("hi"));
        assert_eq!(props.get("missing"), None);
    }

    #[test]
    fn bind_object_fills_missing_keys() {
        let props = props(vec![
            ("title", PropValue::from("own")),
            ("bind", PropValue::from(json!({ "title": "bound", "size": 3 }))),
        ]);

        assert_eq!(props.get("title"), Some(json!("own")));
        assert_eq!(props.get("size"), Some(json!(3)));
    }

    #[test]
    fn globals_and_children_are_exposed() {
        let props = props(Vec::new());
        assert_eq!(props.global("theme"), Some(json!("dark")));
        assert!(!props.children().is_empty());
    }

    #[test]
    fn frames_render_their_ancestry() {
        let app = Frame::new("App", None);
        let list = Frame::new("List", Some(app));
        let item = Frame::new("Item", Some(list));
        assert_eq!(item.to_string(), "App > List > Item");
        assert_eq!(item.name(), "Item");
    }
}
