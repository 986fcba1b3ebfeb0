//! Mounting a root component.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use super::component::materialize_component;
use super::holder::{Cursor, Holder};
use super::materialize::{ErrorHandler, RenderCtx};
use super::registry::{DirectiveContext, DirectiveHooks, Plugin, Registry};
use super::view::{Component, ComponentSource, ComponentView, PropValue};
use crate::dom::{Dom, NodeKind, NodeRef};
use crate::reactive::Runtime;
use crate::{Error, Result};

/// Everything `mount` accepts besides the component and its target.
#[derive(Default)]
pub struct MountOptions {
    props: Value,
    registry: Registry,
    error_handler: Option<ErrorHandler>,
}

impl MountOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial props for the root component, as a JSON object.
    pub fn props(mut self, props: Value) -> Self {
        self.props = props;
        self
    }

    pub fn plugin(mut self, plugin: &dyn Plugin) -> Self {
        self.registry.install(plugin);
        self
    }

    pub fn component(mut self, component: Component) -> Self {
        self.registry.register_component(component);
        self
    }

    pub fn directive<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&DirectiveContext<'_>, Value, &[Value]) -> Result<DirectiveHooks> + 'static,
    {
        self.registry.register_directive(name, f);
        self
    }

    pub fn global(mut self, key: &str, value: Value) -> Self {
        self.registry.register_global(key, value);
        self
    }

    /// Receive component failures instead of logging them.
    pub fn error_handler(mut self, handler: impl Fn(&Error, &str) + 'static) -> Self {
        self.error_handler = Some(Rc::new(handler));
        self
    }
}

impl fmt::Debug for MountOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountOptions")
            .field("props", &self.props)
            .field("registry", &self.registry)
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}

/// A mounted component tree.
pub struct MountHandle {
    dom: Rc<dyn Dom>,
    holder: RefCell<Holder>,
    destroyed: Cell<bool>,
}

impl MountHandle {
    /// Tear the tree down: run every cleanup and remove every node.
    ///
    /// Calling it again does nothing.
    pub fn destroy(&self) {
        if self.destroyed.replace(true) {
            return;
        }
        let mut holder = std::mem::take(&mut *self.holder.borrow_mut());
        holder.destroy(&*self.dom, true);
        tracing::debug!("tree unmounted");
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }
}

impl fmt::Debug for MountHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountHandle")
            .field("destroyed", &self.destroyed.get())
            .finish()
    }
}

/// Render `component` at the end of `target`.
///
/// # Errors
///
/// [`Error::InvalidTarget`] when `target` is not an element, and
/// [`Error::InvalidProp`] when the props are not an object. Component
/// failures propagate only in production mode.
pub fn mount(
    rt: &Runtime,
    dom: Rc<dyn Dom>,
    component: &Component,
    target: NodeRef,
    options: MountOptions,
) -> Result<MountHandle> {
    if dom.kind(target) != Some(NodeKind::Element) {
        return Err(Error::InvalidTarget);
    }

    let props: IndexMap<String, PropValue> = match options.props {
        Value::Object(map) => map
            .into_iter()
            .map(|(key, value)| (key, PropValue::Value(value)))
            .collect(),
        Value::Null => IndexMap::new(),
        other => {
            return Err(Error::InvalidProp {
                key: "props".into(),
                reason: format!("expected an object, got {other}"),
            })
        }
    };

    let view = ComponentView {
        name: component.name().to_owned(),
        source: ComponentSource::Function(component.clone()),
        props,
        directives: Vec::new(),
        children: Vec::new(),
    };

    let cx = RenderCtx::new(
        rt.clone(),
        Rc::clone(&dom),
        Rc::new(options.registry),
        options.error_handler,
    );
    let mut holder = Holder::default();
    materialize_component(&cx, &view, &mut Cursor::append(target), &mut holder)?;

    tracing::debug!(component = component.name(), mode = ?rt.config().mode, "tree mounted");
    Ok(MountHandle {
        dom,
        holder: RefCell::new(holder),
        destroyed: Cell::new(false),
    })
}
