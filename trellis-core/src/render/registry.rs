//! Named components, directives and global values.
//!
//! A [`Registry`] is filled before mounting, directly or through plugins,
//! and is read-only afterwards. `p:name` tags resolve against its
//! components, [`use_directive`] against its directives, and
//! [`Props::global`](super::Props::global) against its globals.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use super::view::{Component, PropValue, Source, View};
use crate::dom::{Dom, NodeRef};
use crate::reactive::{Cleanup, Runtime};
use crate::Result;

/// What a directive hands back after attaching to an element.
#[derive(Default)]
pub struct DirectiveHooks {
    /// Called with the new value whenever a reactive directive value changes.
    pub update: Option<Box<dyn Fn(Value)>>,

    /// Called when the element's owner is destroyed.
    pub destroy: Option<Cleanup>,
}

impl DirectiveHooks {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn on_update(mut self, f: impl Fn(Value) + 'static) -> Self {
        self.update = Some(Box::new(f));
        self
    }

    pub fn on_destroy(mut self, f: impl FnOnce() + 'static) -> Self {
        self.destroy = Some(Box::new(f));
        self
    }
}

/// What a directive receives when it attaches.
pub struct DirectiveContext<'a> {
    pub runtime: &'a Runtime,
    pub dom: &'a Rc<dyn Dom>,
    pub element: NodeRef,
}

/// Reusable imperative behavior attached to an element with `use`.
pub trait Directive {
    fn attach(&self, cx: &DirectiveContext<'_>, value: Value, args: &[Value]) -> Result<DirectiveHooks>;
}

impl<F> Directive for F
where
    F: Fn(&DirectiveContext<'_>, Value, &[Value]) -> Result<DirectiveHooks>,
{
    fn attach(&self, cx: &DirectiveContext<'_>, value: Value, args: &[Value]) -> Result<DirectiveHooks> {
        self(cx, value, args)
    }
}

#[derive(Clone)]
pub(crate) enum DirectiveSource {
    Inline(Rc<dyn Directive>),
    Named(String),
}

/// One directive application: the directive, its value, and extra arguments.
#[derive(Clone)]
pub struct DirectiveUse {
    pub(crate) directive: DirectiveSource,
    pub(crate) value: Source,
    pub(crate) args: Vec<Value>,
}

impl DirectiveUse {
    /// Set the value. A reactive value drives the `update` hook.
    pub fn value(mut self, value: impl Into<PropValue>) -> Result<Self> {
        self.value = match value.into() {
            PropValue::Value(value) => Source::Static(value),
            PropValue::Reactive(read) => Source::Reactive(read),
            _ => return Err(crate::Error::InvalidDirective),
        };
        Ok(self)
    }

    /// Append an extra argument.
    pub fn arg(mut self, arg: impl Into<Value>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub(crate) fn name(&self) -> Option<&str> {
        match &self.directive {
            DirectiveSource::Named(name) => Some(name),
            DirectiveSource::Inline(_) => None,
        }
    }
}

impl fmt::Debug for DirectiveUse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectiveUse")
            .field("name", &self.name())
            .field("args", &self.args)
            .finish()
    }
}

/// Apply an inline directive.
pub fn directive<F>(f: F) -> DirectiveUse
where
    F: Fn(&DirectiveContext<'_>, Value, &[Value]) -> Result<DirectiveHooks> + 'static,
{
    directive_from(Rc::new(f))
}

/// Apply a directive object.
pub fn directive_from(directive: Rc<dyn Directive>) -> DirectiveUse {
    DirectiveUse {
        directive: DirectiveSource::Inline(directive),
        value: Source::Static(Value::Null),
        args: Vec::new(),
    }
}

/// Apply a directive registered under `name`.
pub fn use_directive(name: &str) -> DirectiveUse {
    DirectiveUse {
        directive: DirectiveSource::Named(name.to_owned()),
        value: Source::Static(Value::Null),
        args: Vec::new(),
    }
}

/// Something that fills a registry.
pub trait Plugin {
    fn install(&self, registry: &mut Registry);
}

impl<F: Fn(&mut Registry)> Plugin for F {
    fn install(&self, registry: &mut Registry) {
        self(registry)
    }
}

/// Name tables consulted while rendering.
#[derive(Default)]
pub struct Registry {
    components: IndexMap<String, Component>,
    directives: IndexMap<String, Rc<dyn Directive>>,
    globals: IndexMap<String, Value>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component under its own name.
    pub fn register_component(&mut self, component: Component) -> &mut Self {
        self.components
            .insert(component.name().to_owned(), component);
        self
    }

    /// Register a component under its name and return a `p:name` view for
    /// it with no props.
    pub fn register_component_view(&mut self, component: Component) -> Result<View> {
        let tag = format!("p:{}", component.name());
        self.register_component(component);
        super::view::create_node(&tag).build()
    }

    pub fn register_directive<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(&DirectiveContext<'_>, Value, &[Value]) -> Result<DirectiveHooks> + 'static,
    {
        self.register_directive_object(name, Rc::new(f))
    }

    pub fn register_directive_object(&mut self, name: &str, directive: Rc<dyn Directive>) -> &mut Self {
        self.directives.insert(name.to_owned(), directive);
        self
    }

    pub fn register_global(&mut self, key: &str, value: Value) -> &mut Self {
        self.globals.insert(key.to_owned(), value);
        self
    }

    pub fn install(&mut self, plugin: &dyn Plugin) -> &mut Self {
        plugin.install(self);
        self
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.get(name)
    }

    pub fn directive(&self, name: &str) -> Option<&Rc<dyn Directive>> {
        self.directives.get(name)
    }

    pub fn global(&self, key: &str) -> Option<&Value> {
        self.globals.get(key)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .field("directives", &self.directives.keys().collect::<Vec<_>>())
            .field("globals", &self.globals)
            .finish()
    }
}
