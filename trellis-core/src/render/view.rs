//! Node descriptions.
//!
//! A [`View`] describes UI structure before it is materialized. The variant
//! is decided when the value is built, and element properties are classified
//! into typed bindings by [`NodeBuilder::build`], so malformed descriptions
//! fail there instead of at render time.
//!
//! ```rust,ignore
//! let count = rt.signal(0);
//! let view = create_node("button")
//!     .prop("class", "primary")
//!     .on("click", { let count = count.clone(); move |_| count.update(|n| n + 1) })
//!     .child(expression(move || count.get()))
//!     .build()?;
//! ```

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use super::component::Props;
use super::holder::{Cursor, Holder};
use super::materialize::RenderCtx;
use super::registry::DirectiveUse;
use crate::dom::{ElementRef, Event, EventHandler, NodeRef};
use crate::reactive::Runtime;
use crate::{Error, Result};

/// Signature of a component body.
pub type ComponentFn = Rc<dyn Fn(&Runtime, &Props) -> Result<View>>;

/// A named component function.
#[derive(Clone)]
pub struct Component {
    name: Rc<str>,
    func: ComponentFn,
}

impl Component {
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(&Runtime, &Props) -> Result<View> + 'static,
    {
        Self {
            name: Rc::from(name),
            func: Rc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn call(&self, rt: &Runtime, props: &Props) -> Result<View> {
        (self.func)(rt, props)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Component").field(&self.name).finish()
    }
}

/// A node description.
#[derive(Clone)]
pub enum View {
    /// Static text.
    Text(String),

    /// Text recomputed whenever a signal it reads changes.
    Expression(Rc<dyn Fn() -> String>),

    /// A flattened sequence.
    Fragment(Vec<View>),

    /// A platform element.
    Element(Rc<ElementView>),

    /// A user component.
    Component(Rc<ComponentView>),

    /// A control-flow node.
    Builtin(BuiltinView),
}

impl View {
    /// A view that renders nothing.
    pub fn empty() -> Self {
        View::Fragment(Vec::new())
    }

    /// Whether the view renders no nodes at all.
    pub fn is_empty(&self) -> bool {
        match self {
            View::Fragment(children) => children.iter().all(View::is_empty),
            _ => false,
        }
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Text(text) => f.debug_tuple("Text").field(text).finish(),
            View::Expression(_) => f.write_str("Expression"),
            View::Fragment(children) => f.debug_tuple("Fragment").field(children).finish(),
            View::Element(element) => f
                .debug_struct("Element")
                .field("tag", &element.tag)
                .field("children", &element.children)
                .finish(),
            View::Component(component) => f
                .debug_struct("Component")
                .field("name", &component.name)
                .finish(),
            View::Builtin(builtin) => f.debug_tuple("Builtin").field(&builtin.0.name()).finish(),
        }
    }
}

/// Reactive text.
pub fn expression<F, S>(f: F) -> View
where
    F: Fn() -> S + 'static,
    S: ToString,
{
    View::Expression(Rc::new(move || f().to_string()))
}

impl From<&str> for View {
    fn from(text: &str) -> Self {
        View::Text(text.to_owned())
    }
}

impl From<String> for View {
    fn from(text: String) -> Self {
        View::Text(text)
    }
}

macro_rules! view_from_display {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for View {
                fn from(value: $ty) -> Self {
                    View::Text(value.to_string())
                }
            }
        )*
    };
}

view_from_display!(bool, i32, i64, u32, u64, usize, f64);

impl From<Vec<View>> for View {
    fn from(children: Vec<View>) -> Self {
        View::Fragment(children)
    }
}

/// A materializable control-flow node.
pub(crate) trait Builtin {
    fn name(&self) -> &'static str;

    fn materialize(&self, cx: &RenderCtx, cursor: &mut Cursor, holder: &mut Holder) -> Result<()>;
}

/// Opaque handle to a control-flow node.
#[derive(Clone)]
pub struct BuiltinView(pub(crate) Rc<dyn Builtin>);

impl BuiltinView {
    pub(crate) fn new(builtin: impl Builtin + 'static) -> View {
        View::Builtin(Self(Rc::new(builtin)))
    }
}

/// Target of the `ref` property.
#[derive(Clone)]
pub enum RefTarget {
    Element(ElementRef),
    Callback(Rc<dyn Fn(NodeRef)>),
}

impl RefTarget {
    pub(crate) fn apply(&self, node: NodeRef) {
        match self {
            RefTarget::Element(reference) => reference.set(node),
            RefTarget::Callback(callback) => callback(node),
        }
    }
}

/// A property value as given to a builder.
#[derive(Clone)]
pub enum PropValue {
    Value(Value),
    Reactive(Rc<dyn Fn() -> Value>),
    Handler(EventHandler),
    Ref(RefTarget),
    Directives(Vec<DirectiveUse>),
}

/// A property re-evaluated on every read.
pub fn reactive<F, V>(f: F) -> PropValue
where
    F: Fn() -> V + 'static,
    V: Into<Value>,
{
    PropValue::Reactive(Rc::new(move || f().into()))
}

/// An event handler property.
pub fn handler(f: impl Fn(&Event) + 'static) -> PropValue {
    PropValue::Handler(Rc::new(f))
}

/// A `ref` property that calls `f` with the element.
pub fn ref_callback(f: impl Fn(NodeRef) + 'static) -> PropValue {
    PropValue::Ref(RefTarget::Callback(Rc::new(f)))
}

impl From<Value> for PropValue {
    fn from(value: Value) -> Self {
        PropValue::Value(value)
    }
}

macro_rules! prop_from_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for PropValue {
                fn from(value: $ty) -> Self {
                    PropValue::Value(Value::from(value))
                }
            }
        )*
    };
}

prop_from_value!(&str, String, bool, i32, i64, u32, u64, usize, f64);

impl From<ElementRef> for PropValue {
    fn from(reference: ElementRef) -> Self {
        PropValue::Ref(RefTarget::Element(reference))
    }
}

impl From<DirectiveUse> for PropValue {
    fn from(directive: DirectiveUse) -> Self {
        PropValue::Directives(vec![directive])
    }
}

impl From<Vec<DirectiveUse>> for PropValue {
    fn from(directives: Vec<DirectiveUse>) -> Self {
        PropValue::Directives(directives)
    }
}

/// A value that is either fixed or read through a tracked closure.
#[derive(Clone)]
pub(crate) enum Source {
    Static(Value),
    Reactive(Rc<dyn Fn() -> Value>),
}

impl Source {
    fn from_prop(key: &str, value: PropValue) -> Result<Self> {
        match value {
            PropValue::Value(value) => Ok(Source::Static(value)),
            PropValue::Reactive(read) => Ok(Source::Reactive(read)),
            PropValue::Handler(_) => Err(Error::UnexpectedHandler { key: key.to_owned() }),
            PropValue::Ref(_) => Err(Error::InvalidProp {
                key: key.to_owned(),
                reason: "element references are only accepted by `ref`".into(),
            }),
            PropValue::Directives(_) => Err(Error::InvalidProp {
                key: key.to_owned(),
                reason: "directives are only accepted by `use`".into(),
            }),
        }
    }
}

/// An element property after classification.
#[derive(Clone)]
pub(crate) enum Binding {
    Attribute { name: String, source: Source },
    Class(Source),
    Style(Source),
    Bind(Source),
    Event { name: String, handler: EventHandler },
}

/// A plain element description.
pub struct ElementView {
    pub(crate) tag: String,
    pub(crate) reference: Option<RefTarget>,
    pub(crate) bindings: Vec<Binding>,
    pub(crate) directives: Vec<DirectiveUse>,
    pub(crate) children: Vec<View>,
}

impl ElementView {
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

#[derive(Clone)]
pub(crate) enum ComponentSource {
    Function(Component),
    Registered(String),
}

/// A component description.
pub struct ComponentView {
    pub(crate) name: String,
    pub(crate) source: ComponentSource,
    pub(crate) props: IndexMap<String, PropValue>,
    pub(crate) directives: Vec<DirectiveUse>,
    pub(crate) children: Vec<View>,
}

impl ComponentView {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Event name for an event-shaped key: `on:click` or `onClick`.
pub(crate) fn event_name(key: &str) -> Option<String> {
    if let Some(name) = key.strip_prefix("on:") {
        return (!name.is_empty()).then(|| name.to_owned());
    }
    let rest = key.strip_prefix("on")?;
    rest.starts_with(|c: char| c.is_ascii_uppercase())
        .then(|| rest.to_ascii_lowercase())
}

fn check_style(value: &Value) -> Result<()> {
    match value {
        Value::String(_) | Value::Object(_) | Value::Null => Ok(()),
        other => Err(Error::InvalidStyle(other.to_string())),
    }
}

fn check_bind(value: &Value) -> Result<()> {
    match value {
        Value::Object(_) | Value::Null => Ok(()),
        other => Err(Error::InvalidBind(other.to_string())),
    }
}

enum Target {
    Element(String),
    Component(Component),
    Registered(String),
}

/// Builder for element and component descriptions.
pub struct NodeBuilder {
    target: Target,
    props: Vec<(String, PropValue)>,
    children: Vec<View>,
}

/// Start describing an element, or a registered component for `p:name`.
pub fn create_node(tag: &str) -> NodeBuilder {
    let target = match tag.strip_prefix("p:") {
        Some(name) => Target::Registered(name.to_owned()),
        None => Target::Element(tag.to_owned()),
    };
    NodeBuilder {
        target,
        props: Vec::new(),
        children: Vec::new(),
    }
}

/// Start describing a use of `component`.
pub fn create_component(component: &Component) -> NodeBuilder {
    NodeBuilder {
        target: Target::Component(component.clone()),
        props: Vec::new(),
        children: Vec::new(),
    }
}

impl NodeBuilder {
    pub fn prop(mut self, key: &str, value: impl Into<PropValue>) -> Self {
        self.props.push((key.to_owned(), value.into()));
        self
    }

    /// Attach a handler for `event`.
    pub fn on(self, event: &str, f: impl Fn(&Event) + 'static) -> Self {
        self.prop(&format!("on:{event}"), handler(f))
    }

    pub fn child(mut self, child: impl Into<View>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<View>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    /// Classify the properties and produce the description.
    pub fn build(self) -> Result<View> {
        match self.target {
            Target::Element(tag) => build_element(tag, self.props, self.children),
            Target::Component(component) => build_component(
                component.name().to_owned(),
                ComponentSource::Function(component),
                self.props,
                self.children,
            ),
            Target::Registered(name) => build_component(
                name.clone(),
                ComponentSource::Registered(name),
                self.props,
                self.children,
            ),
        }
    }
}

fn build_element(tag: String, props: Vec<(String, PropValue)>, children: Vec<View>) -> Result<View> {
    let mut element = ElementView {
        tag,
        reference: None,
        bindings: Vec::with_capacity(props.len()),
        directives: Vec::new(),
        children,
    };

    for (key, value) in props {
        match key.as_str() {
            "ref" => match value {
                PropValue::Ref(target) => element.reference = Some(target),
                _ => return Err(Error::InvalidRef),
            },
            "use" => match value {
                PropValue::Directives(directives) => element.directives.extend(directives),
                _ => return Err(Error::InvalidDirective),
            },
            "class" => element.bindings.push(Binding::Class(Source::from_prop(&key, value)?)),
            "style" => {
                let source = Source::from_prop(&key, value)?;
                if let Source::Static(value) = &source {
                    check_style(value)?;
                }
                element.bindings.push(Binding::Style(source));
            }
            "bind" => {
                let source = Source::from_prop(&key, value)?;
                if let Source::Static(value) = &source {
                    check_bind(value)?;
                }
                element.bindings.push(Binding::Bind(source));
            }
            _ => match event_name(&key) {
                Some(name) => match value {
                    PropValue::Handler(handler) => {
                        element.bindings.push(Binding::Event { name, handler })
                    }
                    _ => return Err(Error::InvalidHandler { key }),
                },
                None => {
                    let source = Source::from_prop(&key, value)?;
                    element.bindings.push(Binding::Attribute { name: key, source });
                }
            },
        }
    }

    Ok(View::Element(Rc::new(element)))
}

fn build_component(
    name: String,
    source: ComponentSource,
    props: Vec<(String, PropValue)>,
    children: Vec<View>,
) -> Result<View> {
    let mut component = ComponentView {
        name,
        source,
        props: IndexMap::with_capacity(props.len()),
        directives: Vec::new(),
        children,
    };

    for (key, value) in props {
        match (key.as_str(), value) {
            ("use", PropValue::Directives(directives)) => component.directives.extend(directives),
            ("use", _) => return Err(Error::InvalidDirective),
            ("bind", PropValue::Value(value)) => {
                check_bind(&value)?;
                component.props.insert(key, PropValue::Value(value));
            }
            (_, value) => {
                component.props.insert(key, value);
            }
        }
    }

    Ok(View::Component(Rc::new(component)))
}
