//! Node materialization.
//!
//! Turns a [`View`] into live nodes at a cursor. Every node and binding
//! created along the way is recorded in the caller's [`Holder`], so the
//! subtree can be destroyed or moved as a unit later.

use std::rc::Rc;

use super::component::{materialize_component, Frame};
use super::holder::{Cursor, Holder};
use super::props::{attach_directives, bind_props, watch};
use super::registry::Registry;
use super::view::{ElementView, View};
use crate::dom::{Dom, NodeRef};
use crate::reactive::Runtime;
use crate::{Error, Result};

/// Receives component failures together with the component ancestry.
pub type ErrorHandler = Rc<dyn Fn(&Error, &str)>;

/// Handler used when none is configured.
pub fn log_error(err: &Error, ancestry: &str) {
    tracing::error!(component = %ancestry, error = %err, "component failed");
}

/// Everything materialization needs besides the view itself.
#[derive(Clone)]
pub(crate) struct RenderCtx {
    pub(crate) rt: Runtime,
    pub(crate) dom: Rc<dyn Dom>,
    pub(crate) registry: Rc<Registry>,
    frame: Option<Rc<Frame>>,
    on_error: ErrorHandler,
}

impl RenderCtx {
    pub(crate) fn new(
        rt: Runtime,
        dom: Rc<dyn Dom>,
        registry: Rc<Registry>,
        on_error: Option<ErrorHandler>,
    ) -> Self {
        let on_error: ErrorHandler = match on_error {
            Some(handler) => handler,
            None => Rc::new(log_error),
        };
        Self {
            rt,
            dom,
            registry,
            frame: None,
            on_error,
        }
    }

    /// A context one component deeper.
    pub(crate) fn enter(&self, name: &str) -> Self {
        Self {
            frame: Some(Frame::new(name, self.frame.clone())),
            ..self.clone()
        }
    }

    pub(crate) fn ancestry(&self) -> String {
        match &self.frame {
            Some(frame) => frame.to_string(),
            None => "<root>".to_owned(),
        }
    }

    pub(crate) fn report(&self, err: &Error) {
        (self.on_error)(err, &self.ancestry());
    }

    /// A detached reporter for callbacks that outlive this context.
    pub(crate) fn reporter(&self) -> Rc<dyn Fn(&Error)> {
        let on_error = Rc::clone(&self.on_error);
        let ancestry = self.ancestry();
        Rc::new(move |err: &Error| on_error(err, &ancestry))
    }

    /// Whether component failures stop at the component boundary.
    pub(crate) fn isolates_errors(&self) -> bool {
        self.rt.config().is_development()
    }
}

/// Materialize `view` at `cursor`, recording what was created in `holder`.
pub(crate) fn materialize(cx: &RenderCtx, view: &View, cursor: &mut Cursor, holder: &mut Holder) -> Result<()> {
    match view {
        View::Text(text) => {
            let node = cx.dom.create_text(text);
            cursor.insert(&*cx.dom, node);
            holder.push_node(node);
        }
        View::Expression(read) => {
            let node = cx.dom.create_text("");
            let dom = Rc::clone(&cx.dom);
            let read = Rc::clone(read);
            watch(cx, move || read(), move |text: String| {
                if dom.text(node).as_deref() != Some(text.as_str()) {
                    dom.set_text(node, &text);
                }
                Ok(())
            }, holder)?;
            cursor.insert(&*cx.dom, node);
            holder.push_node(node);
        }
        View::Fragment(children) => {
            for child in children {
                materialize(cx, child, cursor, holder)?;
            }
        }
        View::Element(element) => materialize_element(cx, element, cursor, holder)?,
        View::Component(component) => materialize_component(cx, component, cursor, holder)?,
        View::Builtin(builtin) => builtin.0.materialize(cx, cursor, holder)?,
    }
    Ok(())
}

fn materialize_element(
    cx: &RenderCtx,
    element: &ElementView,
    cursor: &mut Cursor,
    holder: &mut Holder,
) -> Result<()> {
    let node = cx.dom.create_element(&element.tag);
    if let Some(reference) = &element.reference {
        reference.apply(node);
    }

    let mut inner = Holder::default();
    if let Err(err) = build_element(cx, node, element, &mut inner) {
        inner.destroy(&*cx.dom, false);
        return Err(err);
    }

    cursor.insert(&*cx.dom, node);
    holder.push_node(node);

    // Child nodes leave with the element; only bindings need tearing down.
    if inner.needs_destroy() {
        let dom = Rc::clone(&cx.dom);
        holder.push_cleanup(Box::new(move || {
            let mut inner = inner;
            inner.destroy(&*dom, false);
        }));
    }
    Ok(())
}

fn build_element(cx: &RenderCtx, node: NodeRef, element: &ElementView, inner: &mut Holder) -> Result<()> {
    bind_props(cx, node, &element.bindings, inner)?;

    let mut cursor = Cursor::append(node);
    for child in &element.children {
        materialize(cx, child, &mut cursor, inner)?;
    }

    attach_directives(cx, node, &element.directives, inner)
}
