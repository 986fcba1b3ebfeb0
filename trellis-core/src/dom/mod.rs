//! Platform boundary.
//!
//! The renderer never touches a concrete DOM. Everything it needs is behind
//! the [`Dom`] trait: node creation, attributes, styles, listeners, and
//! insertion. [`MemoryDom`] implements it in memory for headless rendering
//! and tests.
//!
//! Node handles are plain [`NodeRef`] indices; the implementation owns the
//! nodes.

mod memory;

pub use memory::MemoryDom;

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

/// Handle to a platform node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(pub(crate) usize);

impl NodeRef {
    /// Get the raw index.
    pub fn raw(&self) -> usize {
        self.0
    }
}

/// Handle to a registered event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    Comment,
}

/// An event delivered to a listener.
#[derive(Debug, Clone)]
pub struct Event {
    pub name: String,
    pub target: NodeRef,
    pub detail: Value,
}

/// Callback attached to an element for one event name.
pub type EventHandler = Rc<dyn Fn(&Event)>;

/// Capabilities the renderer requires from the platform.
///
/// Operations on handles the implementation does not know are ignored.
pub trait Dom {
    fn create_element(&self, tag: &str) -> NodeRef;

    fn create_text(&self, content: &str) -> NodeRef;

    fn create_comment(&self, content: &str) -> NodeRef;

    fn kind(&self, node: NodeRef) -> Option<NodeKind>;

    /// Content of a text or comment node.
    fn text(&self, node: NodeRef) -> Option<String>;

    fn set_text(&self, node: NodeRef, content: &str);

    fn set_attribute(&self, node: NodeRef, name: &str, value: &str);

    fn remove_attribute(&self, node: NodeRef, name: &str);

    /// Set one style property, or remove it with `None`.
    fn set_style(&self, node: NodeRef, property: &str, value: Option<&str>);

    /// Replace the whole inline style with a CSS declaration list.
    fn set_style_text(&self, node: NodeRef, css: &str);

    fn add_event_listener(&self, node: NodeRef, event: &str, handler: EventHandler) -> ListenerId;

    fn remove_event_listener(&self, node: NodeRef, listener: ListenerId);

    /// Insert `node` into `parent` before `reference`, or at the end when
    /// `reference` is `None`. A node that already has a parent is moved.
    fn insert_before(&self, parent: NodeRef, node: NodeRef, reference: Option<NodeRef>);

    fn remove_child(&self, parent: NodeRef, node: NodeRef);

    fn parent(&self, node: NodeRef) -> Option<NodeRef>;

    fn next_sibling(&self, node: NodeRef) -> Option<NodeRef>;

    /// Insert `node` right after `anchor`, or at the end when `anchor` is
    /// `None`.
    fn insert_after(&self, parent: NodeRef, node: NodeRef, anchor: Option<NodeRef>) {
        match anchor {
            Some(anchor) => {
                let reference = self.next_sibling(anchor);
                // Moving the anchor's own successor after the anchor is a no-op.
                if reference != Some(node) {
                    self.insert_before(parent, node, reference);
                }
            }
            None => self.insert_before(parent, node, None),
        }
    }

    /// Detach `node` from whatever parent it has.
    fn detach(&self, node: NodeRef) {
        if let Some(parent) = self.parent(node) {
            self.remove_child(parent, node);
        }
    }
}

/// A cell that receives an element once it is created.
#[derive(Clone, Default)]
pub struct ElementRef(Rc<Cell<Option<NodeRef>>>);

impl ElementRef {
    /// The element, once materialized.
    pub fn get(&self) -> Option<NodeRef> {
        self.0.get()
    }

    pub(crate) fn set(&self, node: NodeRef) {
        self.0.set(Some(node));
    }
}

impl fmt::Debug for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ElementRef").field(&self.get()).finish()
    }
}

/// Create an empty element reference for the `ref` prop.
pub fn create_ref() -> ElementRef {
    ElementRef::default()
}
