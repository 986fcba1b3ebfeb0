//! In-memory DOM.
//!
//! Nodes live in an arena indexed by [`NodeRef`]. Removed nodes stay in the
//! arena, detached, so stale handles never alias new nodes.

use std::cell::{Cell, RefCell};
use std::fmt::Write as _;

use indexmap::IndexMap;
use serde_json::Value;

use super::{Dom, Event, EventHandler, ListenerId, NodeKind, NodeRef};

struct NodeData {
    kind: NodeKind,
    tag: String,
    text: String,
    attributes: IndexMap<String, String>,
    style: IndexMap<String, String>,
    listeners: Vec<(ListenerId, String, EventHandler)>,
    parent: Option<NodeRef>,
    children: Vec<NodeRef>,
}

impl NodeData {
    fn new(kind: NodeKind, tag: &str, text: &str) -> Self {
        Self {
            kind,
            tag: tag.to_owned(),
            text: text.to_owned(),
            attributes: IndexMap::new(),
            style: IndexMap::new(),
            listeners: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

/// A DOM kept entirely in memory.
#[derive(Default)]
pub struct MemoryDom {
    nodes: RefCell<Vec<NodeData>>,
    next_listener: Cell<u64>,
}

impl MemoryDom {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, data: NodeData) -> NodeRef {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(data);
        NodeRef(nodes.len() - 1)
    }

    fn with_node<R>(&self, node: NodeRef, f: impl FnOnce(&mut NodeData) -> R) -> Option<R> {
        self.nodes.borrow_mut().get_mut(node.0).map(f)
    }

    /// Number of nodes ever created.
    pub fn node_count(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn tag(&self, node: NodeRef) -> Option<String> {
        self.nodes
            .borrow()
            .get(node.0)
            .filter(|data| data.kind == NodeKind::Element)
            .map(|data| data.tag.clone())
    }

    pub fn children(&self, node: NodeRef) -> Vec<NodeRef> {
        self.nodes
            .borrow()
            .get(node.0)
            .map(|data| data.children.clone())
            .unwrap_or_default()
    }

    pub fn attribute(&self, node: NodeRef, name: &str) -> Option<String> {
        self.nodes
            .borrow()
            .get(node.0)
            .and_then(|data| data.attributes.get(name).cloned())
    }

    pub fn style(&self, node: NodeRef, property: &str) -> Option<String> {
        self.nodes
            .borrow()
            .get(node.0)
            .and_then(|data| data.style.get(property).cloned())
    }

    pub fn listener_count(&self, node: NodeRef) -> usize {
        self.nodes
            .borrow()
            .get(node.0)
            .map_or(0, |data| data.listeners.len())
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, node: NodeRef) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeRef, out: &mut String) {
        let (kind, text, children) = match self.nodes.borrow().get(node.0) {
            Some(data) => (data.kind, data.text.clone(), data.children.clone()),
            None => return,
        };
        match kind {
            NodeKind::Text => out.push_str(&text),
            NodeKind::Comment => {}
            NodeKind::Element => {
                for child in children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// Invoke every listener registered on `target` for `name`.
    ///
    /// Returns the number of listeners invoked. Handlers may mutate the DOM.
    pub fn dispatch(&self, target: NodeRef, name: &str, detail: Value) -> usize {
        let handlers: Vec<EventHandler> = self
            .nodes
            .borrow()
            .get(target.0)
            .map(|data| {
                data.listeners
                    .iter()
                    .filter(|(_, event, _)| event == name)
                    .map(|(_, _, handler)| handler.clone())
                    .collect()
            })
            .unwrap_or_default();

        let event = Event {
            name: name.to_owned(),
            target,
            detail,
        };
        for handler in &handlers {
            handler(&event);
        }
        handlers.len()
    }

    /// Serialize the children of `node` as markup.
    pub fn inner_html(&self, node: NodeRef) -> String {
        let mut out = String::new();
        for child in self.children(node) {
            self.write_html(child, &mut out);
        }
        out
    }

    /// Serialize `node` and its subtree as markup.
    pub fn to_html(&self, node: NodeRef) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, node: NodeRef, out: &mut String) {
        let nodes = self.nodes.borrow();
        let Some(data) = nodes.get(node.0) else {
            return;
        };

        match data.kind {
            NodeKind::Text => out.push_str(&data.text),
            NodeKind::Comment => {
                let _ = write!(out, "<!--{}-->", data.text);
            }
            NodeKind::Element => {
                out.push('<');
                out.push_str(&data.tag);
                for (name, value) in &data.attributes {
                    let _ = write!(out, " {name}=\"{value}\"");
                }
                if !data.style.is_empty() {
                    let css = data
                        .style
                        .iter()
                        .map(|(property, value)| format!("{property}: {value}"))
                        .collect::<Vec<_>>()
                        .join("; ");
                    let _ = write!(out, " style=\"{css}\"");
                }
                out.push('>');

                let children = data.children.clone();
                let tag = data.tag.clone();
                drop(nodes);

                for child in children {
                    self.write_html(child, out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }
}

impl Dom for MemoryDom {
    fn create_element(&self, tag: &str) -> NodeRef {
        self.push(NodeData::new(NodeKind::Element, tag, ""))
    }

    fn create_text(&self, content: &str) -> NodeRef {
        self.push(NodeData::new(NodeKind::Text, "", content))
    }

    fn create_comment(&self, content: &str) -> NodeRef {
        self.push(NodeData::new(NodeKind::Comment, "", content))
    }

    fn kind(&self, node: NodeRef) -> Option<NodeKind> {
        self.nodes.borrow().get(node.0).map(|data| data.kind)
    }

    fn text(&self, node: NodeRef) -> Option<String> {
        self.nodes
            .borrow()
            .get(node.0)
            .filter(|data| data.kind != NodeKind::Element)
            .map(|data| data.text.clone())
    }

    fn set_text(&self, node: NodeRef, content: &str) {
        self.with_node(node, |data| {
            data.text.clear();
            data.text.push_str(content);
        });
    }

    fn set_attribute(&self, node: NodeRef, name: &str, value: &str) {
        self.with_node(node, |data| {
            data.attributes.insert(name.to_owned(), value.to_owned());
        });
    }

    fn remove_attribute(&self, node: NodeRef, name: &str) {
        self.with_node(node, |data| {
            data.attributes.shift_remove(name);
        });
    }

    fn set_style(&self, node: NodeRef, property: &str, value: Option<&str>) {
        self.with_node(node, |data| match value {
            Some(value) => {
                data.style.insert(property.to_owned(), value.to_owned());
            }
            None => {
                data.style.shift_remove(property);
            }
        });
    }

    fn set_style_text(&self, node: NodeRef, css: &str) {
        self.with_node(node, |data| {
            data.style.clear();
            for declaration in css.split(';') {
                if let Some((property, value)) = declaration.split_once(':') {
                    let property = property.trim();
                    if !property.is_empty() {
                        data.style
                            .insert(property.to_owned(), value.trim().to_owned());
                    }
                }
            }
        });
    }

    fn add_event_listener(&self, node: NodeRef, event: &str, handler: EventHandler) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.with_node(node, |data| {
            data.listeners.push((id, event.to_owned(), handler));
        });
        id
    }

    fn remove_event_listener(&self, node: NodeRef, listener: ListenerId) {
        self.with_node(node, |data| {
            data.listeners.retain(|(id, _, _)| *id != listener);
        });
    }

    fn insert_before(&self, parent: NodeRef, node: NodeRef, reference: Option<NodeRef>) {
        if parent == node {
            return;
        }
        self.detach(node);

        let mut nodes = self.nodes.borrow_mut();
        if node.0 >= nodes.len() {
            return;
        }
        let Some(parent_data) = nodes.get_mut(parent.0) else {
            return;
        };

        let position = reference
            .and_then(|reference| parent_data.children.iter().position(|c| *c == reference))
            .unwrap_or(parent_data.children.len());
        parent_data.children.insert(position, node);
        nodes[node.0].parent = Some(parent);
    }

    fn remove_child(&self, parent: NodeRef, node: NodeRef) {
        let mut nodes = self.nodes.borrow_mut();
        let removed = match nodes.get_mut(parent.0) {
            Some(data) => {
                let before = data.children.len();
                data.children.retain(|child| *child != node);
                before != data.children.len()
            }
            None => false,
        };
        if removed {
            if let Some(data) = nodes.get_mut(node.0) {
                data.parent = None;
            }
        }
    }

    fn parent(&self, node: NodeRef) -> Option<NodeRef> {
        self.nodes.borrow().get(node.0).and_then(|data| data.parent)
    }

    fn next_sibling(&self, node: NodeRef) -> Option<NodeRef> {
        let nodes = self.nodes.borrow();
        let parent = nodes.get(node.0)?.parent?;
        let siblings = &nodes.get(parent.0)?.children;
        let index = siblings.iter().position(|child| *child == node)?;
        siblings.get(index + 1).copied()
    }
}
