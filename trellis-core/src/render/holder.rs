//! Subtree ownership.
//!
//! Every materialized subtree is owned by a [`Holder`]: the live nodes that
//! were inserted at its level plus the cleanups of the bindings created for
//! it. Destroying a holder runs the cleanups, then destroys the children.
//! Compound children (components and control-flow blocks) implement
//! [`Instance`] and destroy their own subtrees.

use std::rc::Rc;

use crate::dom::{Dom, NodeRef};
use crate::reactive::Cleanup;

/// A compound live node.
pub(crate) trait Instance {
    /// The root marker, which leads the instance's nodes.
    fn first(&self) -> NodeRef;

    /// The node currently at the end of the instance.
    fn last(&self) -> NodeRef;

    /// Run cleanups and destroy children. With `detach`, nodes are also
    /// removed from the DOM.
    fn destroy(&self, detach: bool);

    /// Reinsert every node right after `anchor`, in order, and return the new
    /// trailing node.
    fn move_after(&self, anchor: NodeRef) -> NodeRef;
}

pub(crate) enum LiveNode {
    Node(NodeRef),
    Instance(Rc<dyn Instance>),
}

impl LiveNode {
    fn first(&self) -> NodeRef {
        match self {
            LiveNode::Node(node) => *node,
            LiveNode::Instance(instance) => instance.first(),
        }
    }

    fn last(&self) -> NodeRef {
        match self {
            LiveNode::Node(node) => *node,
            LiveNode::Instance(instance) => instance.last(),
        }
    }
}

/// Owned `{ children, cleanups }` of one subtree.
#[derive(Default)]
pub(crate) struct Holder {
    children: Vec<LiveNode>,
    cleanups: Vec<Cleanup>,
}

impl Holder {
    pub(crate) fn push_node(&mut self, node: NodeRef) {
        self.children.push(LiveNode::Node(node));
    }

    pub(crate) fn push_instance(&mut self, instance: Rc<dyn Instance>) {
        self.children.push(LiveNode::Instance(instance));
    }

    pub(crate) fn push_cleanup(&mut self, cleanup: Cleanup) {
        self.cleanups.push(cleanup);
    }

    /// Whether destroying the holder would do anything besides removing
    /// plain nodes.
    pub(crate) fn needs_destroy(&self) -> bool {
        !self.cleanups.is_empty()
            || self
                .children
                .iter()
                .any(|child| matches!(child, LiveNode::Instance(_)))
    }

    pub(crate) fn first(&self) -> Option<NodeRef> {
        self.children.first().map(LiveNode::first)
    }

    pub(crate) fn last(&self) -> Option<NodeRef> {
        self.children.last().map(LiveNode::last)
    }

    /// Run the cleanups in registration order, then destroy the children.
    pub(crate) fn destroy(&mut self, dom: &dyn Dom, detach: bool) {
        for cleanup in self.cleanups.drain(..) {
            cleanup();
        }
        for child in self.children.drain(..) {
            match child {
                LiveNode::Node(node) if detach => dom.detach(node),
                LiveNode::Node(_) => {}
                LiveNode::Instance(instance) => instance.destroy(detach),
            }
        }
    }

    /// Reinsert the children after `anchor`, returning the new trailing node.
    pub(crate) fn move_after(&self, dom: &dyn Dom, parent: NodeRef, mut anchor: NodeRef) -> NodeRef {
        for child in &self.children {
            anchor = match child {
                LiveNode::Node(node) => {
                    dom.insert_after(parent, *node, Some(anchor));
                    *node
                }
                LiveNode::Instance(instance) => instance.move_after(anchor),
            };
        }
        anchor
    }
}

/// Insertion point while materializing.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cursor {
    pub(crate) parent: NodeRef,

    /// Insert after this node, or append when `None`.
    pub(crate) anchor: Option<NodeRef>,
}

impl Cursor {
    pub(crate) fn append(parent: NodeRef) -> Self {
        Self {
            parent,
            anchor: None,
        }
    }

    pub(crate) fn after(parent: NodeRef, anchor: NodeRef) -> Self {
        Self {
            parent,
            anchor: Some(anchor),
        }
    }

    /// Insert `node` and advance past it.
    pub(crate) fn insert(&mut self, dom: &dyn Dom, node: NodeRef) {
        dom.insert_after(self.parent, node, self.anchor);
        self.anchor = Some(node);
    }

    /// Advance past nodes something else inserted.
    pub(crate) fn advance(&mut self, node: NodeRef) {
        self.anchor = Some(node);
    }
}
