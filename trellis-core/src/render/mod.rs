//! Rendering
//!
//! This module turns node descriptions into live DOM nodes and keeps them in
//! sync with the signals they read.
//!
//! # Concepts
//!
//! ## Views
//!
//! A [`View`] describes structure: text, reactive text, fragments, elements,
//! components, and control-flow nodes. Views are built with
//! [`create_node`] and [`create_component`] and validated when built.
//!
//! ## Materialization
//!
//! Materializing a view creates its nodes once. Every reactive read made
//! while doing so becomes an observation that patches exactly the node it
//! belongs to. There is no diffing.
//!
//! ## Ownership
//!
//! Every subtree is owned by a holder of live nodes and cleanups. Destroying
//! a component, a list entry, or a conditional branch destroys its holder.
//!
//! # Example
//!
//! ```rust,ignore
//! let rt = Runtime::new();
//! let dom = Rc::new(MemoryDom::new());
//! let root = dom.create_element("div");
//!
//! let app = Component::new("App", |rt, _| {
//!     let count = rt.signal(0);
//!     create_node("span").child(expression(move || count.get())).build()
//! });
//! let handle = mount(&rt, dom.clone(), &app, root, MountOptions::new())?;
//! ```

mod component;
mod control;
mod holder;
mod materialize;
mod mount;
mod props;
mod registry;
mod view;

pub use component::{Frame, Props};
pub use control::{case, comment, each, portal, slot, slot_with, Branch, Each};
pub use materialize::{log_error, ErrorHandler};
pub use mount::{mount, MountHandle, MountOptions};
pub use registry::{
    directive, directive_from, use_directive, Directive, DirectiveContext, DirectiveHooks,
    DirectiveUse, Plugin, Registry,
};
pub use view::{
    create_component, create_node, expression, handler, reactive, ref_callback, BuiltinView,
    Component, ComponentFn, ComponentView, ElementView, NodeBuilder, PropValue, RefTarget, View,
};
