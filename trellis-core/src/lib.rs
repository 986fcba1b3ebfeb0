//! Trellis Core
//!
//! This crate provides the runtime for the Trellis fine-grained reactive UI
//! library. It implements:
//!
//! - Reactive primitives (signals, observations, memos, effects)
//! - A batch scheduler with bounded, deduplicated flushes
//! - Node materialization bound directly to signals, without diffing
//! - Component lifecycle and control flow (`each`, `case`, `portal`, `slot`)
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Signals, dependency tracking, and the scheduler
//! - `render`: Node descriptions, materialization, components, control flow
//! - `dom`: The platform boundary and an in-memory implementation
//! - `config`: Runtime configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use std::rc::Rc;
//! use trellis_core::dom::{Dom, MemoryDom};
//! use trellis_core::render::{create_node, expression, mount, Component, MountOptions};
//! use trellis_core::Runtime;
//!
//! let rt = Runtime::new();
//! let dom = Rc::new(MemoryDom::new());
//! let root = dom.create_element("div");
//!
//! let (count, set_count) = rt.create_signal(0);
//! let app = Component::new("App", move |_, _| {
//!     let count = count.clone();
//!     create_node("span").child(expression(move || count.get())).build()
//! });
//!
//! let _handle = mount(&rt, dom.clone(), &app, root, MountOptions::new())?;
//! set_count.set(5);
//! rt.tick();
//! assert_eq!(dom.text_content(root), "5");
//! ```

pub mod config;
pub mod dom;
pub mod reactive;
pub mod render;

mod error;

pub use config::{Mode, RuntimeConfig};
pub use error::{Error, Result};
pub use reactive::{Memo, ReadSignal, Runtime, Signal, Unsubscribe, WriteSignal};
