//! Reactive Primitives
//!
//! This module implements the core reactive system: signals, observations,
//! the batch scheduler, memos, and effects.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal is read while an
//! observation is tracking, it records itself as a dependency. When its value
//! changes, its subscribers are scheduled.
//!
//! ## Observations
//!
//! An observation runs a trigger once while tracking and subscribes a
//! callback to every signal the trigger read. Every binding in the renderer
//! is an observation.
//!
//! ## Scheduler
//!
//! Notifications are batched. Subscribers run when the host calls
//! [`Runtime::tick`], at most once each per flush.
//!
//! ## Memos and Effects
//!
//! A Memo is a derived value backed by its own signal. An Effect is a
//! side-effecting computation owned by a component, with optional cleanup.
//!
//! # Implementation Notes
//!
//! Everything here is single-threaded and uses `Rc`/`RefCell`. All mutable
//! reactive state hangs off a [`Runtime`] value instead of globals.

mod context;
mod effect;
mod memo;
mod observe;
mod runtime;
mod scheduler;
mod signal;
mod subscriber;

pub use effect::{Cleanup, Effect, IntoCleanup};
pub use memo::Memo;
pub use observe::Unsubscribe;
pub use runtime::Runtime;
pub use scheduler::{FlushReport, FlushState};
pub use signal::{Equality, ReadSignal, Signal, WriteSignal};
pub use subscriber::{SignalId, Subscriber, SubscriberId};
