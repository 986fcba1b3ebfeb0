//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects signals,
//! observations, and effects. It owns the state that a reactive system
//! needs exactly one of: the tracking context, the batch scheduler, the ID
//! counters, and the staging buffer for component effects.
//!
//! # How It Works
//!
//! 1. Signals are created through the runtime and keep a weak reference to
//!    it.
//!
//! 2. When an observation runs its tracked function, every signal read
//!    inserts its dependency record into the tracking context.
//!
//! 3. When a signal's value changes, it hands its record to the scheduler,
//!    which runs the subscribers on the next [`Runtime::tick`].
//!
//! # Threading
//!
//! A runtime is single-threaded (`!Send`). Independent runtimes share no
//! state, so several applications can live side by side.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::context::TrackingContext;
use super::effect::Effect;
use super::scheduler::{FlushReport, FlushState, Scheduler};
use super::signal::{Equality, ReadSignal, Signal, WriteSignal};
use super::subscriber::{SignalId, SubscriberId};
use crate::config::RuntimeConfig;

/// Handle to a reactive runtime. Cloning is cheap and shares the runtime.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

pub(crate) struct RuntimeInner {
    config: RuntimeConfig,
    next_signal: Cell<u64>,
    next_subscriber: Cell<u64>,
    pub(crate) tracking: TrackingContext,
    pub(crate) scheduler: Scheduler,
    /// One frame per component body currently executing.
    pub(crate) staged_effects: RefCell<Vec<Vec<Rc<Effect>>>>,
}

impl RuntimeInner {
    pub(crate) fn next_signal_id(&self) -> SignalId {
        let id = self.next_signal.get();
        self.next_signal.set(id + 1);
        SignalId(id)
    }

    pub(crate) fn next_subscriber_id(&self) -> SubscriberId {
        let id = self.next_subscriber.get();
        self.next_subscriber.set(id + 1);
        SubscriberId(id)
    }
}

impl Runtime {
    /// Create a runtime with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a runtime with the given configuration.
    pub fn with_config(config: RuntimeConfig) -> Self {
        let scheduler = Scheduler::new(config.max_flush_passes);
        Self {
            inner: Rc::new(RuntimeInner {
                config,
                next_signal: Cell::new(0),
                next_subscriber: Cell::new(0),
                tracking: TrackingContext::default(),
                scheduler,
                staged_effects: RefCell::new(Vec::new()),
            }),
        }
    }

    pub(crate) fn inner(&self) -> &RuntimeInner {
        &self.inner
    }

    pub(crate) fn downgrade(&self) -> Weak<RuntimeInner> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn from_weak(weak: &Weak<RuntimeInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// The configuration this runtime was built with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Create a signal compared with `PartialEq`, returned as a getter and a
    /// setter.
    pub fn create_signal<T>(&self, initial: T) -> (ReadSignal<T>, WriteSignal<T>)
    where
        T: PartialEq + 'static,
    {
        self.signal(initial).split()
    }

    /// Create a signal with an explicit equality predicate.
    pub fn create_signal_with<T: 'static>(
        &self,
        initial: T,
        equality: Equality<T>,
    ) -> (ReadSignal<T>, WriteSignal<T>) {
        Signal::new(self, initial, equality).split()
    }

    /// Create a signal compared with `PartialEq`, as a single read/write
    /// handle.
    pub fn signal<T>(&self, initial: T) -> Signal<T>
    where
        T: PartialEq + 'static,
    {
        Signal::new(self, initial, Equality::default())
    }

    /// Run `f` without recording the signals it reads.
    pub fn untrack<T>(&self, f: impl FnOnce() -> T) -> T {
        self.inner.tracking.untracked(f)
    }

    /// Run `f` with every notification delivered immediately instead of at
    /// the next tick.
    pub fn without_batch<T>(&self, f: impl FnOnce() -> T) -> T {
        self.inner.scheduler.unbatched(f)
    }

    /// Run the pending flush, if any. This is the microtask boundary: a
    /// host calls it once the current synchronous work is done.
    pub fn tick(&self) -> Option<FlushReport> {
        self.inner.scheduler.flush()
    }

    /// Whether a flush is scheduled.
    pub fn flush_state(&self) -> FlushState {
        self.inner.scheduler.state()
    }

    /// Number of flushes that hit the pass cap and dropped updates.
    pub fn flush_overflows(&self) -> u64 {
        self.inner.scheduler.overflows()
    }

    /// Check if a tracking context is active.
    pub fn is_tracking(&self) -> bool {
        self.inner.tracking.is_active()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.inner.config)
            .field("flush_state", &self.flush_state())
            .field("flush_overflows", &self.flush_overflows())
            .finish()
    }
}
