//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which observations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read while the runtime is tracking, the signal adds
//!    its dependency record to the tracking context.
//!
//! 2. When a signal's value changes, the new value is compared with the old
//!    one. Equal values stop here.
//!
//! 3. Otherwise the dependency record is handed to the scheduler, which runs
//!    the subscribers on the next tick.
//!
//! # Memory Layout
//!
//! Each signal consists of:
//! - A weak reference to its runtime
//! - The dependency record (ID plus subscribers)
//! - The value and its equality predicate

use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::rc::{Rc, Weak};

use super::runtime::{Runtime, RuntimeInner};
use super::subscriber::{DependencyRecord, SignalId};

/// Decides whether a write changes a signal's value.
pub enum Equality<T> {
    /// Every write notifies, even of an identical value.
    Never,

    /// Writes equal to the current value under the predicate are ignored.
    Custom(Rc<dyn Fn(&T, &T) -> bool>),
}

impl<T> Equality<T> {
    /// Use a custom predicate.
    pub fn custom(predicate: impl Fn(&T, &T) -> bool + 'static) -> Self {
        Self::Custom(Rc::new(predicate))
    }

    fn is_equal(&self, previous: &T, next: &T) -> bool {
        match self {
            Self::Never => false,
            Self::Custom(predicate) => predicate(previous, next),
        }
    }
}

impl<T: PartialEq + 'static> Default for Equality<T> {
    fn default() -> Self {
        Self::Custom(Rc::new(|a: &T, b: &T| a == b))
    }
}

impl<T> Clone for Equality<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Never => Self::Never,
            Self::Custom(predicate) => Self::Custom(Rc::clone(predicate)),
        }
    }
}

struct SignalState<T> {
    runtime: Weak<RuntimeInner>,
    record: Rc<DependencyRecord>,
    value: RefCell<T>,
    equality: Equality<T>,
}

/// A reactive signal holding a value of type `T`.
///
/// # Example
///
/// ```rust,ignore
/// let rt = Runtime::new();
/// let count = rt.signal(0);
///
/// // Read the value
/// let value = count.get();
///
/// // Update the value (notifies subscribers on the next tick)
/// count.set(5);
/// ```
pub struct Signal<T: 'static> {
    state: Rc<SignalState<T>>,
}

impl<T: 'static> Signal<T> {
    pub(crate) fn new(runtime: &Runtime, value: T, equality: Equality<T>) -> Self {
        let id = runtime.inner().next_signal_id();
        Self {
            state: Rc::new(SignalState {
                runtime: runtime.downgrade(),
                record: Rc::new(DependencyRecord::new(id)),
                value: RefCell::new(value),
                equality,
            }),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> SignalId {
        self.state.record.signal()
    }

    fn track(&self) {
        if let Some(runtime) = self.state.runtime.upgrade() {
            runtime.tracking.track(&self.state.record);
        }
    }

    /// Get the current value.
    ///
    /// If the runtime is tracking, the read is recorded.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.track();
        self.get_untracked()
    }

    /// Get the current value without recording the read.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.state.value.borrow().clone()
    }

    /// Borrow the current value, recording the read.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        self.with_untracked(f)
    }

    /// Borrow the current value without recording the read.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.state.value.borrow())
    }

    /// Set a new value and notify subscribers if it differs.
    pub fn set(&self, value: T) {
        let unchanged = self
            .state
            .equality
            .is_equal(&self.state.value.borrow(), &value);
        if unchanged {
            return;
        }

        *self.state.value.borrow_mut() = value;

        if let Some(runtime) = self.state.runtime.upgrade() {
            runtime.scheduler.notify(&self.state.record);
        }
    }

    /// Update the value from the previous one.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.state.value.borrow());
        self.set(next);
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.state.record.len()
    }

    /// A read-only handle to the same signal.
    pub fn read_only(&self) -> ReadSignal<T> {
        ReadSignal(self.clone())
    }

    /// Split into a getter and a setter.
    pub fn split(self) -> (ReadSignal<T>, WriteSignal<T>) {
        (ReadSignal(self.clone()), WriteSignal(self))
    }
}

impl<T: 'static> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T: Debug + 'static> Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id())
            .field("value", &*self.state.value.borrow())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// The getter half of a signal.
pub struct ReadSignal<T: 'static>(Signal<T>);

impl<T: 'static> ReadSignal<T> {
    pub fn id(&self) -> SignalId {
        self.0.id()
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.0.get()
    }

    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.0.get_untracked()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.0.with(f)
    }
}

impl<T: 'static> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Debug + 'static> Debug for ReadSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The setter half of a signal.
pub struct WriteSignal<T: 'static>(Signal<T>);

impl<T: 'static> WriteSignal<T> {
    pub fn set(&self, value: T) {
        self.0.set(value);
    }

    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        self.0.update(f);
    }
}

impl<T: 'static> Clone for WriteSignal<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
