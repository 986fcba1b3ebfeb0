//! Memo Implementation
//!
//! A Memo is a derived value that is kept up to date by an observation.
//!
//! # How Memos Work
//!
//! 1. On creation, the memo runs its computation once with the initial
//!    value while tracking, which fixes its dependencies.
//!
//! 2. The result is stored in an internal signal, so reading a memo inside
//!    another observation subscribes to the memo rather than to its inputs.
//!
//! 3. When an input changes, the memo recomputes during the flush and writes
//!    the result into its signal. An unchanged result notifies nobody.
//!
//! Memos are eager: they recompute on every change of an input, whether or
//! not anyone reads them. A memo stops recomputing once its last handle is
//! dropped.

use std::cell::OnceCell;
use std::fmt::{self, Debug};
use std::rc::Rc;

use super::observe::Unsubscribe;
use super::runtime::Runtime;
use super::signal::Signal;
use super::subscriber::SignalId;
use crate::Result;

struct MemoInner<T: 'static> {
    value: Signal<T>,
    subscription: Unsubscribe,
}

impl<T: 'static> Drop for MemoInner<T> {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}

/// A derived value that recomputes when its inputs change.
pub struct Memo<T: 'static> {
    inner: Rc<MemoInner<T>>,
}

impl<T: 'static> Memo<T> {
    /// Get the current value, recording the read.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.get()
    }

    /// Get the current value without recording the read.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.get_untracked()
    }

    /// Borrow the current value, recording the read.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.value.with(f)
    }

    /// The ID of the signal holding the memo's value.
    pub fn id(&self) -> SignalId {
        self.inner.value.id()
    }
}

impl<T: 'static> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Debug + 'static> Debug for Memo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo")
            .field("value", &self.inner.value)
            .finish()
    }
}

impl Runtime {
    /// Create a memo from an initial value and a computation that receives
    /// the previous value.
    pub fn create_memo<T, F>(&self, initial: T, compute: F) -> Result<Memo<T>>
    where
        T: PartialEq + 'static,
        F: Fn(&T) -> T + 'static,
    {
        let compute = Rc::new(compute);
        let slot: Rc<OnceCell<Signal<T>>> = Rc::new(OnceCell::new());

        let callback = {
            let compute = Rc::clone(&compute);
            let slot = Rc::clone(&slot);
            let runtime = self.downgrade();
            move || {
                let (Some(signal), Some(runtime)) = (slot.get(), Runtime::from_weak(&runtime))
                else {
                    return;
                };
                let next = runtime.untrack(|| signal.with_untracked(|previous| compute(previous)));
                signal.set(next);
            }
        };

        let (value, subscription) = self.observe_with(callback, || compute(&initial))?;

        let signal = self.signal(value);
        // Freshly created, so the cell is empty.
        let _ = slot.set(signal.clone());

        Ok(Memo {
            inner: Rc::new(MemoInner {
                value: signal,
                subscription,
            }),
        })
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
