//! Effect Implementation
//!
//! An Effect is a side-effecting computation that belongs to a component.
//!
//! # How Effects Work
//!
//! 1. A component body calls [`Runtime::create_effect`]. The effect does not
//!    run yet; it is staged on the component's frame.
//!
//! 2. Once the component body returns, the renderer takes the staged effects
//!    and starts each one: it runs once while tracking, which fixes its
//!    dependencies.
//!
//! 3. When any dependency changes, the effect re-runs in the next flush.
//!    Before re-running, the cleanup returned by the previous run is called.
//!
//! 4. When the component is destroyed the effect is unsubscribed and its
//!    last cleanup runs.
//!
//! # Cleanup
//!
//! Effects may return a cleanup: `()` for none, or `Some(closure)`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::runtime::Runtime;
use crate::{Error, Result};

/// A deferred teardown action.
pub type Cleanup = Box<dyn FnOnce()>;

/// Values an effect may return.
pub trait IntoCleanup {
    fn into_cleanup(self) -> Option<Cleanup>;
}

impl IntoCleanup for () {
    fn into_cleanup(self) -> Option<Cleanup> {
        None
    }
}

impl<F: FnOnce() + 'static> IntoCleanup for Option<F> {
    fn into_cleanup(self) -> Option<Cleanup> {
        self.map(|f| Box::new(f) as Cleanup)
    }
}

/// A side-effecting computation owned by a component.
pub struct Effect {
    run: Box<dyn Fn() -> Option<Cleanup>>,

    /// Cleanup returned by the last run.
    cleanup: RefCell<Option<Cleanup>>,

    /// Whether the effect has been disposed.
    disposed: Cell<bool>,

    /// Number of times the effect has run.
    run_count: Cell<usize>,
}

impl Effect {
    pub(crate) fn new<F, C>(run: F) -> Rc<Self>
    where
        F: Fn() -> C + 'static,
        C: IntoCleanup,
    {
        Rc::new(Self {
            run: Box::new(move || run().into_cleanup()),
            cleanup: RefCell::new(None),
            disposed: Cell::new(false),
            run_count: Cell::new(0),
        })
    }

    /// Run the previous cleanup, then the effect body.
    pub(crate) fn execute(&self) {
        if self.disposed.get() {
            return;
        }

        let previous = self.cleanup.borrow_mut().take();
        if let Some(cleanup) = previous {
            cleanup();
        }

        let next = (self.run)();
        *self.cleanup.borrow_mut() = next;
        self.run_count.set(self.run_count.get() + 1);
    }

    /// Stop the effect and run its last cleanup.
    pub(crate) fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        let cleanup = self.cleanup.borrow_mut().take();
        if let Some(cleanup) = cleanup {
            cleanup();
        }
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.run_count.get()
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("disposed", &self.disposed.get())
            .field("run_count", &self.run_count.get())
            .finish()
    }
}

impl Runtime {
    /// Stage an effect on the component whose body is running.
    ///
    /// # Errors
    ///
    /// [`Error::EffectOutsideComponent`] when no component body is running.
    pub fn create_effect<F, C>(&self, f: F) -> Result<()>
    where
        F: Fn() -> C + 'static,
        C: IntoCleanup,
    {
        let mut frames = self.inner().staged_effects.borrow_mut();
        let frame = frames.last_mut().ok_or(Error::EffectOutsideComponent)?;
        frame.push(Effect::new(f));
        Ok(())
    }

    /// Run `body` with a fresh effect frame and return the effects it staged.
    pub(crate) fn stage_effects<T>(&self, body: impl FnOnce() -> T) -> (T, Vec<Rc<Effect>>) {
        self.inner().staged_effects.borrow_mut().push(Vec::new());
        let value = body();
        let staged = self
            .inner()
            .staged_effects
            .borrow_mut()
            .pop()
            .unwrap_or_default();
        (value, staged)
    }

    /// Run the effect once while tracking and subscribe it to what it read.
    ///
    /// The returned handle unsubscribes the effect and runs its last cleanup.
    pub(crate) fn start_effect(&self, effect: &Rc<Effect>) -> Result<Cleanup> {
        let tracked = Rc::clone(effect);
        let ((), unsubscribe) = self.observe(move || tracked.execute())?;
        let effect = Rc::clone(effect);
        Ok(Box::new(move || {
            unsubscribe.unsubscribe();
            effect.dispose();
        }))
    }
}
