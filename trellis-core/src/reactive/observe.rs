//! Observation bindings.
//!
//! An observation runs a function once while tracking, then subscribes a
//! callback to every signal the function read. The dependency set is fixed
//! at that first run: later invocations of the callback are not tracked.
//!
//! ```rust,ignore
//! let rt = Runtime::new();
//! let name = rt.signal(String::from("a"));
//!
//! let (initial, unsubscribe) = rt.observe_with(
//!     move || println!("changed"),
//!     { let name = name.clone(); move || name.get() },
//! )?;
//! ```

use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use super::effect::Cleanup;
use super::runtime::Runtime;
use super::subscriber::{DependencyRecord, Subscriber, SubscriberId};
use crate::Result;

/// Removes an observation's subscriber from every record it joined.
///
/// Calling it more than once is harmless. Dropping it without calling it
/// leaves the subscription in place.
#[must_use = "dropping an Unsubscribe keeps the observation alive"]
#[derive(Default)]
pub struct Unsubscribe {
    id: Option<SubscriberId>,
    records: SmallVec<[Weak<DependencyRecord>; 2]>,
}

impl Unsubscribe {
    /// Detach the subscriber.
    pub fn unsubscribe(&self) {
        let Some(id) = self.id else { return };
        for record in self.records.iter().filter_map(Weak::upgrade) {
            record.unsubscribe(id);
        }
    }

    /// Whether the observation read nothing and subscribed nowhere.
    pub fn is_noop(&self) -> bool {
        self.id.is_none()
    }

    /// The subscriber this handle controls.
    pub fn subscriber(&self) -> Option<SubscriberId> {
        self.id
    }

    /// Convert into a boxed cleanup.
    pub fn into_cleanup(self) -> Cleanup {
        Box::new(move || self.unsubscribe())
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("subscriber", &self.id)
            .field("records", &self.records.len())
            .finish()
    }
}

impl Runtime {
    /// Run `trigger` while tracking, then subscribe `callback` to every signal
    /// it read.
    ///
    /// Returns the trigger's result and the handle that detaches the
    /// callback. A trigger that reads no signals subscribes nothing.
    ///
    /// # Errors
    ///
    /// [`crate::Error::NestedTracking`] if called while another tracked call
    /// is running.
    pub fn observe_with<T, C, G>(&self, callback: C, trigger: G) -> Result<(T, Unsubscribe)>
    where
        C: Fn() + 'static,
        G: FnOnce() -> T,
    {
        let (value, reads) = self.inner().tracking.record(trigger)?;
        if reads.is_empty() {
            return Ok((value, Unsubscribe::default()));
        }

        let id = self.inner().next_subscriber_id();
        let callback: Rc<dyn Fn()> = Rc::new(callback);
        let mut records = SmallVec::with_capacity(reads.len());

        for record in reads.into_values() {
            record.subscribe(Subscriber::new(id, Rc::clone(&callback)));
            records.push(Rc::downgrade(&record));
        }

        tracing::trace!(subscriber = id.raw(), signals = records.len(), "observation bound");

        Ok((
            value,
            Unsubscribe {
                id: Some(id),
                records,
            },
        ))
    }

    /// Observe with the tracked function doubling as the callback.
    pub fn observe<T, F>(&self, f: F) -> Result<(T, Unsubscribe)>
    where
        F: Fn() -> T + 'static,
    {
        let f = Rc::new(f);
        let callback = Rc::clone(&f);
        self.observe_with(
            move || {
                callback();
            },
            move || f(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::cell::Cell;

    fn bump(count: &Rc<Cell<i32>>) -> impl Fn() + 'static {
        let count = count.clone();
        move || count.set(count.get() + 1)
    }

    #[test]
    fn trigger_runs_synchronously_and_returns_value() {
        let rt = Runtime::new();
        let signal = rt.signal(7);

        let (value, unsub) = rt
            .observe_with(|| {}, {
                let signal = signal.clone();
                move || signal.get() * 2
            })
            .unwrap();

        assert_eq!(value, 14);
        assert!(!unsub.is_noop());
        assert_eq!(signal.subscriber_count(), 1);
    }

    #[test]
    fn no_reads_subscribes_nothing() {
        let rt = Runtime::new();
        let signal = rt.signal(1);
        let count = Rc::new(Cell::new(0));

        let (value, unsub) = rt.observe_with(bump(&count), || 5).unwrap();
        assert_eq!(value, 5);
        assert!(unsub.is_noop());

        signal.set(2);
        rt.tick();
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn callback_runs_on_tick_not_on_set() {
        let rt = Runtime::new();
        let signal = rt.signal(0);
        let count = Rc::new(Cell::new(0));

        let (_, _unsub) = rt
            .observe_with(bump(&count), {
                let signal = signal.clone();
                move || signal.get()
            })
            .unwrap();

        signal.set(1);
        signal.set(2);
        assert_eq!(count.get(), 0);

        rt.tick();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn unsubscribe_detaches_from_every_signal() {
        let rt = Runtime::new();
        let a = rt.signal(0);
        let b = rt.signal(0);
        let count = Rc::new(Cell::new(0));

        let (_, unsub) = rt
            .observe_with(bump(&count), {
                let (a, b) = (a.clone(), b.clone());
                move || a.get() + b.get()
            })
            .unwrap();

        unsub.unsubscribe();
        unsub.unsubscribe();
        assert_eq!(a.subscriber_count(), 0);
        assert_eq!(b.subscriber_count(), 0);

        a.set(1);
        b.set(1);
        rt.tick();
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn dependencies_are_captured_once() {
        let rt = Runtime::new();
        let flag = rt.signal(false);
        let other = rt.signal(0);
        let count = Rc::new(Cell::new(0));

        let (_, _unsub) = rt
            .observe({
                let (flag, other, count) = (flag.clone(), other.clone(), count.clone());
                move || {
                    count.set(count.get() + 1);
                    if flag.get() {
                        other.get();
                    }
                }
            })
            .unwrap();

        // The first run did not read `other`, so it never subscribes.
        flag.set(true);
        rt.tick();
        assert_eq!(count.get(), 2);

        other.set(5);
        rt.tick();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn nested_observe_is_an_error() {
        let rt = Runtime::new();
        let signal = rt.signal(0);

        let (inner, _unsub) = rt
            .observe_with(|| {}, {
                let rt = rt.clone();
                let signal = signal.clone();
                move || {
                    signal.get();
                    rt.observe(|| ()).map(|_| ())
                }
            })
            .unwrap();

        assert!(matches!(inner, Err(Error::NestedTracking)));
        assert!(!rt.is_tracking());
    }

    #[test]
    fn untracked_reads_are_not_subscribed() {
        let rt = Runtime::new();
        let seen = rt.signal(0);
        let hidden = rt.signal(0);

        let (_, _unsub) = rt
            .observe({
                let rt = rt.clone();
                let (seen, hidden) = (seen.clone(), hidden.clone());
                move || {
                    seen.get();
                    rt.untrack(|| hidden.get());
                }
            })
            .unwrap();

        assert_eq!(seen.subscriber_count(), 1);
        assert_eq!(hidden.subscriber_count(), 0);
    }
}
