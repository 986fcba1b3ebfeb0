//! Reactive Context
//!
//! The tracking context records which signals a synchronous call reads.
//! When a signal is read while the context is active, the signal's
//! dependency record is inserted into it, keyed by signal ID so repeated
//! reads collapse into one entry.
//!
//! # Implementation
//!
//! The context is a single nullable slot owned by the runtime. It is filled
//! at the start of an observation and emptied right after, so it never spans
//! more than one call stack. Starting a second observation while the slot is
//! filled is rejected with [`Error::NestedTracking`]; sharing the slot would
//! otherwise mix the reads of both observations.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use super::subscriber::{DependencyRecord, SignalId};
use crate::{Error, Result};

/// Dependency records collected by one tracked call.
pub(crate) type TrackedReads = IndexMap<SignalId, Rc<DependencyRecord>>;

/// The runtime's tracking slot.
#[derive(Default)]
pub(crate) struct TrackingContext {
    slot: RefCell<Option<TrackedReads>>,
}

/// Empties the slot when dropped, so a panicking tracked call does not leave
/// the runtime stuck in tracking mode.
struct SlotGuard<'a> {
    slot: &'a RefCell<Option<TrackedReads>>,
}

impl SlotGuard<'_> {
    fn finish(self) -> TrackedReads {
        self.slot.borrow_mut().take().unwrap_or_default()
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.slot.borrow_mut().take();
    }
}

impl TrackingContext {
    /// Run `f` while recording the signals it reads.
    pub(crate) fn record<T>(&self, f: impl FnOnce() -> T) -> Result<(T, TrackedReads)> {
        {
            let mut slot = self.slot.borrow_mut();
            if slot.is_some() {
                return Err(Error::NestedTracking);
            }
            *slot = Some(IndexMap::new());
        }

        let guard = SlotGuard { slot: &self.slot };
        let value = f();
        Ok((value, guard.finish()))
    }

    /// Check if there is an active tracking context.
    pub(crate) fn is_active(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// Record a read of the given dependency record.
    ///
    /// This is called by signals when they are read.
    pub(crate) fn track(&self, record: &Rc<DependencyRecord>) {
        if let Some(reads) = self.slot.borrow_mut().as_mut() {
            reads
                .entry(record.signal())
                .or_insert_with(|| Rc::clone(record));
        }
    }

    /// Run `f` with tracking suspended, restoring the previous state after.
    pub(crate) fn untracked<T>(&self, f: impl FnOnce() -> T) -> T {
        let suspended = self.slot.borrow_mut().take();
        let _guard = RestoreGuard {
            slot: &self.slot,
            suspended,
        };
        f()
    }
}

/// Puts a suspended recording back into the slot when dropped.
struct RestoreGuard<'a> {
    slot: &'a RefCell<Option<TrackedReads>>,
    suspended: Option<TrackedReads>,
}

impl Drop for RestoreGuard<'_> {
    fn drop(&mut self) {
        *self.slot.borrow_mut() = self.suspended.take();
    }
}
