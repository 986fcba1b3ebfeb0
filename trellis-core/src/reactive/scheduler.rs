//! Batch Scheduler
//!
//! The scheduler collects the dependency records of signals that changed and
//! runs their subscribers later, in one flush.
//!
//! # Algorithm
//!
//! 1. `notify` inserts a record into the pending set unless the same signal
//!    was already enqueued in this window. The first insertion moves the
//!    scheduler from `Idle` to `Pending`.
//! 2. `flush` runs up to `max_passes` passes. Each pass drains the pending
//!    set and invokes every subscriber that has not run yet in this flush,
//!    in record-then-registration order.
//! 3. Subscribers may set further signals; those records land in the pending
//!    set and are picked up by the next pass.
//! 4. When no records are left, or the cap is reached, the markers are
//!    cleared and the scheduler returns to `Idle`. Records still pending at
//!    the cap are dropped and counted as an overflow.
//!
//! Inside `unbatched`, a notification runs its subscribers at once. While a
//! flush is pending or running they still go through the already-run
//! marker, so no subscriber runs twice in one flush.
//!
//! There is no topological ordering: a subscriber that changes another
//! signal makes that signal's subscribers run in a later pass.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use indexmap::IndexMap;

use super::subscriber::{DependencyRecord, SignalId, SubscriberId};

/// Whether a flush is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushState {
    /// Nothing is waiting for the next tick.
    Idle,

    /// A flush is scheduled for the next tick.
    Pending,
}

/// Outcome of one flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Number of passes that ran.
    pub passes: usize,

    /// Number of subscriber invocations.
    pub invoked: usize,

    /// Number of dependency records dropped at the pass cap.
    pub dropped: usize,
}

pub(crate) struct Scheduler {
    max_passes: usize,
    state: Cell<FlushState>,
    unbatched: Cell<usize>,
    pending: RefCell<IndexMap<SignalId, Rc<DependencyRecord>>>,
    enqueued: RefCell<HashSet<SignalId>>,
    ran: RefCell<HashSet<SubscriberId>>,
    overflows: Cell<u64>,
}

impl Scheduler {
    pub(crate) fn new(max_passes: usize) -> Self {
        Self {
            max_passes: max_passes.max(1),
            state: Cell::new(FlushState::Idle),
            unbatched: Cell::new(0),
            pending: RefCell::new(IndexMap::new()),
            enqueued: RefCell::new(HashSet::new()),
            ran: RefCell::new(HashSet::new()),
            overflows: Cell::new(0),
        }
    }

    pub(crate) fn state(&self) -> FlushState {
        self.state.get()
    }

    pub(crate) fn overflows(&self) -> u64 {
        self.overflows.get()
    }

    /// Called by a signal after its value changed.
    pub(crate) fn notify(&self, record: &Rc<DependencyRecord>) {
        if self.unbatched.get() > 0 {
            tracing::trace!(signal = record.signal().raw(), "running subscribers unbatched");
            self.run_now(record);
            return;
        }

        if !self.enqueued.borrow_mut().insert(record.signal()) {
            return;
        }

        self.pending
            .borrow_mut()
            .insert(record.signal(), Rc::clone(record));

        if self.state.get() == FlushState::Idle {
            self.state.set(FlushState::Pending);
            tracing::trace!(signal = record.signal().raw(), "flush scheduled");
        }
    }

    /// Run the scheduled flush, if any.
    pub(crate) fn flush(&self) -> Option<FlushReport> {
        if self.state.get() != FlushState::Pending {
            return None;
        }

        let mut report = FlushReport::default();

        while report.passes < self.max_passes {
            let batch: Vec<_> = self
                .pending
                .borrow_mut()
                .drain(..)
                .map(|(_, record)| record)
                .collect();

            if batch.is_empty() {
                break;
            }

            report.passes += 1;
            for record in batch {
                report.invoked += self.run_record(&record);
            }
        }

        report.dropped = {
            let mut pending = self.pending.borrow_mut();
            let dropped = pending.len();
            pending.clear();
            dropped
        };

        if report.dropped > 0 {
            self.overflows.set(self.overflows.get() + 1);
            tracing::warn!(
                passes = report.passes,
                dropped = report.dropped,
                "flush pass cap reached, dropping remaining updates"
            );
        }

        self.enqueued.borrow_mut().clear();
        self.ran.borrow_mut().clear();
        self.state.set(FlushState::Idle);

        tracing::debug!(
            passes = report.passes,
            invoked = report.invoked,
            "flush complete"
        );

        Some(report)
    }

    /// Invoke every subscriber of `record` that has not run in this flush.
    fn run_record(&self, record: &DependencyRecord) -> usize {
        let mut invoked = 0;

        for subscriber in record.snapshot() {
            // An earlier subscriber may have unsubscribed this one.
            if !record.contains(subscriber.id()) {
                continue;
            }
            if !self.ran.borrow_mut().insert(subscriber.id()) {
                continue;
            }
            subscriber.notify();
            invoked += 1;
        }

        invoked
    }

    /// Invoke the subscribers of `record` right away.
    ///
    /// While a flush is pending or running, subscribers that already ran in
    /// it are skipped and the ones invoked here count as run.
    fn run_now(&self, record: &DependencyRecord) {
        let in_flush = self.state.get() == FlushState::Pending;

        for subscriber in record.snapshot() {
            if !record.contains(subscriber.id()) {
                continue;
            }
            if in_flush && !self.ran.borrow_mut().insert(subscriber.id()) {
                continue;
            }
            subscriber.notify();
        }
    }

    /// Run `f` with notifications delivered immediately.
    pub(crate) fn unbatched<T>(&self, f: impl FnOnce() -> T) -> T {
        self.unbatched.set(self.unbatched.get() + 1);
        let _guard = UnbatchedGuard {
            depth: &self.unbatched,
        };
        f()
    }
}

/// Leaves unbatched mode when dropped, even if the closure panicked.
struct UnbatchedGuard<'a> {
    depth: &'a Cell<usize>,
}

impl Drop for UnbatchedGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get() - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::subscriber::Subscriber;

    fn record_with(id: u64, subs: &[(u64, Rc<Cell<i32>>)]) -> Rc<DependencyRecord> {
        let record = Rc::new(DependencyRecord::new(SignalId(id)));
        for (sub, count) in subs {
            let count = count.clone();
            record.subscribe(Subscriber::new(
                SubscriberId(*sub),
                Rc::new(move || count.set(count.get() + 1)),
            ));
        }
        record
    }

    #[test]
    fn notify_schedules_once() {
        let scheduler = Scheduler::new(3);
        let count = Rc::new(Cell::new(0));
        let record = record_with(1, &[(1, count.clone())]);

        assert_eq!(scheduler.state(), FlushState::Idle);
        scheduler.notify(&record);
        scheduler.notify(&record);
        assert_eq!(scheduler.state(), FlushState::Pending);
        assert_eq!(count.get(), 0);

        let report = scheduler.flush().unwrap();
        assert_eq!(report.passes, 1);
        assert_eq!(report.invoked, 1);
        assert_eq!(count.get(), 1);
        assert_eq!(scheduler.state(), FlushState::Idle);
    }

    #[test]
    fn shared_subscriber_runs_once_per_flush() {
        let scheduler = Scheduler::new(3);
        let count = Rc::new(Cell::new(0));
        let a = record_with(1, &[(10, count.clone())]);
        let b = record_with(2, &[(10, count.clone())]);

        scheduler.notify(&a);
        scheduler.notify(&b);
        scheduler.flush();

        assert_eq!(count.get(), 1);
    }

    #[test]
    fn flush_without_pending_is_noop() {
        let scheduler = Scheduler::new(3);
        assert!(scheduler.flush().is_none());
    }

    #[test]
    fn unbatched_runs_immediately() {
        let scheduler = Scheduler::new(3);
        let count = Rc::new(Cell::new(0));
        let record = record_with(1, &[(1, count.clone())]);

        scheduler.unbatched(|| {
            scheduler.notify(&record);
            assert_eq!(count.get(), 1);
            scheduler.notify(&record);
            assert_eq!(count.get(), 2);
        });

        assert_eq!(scheduler.state(), FlushState::Idle);
    }

    #[test]
    fn unbatched_skips_subscribers_already_run_in_flush() {
        let scheduler = Rc::new(Scheduler::new(3));
        let shared = Rc::new(Cell::new(0));
        let b = record_with(2, &[(20, shared.clone())]);

        let a = Rc::new(DependencyRecord::new(SignalId(1)));
        a.subscribe(Subscriber::new(SubscriberId(20), {
            let shared = shared.clone();
            Rc::new(move || shared.set(shared.get() + 1))
        }));
        a.subscribe(Subscriber::new(SubscriberId(10), {
            let scheduler = Rc::clone(&scheduler);
            let b = Rc::clone(&b);
            Rc::new(move || scheduler.unbatched(|| scheduler.notify(&b)))
        }));

        scheduler.notify(&a);
        let report = scheduler.flush().unwrap();

        assert_eq!(shared.get(), 1);
        assert_eq!(report.invoked, 2);
    }

    #[test]
    fn unbatched_depth_restored_after_panic() {
        let scheduler = Scheduler::new(3);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            scheduler.unbatched(|| panic!("boom"))
        }));
        assert!(result.is_err());

        let count = Rc::new(Cell::new(0));
        let record = record_with(1, &[(1, count.clone())]);
        scheduler.notify(&record);
        assert_eq!(count.get(), 0);
        assert_eq!(scheduler.state(), FlushState::Pending);
    }
}
