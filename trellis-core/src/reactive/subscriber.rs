//! Subscriber types for the reactive system.
//!
//! A Subscriber is a callback registered against one or more signals by an
//! observation binding. Every signal owns a [`DependencyRecord`] listing the
//! subscribers that read it.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use smallvec::SmallVec;

/// Unique identifier for a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalId(pub(crate) u64);

impl SignalId {
    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Unique identifier for a subscriber.
///
/// Each observation binding gets one id, shared by every dependency record it
/// registers with. Ids only increase, so a removed subscriber's id is never
/// handed to a later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub(crate) u64);

impl SubscriberId {
    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// A callback registered against reactive values.
#[derive(Clone)]
pub struct Subscriber {
    id: SubscriberId,
    callback: Rc<dyn Fn()>,
}

impl Subscriber {
    pub(crate) fn new(id: SubscriberId, callback: Rc<dyn Fn()>) -> Self {
        Self { id, callback }
    }

    /// Get the subscriber's unique ID.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Notify the subscriber that one of its dependencies changed.
    pub fn notify(&self) {
        (self.callback)();
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber").field("id", &self.id).finish()
    }
}

/// The subscribers of one signal, in registration order.
pub(crate) struct DependencyRecord {
    signal: SignalId,
    subscribers: RefCell<IndexMap<SubscriberId, Subscriber>>,
}

impl DependencyRecord {
    pub(crate) fn new(signal: SignalId) -> Self {
        Self {
            signal,
            subscribers: RefCell::new(IndexMap::new()),
        }
    }

    pub(crate) fn signal(&self) -> SignalId {
        self.signal
    }

    pub(crate) fn subscribe(&self, subscriber: Subscriber) {
        self.subscribers
            .borrow_mut()
            .insert(subscriber.id(), subscriber);
    }

    /// Remove a subscriber. Removing an absent one is harmless.
    pub(crate) fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.subscribers.borrow_mut().shift_remove(&id).is_some()
    }

    pub(crate) fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.borrow().contains_key(&id)
    }

    /// Copy out the current subscribers so callbacks can run without the
    /// record being borrowed.
    pub(crate) fn snapshot(&self) -> SmallVec<[Subscriber; 4]> {
        self.subscribers.borrow().values().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.subscribers.borrow().len()
    }
}

impl fmt::Debug for DependencyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyRecord")
            .field("signal", &self.signal)
            .field("subscribers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counting(id: u64, count: &Rc<Cell<i32>>) -> Subscriber {
        let count = count.clone();
        Subscriber::new(SubscriberId(id), Rc::new(move || count.set(count.get() + 1)))
    }

    #[test]
    fn subscriber_notify_calls_callback() {
        let count = Rc::new(Cell::new(0));
        let subscriber = counting(1, &count);

        assert_eq!(count.get(), 0);
        subscriber.notify();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn record_keeps_registration_order() {
        let record = DependencyRecord::new(SignalId(7));
        let count = Rc::new(Cell::new(0));

        record.subscribe(counting(3, &count));
        record.subscribe(counting(1, &count));
        record.subscribe(counting(2, &count));

        let ids: Vec<_> = record.snapshot().iter().map(|s| s.id().raw()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let record = DependencyRecord::new(SignalId(0));
        let count = Rc::new(Cell::new(0));
        record.subscribe(counting(5, &count));

        assert!(record.unsubscribe(SubscriberId(5)));
        assert!(!record.unsubscribe(SubscriberId(5)));
        assert_eq!(record.len(), 0);
        assert!(!record.contains(SubscriberId(5)));
    }
}
