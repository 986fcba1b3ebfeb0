//! Keyed list rendering.
//!
//! Each item is rendered once per key. When the list changes, entries whose
//! key survived are reused: their item and index signals are updated in
//! place and their nodes moved only when their successor differs. Entries
//! whose key disappeared are destroyed, new keys are rendered fresh.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::dom::NodeRef;
use crate::reactive::{ReadSignal, Signal, Unsubscribe};
use crate::render::holder::{Cursor, Holder, Instance};
use crate::render::materialize::{materialize, RenderCtx};
use crate::render::view::{Builtin, BuiltinView, View};
use crate::{Error, Result};

type KeyFn<T, K> = Rc<dyn Fn(&T, usize) -> K>;
type RenderFn<T> = Rc<dyn Fn(ReadSignal<T>, ReadSignal<usize>) -> Result<View>>;

/// A keyed list description. Convert it into a [`View`] to render it.
pub struct Each<T: 'static, K: 'static> {
    list: Rc<dyn Fn() -> Vec<T>>,
    key: KeyFn<T, K>,
    render: RenderFn<T>,
}

/// Render `render` for every item `list` returns.
///
/// `list` is tracked; the list re-renders whenever a signal it read changes.
/// Items are keyed by position until [`Each::key`] says otherwise.
pub fn each<T, L, R>(list: L, render: R) -> Each<T, usize>
where
    T: PartialEq + 'static,
    L: Fn() -> Vec<T> + 'static,
    R: Fn(ReadSignal<T>, ReadSignal<usize>) -> Result<View> + 'static,
{
    Each {
        list: Rc::new(list),
        key: Rc::new(|_: &T, index: usize| index),
        render: Rc::new(render),
    }
}

impl<T: PartialEq + 'static, K> Each<T, K> {
    /// Key items by `key` instead of by position.
    pub fn key<K2, F>(self, key: F) -> Each<T, K2>
    where
        K2: Hash + Eq + Debug + 'static,
        F: Fn(&T) -> K2 + 'static,
    {
        Each {
            list: self.list,
            key: Rc::new(move |item: &T, _: usize| key(item)),
            render: self.render,
        }
    }
}

impl<T, K> From<Each<T, K>> for View
where
    T: PartialEq + 'static,
    K: Hash + Eq + Debug + 'static,
{
    fn from(each: Each<T, K>) -> Self {
        BuiltinView::new(each)
    }
}

impl<T, K> Builtin for Each<T, K>
where
    T: PartialEq + 'static,
    K: Hash + Eq + Debug + 'static,
{
    fn name(&self) -> &'static str {
        "each"
    }

    fn materialize(&self, cx: &RenderCtx, cursor: &mut Cursor, holder: &mut Holder) -> Result<()> {
        let marker = cx.dom.create_text("");
        cursor.insert(&*cx.dom, marker);

        let block = Rc::new(EachBlock {
            cx: cx.clone(),
            parent: cursor.parent,
            marker,
            key: Rc::clone(&self.key),
            render: Rc::clone(&self.render),
            entries: RefCell::new(IndexMap::new()),
            subscription: RefCell::new(None),
            destroyed: Cell::new(false),
        });

        let callback = {
            let block = Rc::downgrade(&block);
            let list = Rc::clone(&self.list);
            move || {
                let Some(block) = block.upgrade() else {
                    return;
                };
                let items = block.cx.rt.untrack(|| list());
                if let Err(err) = block.reconcile(items) {
                    block.cx.report(&err);
                }
            }
        };

        let (items, unsubscribe) = match cx.rt.observe_with(callback, || (self.list)()) {
            Ok(observed) => observed,
            Err(err) => {
                cx.dom.detach(marker);
                return Err(err);
            }
        };
        *block.subscription.borrow_mut() = Some(unsubscribe);

        if let Err(err) = block.reconcile(items) {
            block.destroy(true);
            return Err(err);
        }

        cursor.advance(block.last());
        holder.push_instance(block);
        Ok(())
    }
}

struct Entry<T: 'static> {
    item: Signal<T>,
    index: Signal<usize>,
    holder: Holder,
}

struct EachBlock<T: 'static, K: 'static> {
    cx: RenderCtx,
    parent: NodeRef,
    marker: NodeRef,
    key: KeyFn<T, K>,
    render: RenderFn<T>,
    entries: RefCell<IndexMap<K, Entry<T>>>,
    subscription: RefCell<Option<Unsubscribe>>,
    destroyed: Cell<bool>,
}

impl<T, K> EachBlock<T, K>
where
    T: PartialEq + 'static,
    K: Hash + Eq + Debug + 'static,
{
    fn reconcile(&self, items: Vec<T>) -> Result<()> {
        if self.destroyed.get() {
            return Ok(());
        }
        let Ok(mut entries) = self.entries.try_borrow_mut() else {
            tracing::warn!("<p:each> list changed while its items were rendering, skipping");
            return Ok(());
        };
        let dom = &*self.cx.dom;

        let keys: Vec<K> = items
            .iter()
            .enumerate()
            .map(|(index, item)| (self.key)(item, index))
            .collect();
        let mut seen = HashSet::with_capacity(keys.len());
        for key in &keys {
            if !seen.insert(key) {
                return Err(Error::DuplicateKey(format!("{key:?}")));
            }
        }

        let before = entries.len();
        entries.retain(|key, entry| {
            let keep = seen.contains(key);
            if !keep {
                entry.holder.destroy(dom, true);
            }
            keep
        });
        let removed = before - entries.len();

        // First pass: reuse by key, render new keys after their predecessor.
        let mut previous = std::mem::take(&mut *entries);
        let mut anchor = self.marker;
        let mut created = 0;
        let mut failure = None;
        for (index, (key, item)) in keys.into_iter().zip(items).enumerate() {
            let entry = match previous.shift_remove(&key) {
                Some(entry) => {
                    entry.item.set(item);
                    entry.index.set(index);
                    entry
                }
                None => match self.create(item, index, anchor) {
                    Ok(entry) => {
                        created += 1;
                        entry
                    }
                    Err(err) => {
                        failure = Some(err);
                        break;
                    }
                },
            };
            anchor = entry.holder.last().unwrap_or(anchor);
            entries.insert(key, entry);
        }
        entries.extend(previous);

        // Second pass: move entries whose successor is wrong.
        let mut anchor = self.marker;
        let mut moved = 0;
        for entry in entries.values() {
            let Some(first) = entry.holder.first() else {
                continue;
            };
            anchor = if dom.next_sibling(anchor) == Some(first) {
                entry.holder.last().unwrap_or(anchor)
            } else {
                moved += 1;
                entry.holder.move_after(dom, self.parent, anchor)
            };
        }

        tracing::trace!(
            len = entries.len(),
            created,
            removed,
            moved,
            "<p:each> reconciled"
        );
        failure.map_or(Ok(()), Err)
    }

    fn create(&self, item: T, index: usize, anchor: NodeRef) -> Result<Entry<T>> {
        let rt = &self.cx.rt;
        let item = rt.signal(item);
        let index = rt.signal(index);

        let view = rt.untrack(|| (self.render)(item.read_only(), index.read_only()))?;
        if view.is_empty() {
            return Err(Error::EmptyListItem);
        }

        let mut holder = Holder::default();
        let mut cursor = Cursor::after(self.parent, anchor);
        if let Err(err) = materialize(&self.cx, &view, &mut cursor, &mut holder) {
            holder.destroy(&*self.cx.dom, true);
            return Err(err);
        }
        Ok(Entry { item, index, holder })
    }
}

impl<T: 'static, K: 'static> Instance for EachBlock<T, K> {
    fn first(&self) -> NodeRef {
        self.marker
    }

    fn last(&self) -> NodeRef {
        self.entries
            .try_borrow()
            .ok()
            .and_then(|entries| entries.values().rev().find_map(|entry| entry.holder.last()))
            .unwrap_or(self.marker)
    }

    fn destroy(&self, detach: bool) {
        if self.destroyed.replace(true) {
            return;
        }
        if let Some(subscription) = self.subscription.borrow_mut().take() {
            subscription.unsubscribe();
        }
        if let Ok(mut entries) = self.entries.try_borrow_mut() {
            for (_, mut entry) in entries.drain(..) {
                entry.holder.destroy(&*self.cx.dom, detach);
            }
        }
        if detach {
            self.cx.dom.detach(self.marker);
        }
    }

    fn move_after(&self, anchor: NodeRef) -> NodeRef {
        let dom = &*self.cx.dom;
        dom.insert_after(self.parent, self.marker, Some(anchor));
        let mut anchor = self.marker;
        if let Ok(entries) = self.entries.try_borrow() {
            for entry in entries.values() {
                anchor = entry.holder.move_after(dom, self.parent, anchor);
            }
        }
        anchor
    }
}
