//! Conditional rendering.
//!
//! Branches are tested in order and the first whose condition holds is
//! rendered. Conditions are tracked lazily: a condition starts being
//! observed the first time evaluation reaches it and stays observed for the
//! life of the block, so a change in any condition already consulted
//! re-runs the selection.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::dom::NodeRef;
use crate::reactive::Unsubscribe;
use crate::render::holder::{Cursor, Holder, Instance};
use crate::render::materialize::{materialize, RenderCtx};
use crate::render::view::{Builtin, BuiltinView, View};
use crate::{Error, Result};

/// One `(condition, content)` pair.
#[derive(Clone)]
pub struct Branch {
    condition: Option<Rc<dyn Fn() -> bool>>,
    view: View,
}

impl Branch {
    /// Render `view` when `condition` holds.
    pub fn when(condition: impl Fn() -> bool + 'static, view: impl Into<View>) -> Self {
        Self {
            condition: Some(Rc::new(condition)),
            view: view.into(),
        }
    }

    /// Render `view` when no earlier branch matched.
    pub fn otherwise(view: impl Into<View>) -> Self {
        Self {
            condition: None,
            view: view.into(),
        }
    }
}

/// Build a conditional block.
///
/// # Errors
///
/// [`Error::NoBranches`] for an empty branch list and [`Error::EmptyBranch`]
/// when a branch renders nothing.
pub fn case(branches: Vec<Branch>) -> Result<View> {
    if branches.is_empty() {
        return Err(Error::NoBranches);
    }
    if branches.iter().any(|branch| branch.view.is_empty()) {
        return Err(Error::EmptyBranch);
    }
    Ok(BuiltinView::new(Case {
        branches: branches.into(),
    }))
}

struct Case {
    branches: Rc<[Branch]>,
}

impl Builtin for Case {
    fn name(&self) -> &'static str {
        "case"
    }

    fn materialize(&self, cx: &RenderCtx, cursor: &mut Cursor, holder: &mut Holder) -> Result<()> {
        let marker = cx.dom.create_text("");
        cursor.insert(&*cx.dom, marker);

        let block = Rc::new(CaseBlock {
            cx: cx.clone(),
            parent: cursor.parent,
            marker,
            tracked: RefCell::new((0..self.branches.len()).map(|_| None).collect()),
            branches: Rc::clone(&self.branches),
            active: Cell::new(None),
            holder: RefCell::new(Holder::default()),
            destroyed: Cell::new(false),
        });

        let mounted = block.select().and_then(|active| block.show(active));
        if let Err(err) = mounted {
            block.destroy(true);
            return Err(err);
        }

        cursor.advance(block.last());
        holder.push_instance(block);
        Ok(())
    }
}

struct CaseBlock {
    cx: RenderCtx,
    parent: NodeRef,
    marker: NodeRef,
    branches: Rc<[Branch]>,
    tracked: RefCell<Vec<Option<Unsubscribe>>>,
    active: Cell<Option<usize>>,
    holder: RefCell<Holder>,
    destroyed: Cell<bool>,
}

impl CaseBlock {
    /// Index of the first branch whose condition holds.
    fn select(self: &Rc<Self>) -> Result<Option<usize>> {
        for (index, branch) in self.branches.iter().enumerate() {
            let Some(condition) = &branch.condition else {
                return Ok(Some(index));
            };

            let tracked = self.tracked.borrow()[index].is_some();
            let holds = if tracked {
                self.cx.rt.untrack(|| condition())
            } else {
                let block = Rc::downgrade(self);
                let (holds, unsubscribe) = self.cx.rt.observe_with(
                    move || {
                        if let Some(block) = block.upgrade() {
                            block.refresh();
                        }
                    },
                    || condition(),
                )?;
                self.tracked.borrow_mut()[index] = Some(unsubscribe);
                holds
            };

            if holds {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    fn refresh(self: &Rc<Self>) {
        if self.destroyed.get() {
            return;
        }
        let result = self.select().and_then(|next| {
            if next == self.active.get() {
                return Ok(());
            }
            self.show(next)
        });
        if let Err(err) = result {
            self.cx.report(&err);
        }
    }

    /// Destroy the current branch and render `next`.
    fn show(&self, next: Option<usize>) -> Result<()> {
        let mut previous = std::mem::take(&mut *self.holder.borrow_mut());
        previous.destroy(&*self.cx.dom, true);
        self.active.set(next);

        let Some(index) = next else {
            tracing::trace!("<p:case> cleared");
            return Ok(());
        };

        let mut holder = Holder::default();
        let mut cursor = Cursor::after(self.parent, self.marker);
        if let Err(err) = materialize(&self.cx, &self.branches[index].view, &mut cursor, &mut holder) {
            holder.destroy(&*self.cx.dom, true);
            self.active.set(None);
            return Err(err);
        }
        *self.holder.borrow_mut() = holder;
        tracing::trace!(branch = index, "<p:case> switched");
        Ok(())
    }
}

impl Instance for CaseBlock {
    fn first(&self) -> NodeRef {
        self.marker
    }

    fn last(&self) -> NodeRef {
        self.holder
            .try_borrow()
            .ok()
            .and_then(|holder| holder.last())
            .unwrap_or(self.marker)
    }

    fn destroy(&self, detach: bool) {
        if self.destroyed.replace(true) {
            return;
        }
        for unsubscribe in self.tracked.borrow_mut().drain(..).flatten() {
            unsubscribe.unsubscribe();
        }
        let mut holder = std::mem::take(&mut *self.holder.borrow_mut());
        holder.destroy(&*self.cx.dom, detach);
        if detach {
            self.cx.dom.detach(self.marker);
        }
    }

    fn move_after(&self, anchor: NodeRef) -> NodeRef {
        let dom = &*self.cx.dom;
        dom.insert_after(self.parent, self.marker, Some(anchor));
        self.holder.borrow().move_after(dom, self.parent, self.marker)
    }
}
