//! Rendering into a node outside the logical parent.

use std::rc::Rc;

use crate::dom::{NodeKind, NodeRef};
use crate::render::holder::{Cursor, Holder};
use crate::render::materialize::{materialize, RenderCtx};
use crate::render::view::{Builtin, BuiltinView, View};
use crate::{Error, Result};

struct Portal {
    target: NodeRef,
    children: View,
}

/// Render `children` at the end of `target`.
///
/// The content belongs to the enclosing view: it is destroyed together with
/// it, even though its nodes live under `target`.
pub fn portal(target: NodeRef, children: impl Into<View>) -> View {
    BuiltinView::new(Portal {
        target,
        children: children.into(),
    })
}

impl Builtin for Portal {
    fn name(&self) -> &'static str {
        "portal"
    }

    fn materialize(&self, cx: &RenderCtx, _cursor: &mut Cursor, holder: &mut Holder) -> Result<()> {
        if cx.dom.kind(self.target) != Some(NodeKind::Element) {
            return Err(Error::InvalidTarget);
        }

        let mut inner = Holder::default();
        let mut cursor = Cursor::append(self.target);
        if let Err(err) = materialize(cx, &self.children, &mut cursor, &mut inner) {
            inner.destroy(&*cx.dom, true);
            return Err(err);
        }

        let dom = Rc::clone(&cx.dom);
        holder.push_cleanup(Box::new(move || {
            let mut inner = inner;
            inner.destroy(&*dom, true);
        }));
        Ok(())
    }
}
