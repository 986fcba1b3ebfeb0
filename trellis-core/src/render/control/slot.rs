//! Slots and comments.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::reactive::Runtime;
use crate::render::component::Props;
use crate::render::holder::{Cursor, Holder};
use crate::render::materialize::{materialize, RenderCtx};
use crate::render::view::{Builtin, BuiltinView, PropValue, View};
use crate::Result;

type SlotFn = Rc<dyn Fn(&Runtime, &Props) -> Result<View>>;

enum Slot {
    View(View),
    Render {
        props: IndexMap<String, PropValue>,
        render: SlotFn,
    },
}

/// Render a pre-built view as is.
pub fn slot(view: impl Into<View>) -> View {
    BuiltinView::new(Slot::View(view.into()))
}

/// Render `render` with a prop store built from `props`.
///
/// Reactive entries stay reactive: the render function sees their current
/// value on every read.
pub fn slot_with<I, K, F>(props: I, render: F) -> View
where
    I: IntoIterator<Item = (K, PropValue)>,
    K: Into<String>,
    F: Fn(&Runtime, &Props) -> Result<View> + 'static,
{
    BuiltinView::new(Slot::Render {
        props: props.into_iter().map(|(key, value)| (key.into(), value)).collect(),
        render: Rc::new(render),
    })
}

impl Builtin for Slot {
    fn name(&self) -> &'static str {
        "slot"
    }

    fn materialize(&self, cx: &RenderCtx, cursor: &mut Cursor, holder: &mut Holder) -> Result<()> {
        match self {
            Slot::View(view) => materialize(cx, view, cursor, holder),
            Slot::Render { props, render } => {
                let props = Props::new(props.clone(), Vec::new(), Vec::new(), Rc::clone(&cx.registry));
                let view = cx.rt.untrack(|| render(&cx.rt, &props))?;
                materialize(cx, &view, cursor, holder)
            }
        }
    }
}

struct Comment(String);

/// A comment node.
pub fn comment(text: impl Into<String>) -> View {
    BuiltinView::new(Comment(text.into()))
}

impl Builtin for Comment {
    fn name(&self) -> &'static str {
        "comment"
    }

    fn materialize(&self, cx: &RenderCtx, cursor: &mut Cursor, holder: &mut Holder) -> Result<()> {
        let node = cx.dom.create_comment(&self.0);
        cursor.insert(&*cx.dom, node);
        holder.push_node(node);
        Ok(())
    }
}
