//! Control-flow nodes: keyed lists, conditionals, portals, slots and
//! comments.
//!
//! Each of these materializes like any other view but owns its region of the
//! DOM. Lists and conditionals lead their region with an empty marker node so
//! they can re-render in place.

mod case;
mod each;
mod portal;
mod slot;

pub use case::{case, Branch};
pub use each::{each, Each};
pub use portal::portal;
pub use slot::{comment, slot, slot_with};
