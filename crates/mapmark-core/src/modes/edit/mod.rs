//! Edit modes.
//!
//! Edit modes change existing features. Dragging is driven by the marker
//! gesture events of the shape markers helper rather than raw pointer input.

mod delete;
mod drag;

pub use delete::DeleteMode;
pub use drag::DragMode;

use super::{EditModeName, Mode};

pub fn create_edit_mode(mode: EditModeName) -> Option<Box<dyn Mode>> {
    match mode {
        EditModeName::Drag => Some(Box::new(DragMode::new())),
        EditModeName::Delete => Some(Box::new(DeleteMode::new())),
    }
}
