//! Helper modes, started as companions of other modes.

mod shape_markers;

pub use shape_markers::ShapeMarkersMode;

use super::{HelperModeName, Mode};

pub fn create_helper_mode(mode: HelperModeName) -> Option<Box<dyn Mode>> {
    match mode {
        HelperModeName::ShapeMarkers => Some(Box::new(ShapeMarkersMode::new())),
    }
}
