//! Draw modes.

mod marker;
mod path;
mod rectangle;
mod text_marker;

pub use marker::MarkerMode;
pub use path::PathMode;
pub use rectangle::RectangleMode;
pub use text_marker::{TEXT_PROPERTY, TextMarkerMode};

use super::{DrawModeName, Mode, ModeName};
use crate::MapMark;
use crate::events::{DrawAction, EventContext, SystemEvent};
use crate::features::Feature;

/// Build a draw mode.
pub fn create_draw_mode(mode: DrawModeName) -> Option<Box<dyn Mode>> {
    match mode {
        DrawModeName::Marker => Some(Box::new(MarkerMode::new())),
        DrawModeName::Line | DrawModeName::Polygon => Some(Box::new(PathMode::new(mode))),
        DrawModeName::Rectangle => Some(Box::new(RectangleMode::new())),
        DrawModeName::TextMarker => Some(Box::new(TextMarkerMode::new())),
    }
}

/// Announce a pending creation. Returns whether no handler vetoed it.
///
/// Handlers veto by clearing `feature_create_allowed` on the mode's flags.
pub(crate) fn fire_before_feature_create(ctx: &mut MapMark, mode: DrawModeName, geojson: &Feature) -> bool {
    let mode_name = ModeName::Draw(mode);
    ctx.update_mode_flags(mode_name, |flags| flags.feature_create_allowed = true);
    ctx.fire(SystemEvent::Draw {
        mode,
        action: DrawAction::BeforeFeatureCreate {
            geojson: geojson.clone(),
        },
    });
    ctx.mode_flags(mode_name)
        .is_some_and(|flags| flags.feature_create_allowed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MemoryAdapter;
    use crate::events::{BusEvent, Channel, Flow, Handler, PointerEvent, PointerEventName};
    use crate::features::{Geometry, ShapeName};
    use crate::options::Options;
    use kurbo::Point;
    use std::rc::Rc;

    fn context() -> MapMark {
        let mut ctx = MapMark::new(Options::default(), MemoryAdapter::new());
        ctx.init().unwrap();
        ctx
    }

    fn click(lng: f64, lat: f64) -> PointerEvent {
        PointerEvent::new(
            PointerEventName::Click,
            Point::new(lng * 100.0, -lat * 100.0),
            [lng, lat],
        )
    }

    #[test]
    fn test_veto_blocks_creation() {
        let mut ctx = context();
        let marker = ModeName::Draw(DrawModeName::Marker);
        let veto: Handler<MapMark> = Rc::new(move |ctx: &mut MapMark, event: &BusEvent| {
            if let BusEvent::System(SystemEvent::Draw {
                action: DrawAction::BeforeFeatureCreate { .. },
                ..
            }) = event
            {
                ctx.update_mode_flags(marker, |flags| flags.feature_create_allowed = false);
            }
            Flow::Next
        });
        let veto_id = ctx.event_bus_mut().attach_one(Channel::Draw, veto);

        ctx.enable_mode(marker);
        ctx.handle_pointer(click(1.0, 1.0));
        assert!(ctx.features().is_empty());

        ctx.event_bus_mut().detach(veto_id);
        ctx.handle_pointer(click(1.0, 1.0));
        assert_eq!(ctx.features().len(), 1);
    }

    #[test]
    fn test_before_create_without_running_mode() {
        let mut ctx = context();
        let geojson = Feature::new(Geometry::Point { coordinates: [0.0, 0.0] });
        assert!(!fire_before_feature_create(&mut ctx, DrawModeName::Marker, &geojson));
    }

    #[test]
    fn test_factory_covers_draw_modes() {
        for mode in DrawModeName::ALL {
            let created = create_draw_mode(mode).unwrap();
            assert_eq!(created.mode(), ModeName::Draw(mode));
        }
        assert_eq!(DrawModeName::from(ShapeName::Line).shape(), ShapeName::Line);
    }
}
