use super::fire_before_feature_create;
use crate::MapMark;
use crate::events::{Flow, PointerEvent, PointerEventName};
use crate::features::{CreateFeature, Feature, Geometry, ShapeName, SourceName};
use crate::modes::{DrawModeName, Mode, ModeName};

/// Places a marker on every click.
#[derive(Debug, Default)]
pub struct MarkerMode;

impl MarkerMode {
    pub fn new() -> Self {
        Self
    }
}

impl Mode for MarkerMode {
    fn mode(&self) -> ModeName {
        ModeName::Draw(DrawModeName::Marker)
    }

    fn pointer_events(&self) -> &'static [PointerEventName] {
        &[PointerEventName::Click]
    }

    fn on_start_action(&mut self, _ctx: &mut MapMark) {}

    fn on_end_action(&mut self, _ctx: &mut MapMark) {}

    fn handle_pointer(&mut self, ctx: &mut MapMark, event: &PointerEvent) -> Flow {
        let geojson = Feature::new(Geometry::Point {
            coordinates: event.lng_lat,
        });
        if !fire_before_feature_create(ctx, DrawModeName::Marker, &geojson) {
            log::debug!("Marker creation vetoed");
            return Flow::Next;
        }
        ctx.create_feature(CreateFeature::new(geojson, SourceName::Main).with_shape(ShapeName::Marker));
        Flow::Next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MemoryAdapter;
    use crate::features::FeatureShape;
    use crate::options::Options;
    use kurbo::Point;

    #[test]
    fn test_click_creates_marker() {
        let mut ctx = MapMark::new(Options::default(), MemoryAdapter::new());
        ctx.init().unwrap();
        ctx.enable_mode(ModeName::Draw(DrawModeName::Marker));

        ctx.handle_pointer(PointerEvent::new(
            PointerEventName::Click,
            Point::new(150.0, -250.0),
            [1.5, 2.5],
        ));

        let created: Vec<_> = ctx.features().iter().collect();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].shape(), FeatureShape::Shape(ShapeName::Marker));
        assert_eq!(created[0].source(), SourceName::Main);
        assert_eq!(created[0].geometry(), &Geometry::Point { coordinates: [1.5, 2.5] });
    }
}
