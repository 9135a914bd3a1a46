use super::fire_before_feature_create;
use crate::MapMark;
use crate::events::{Flow, PointerEvent, PointerEventName};
use crate::features::{CreateFeature, Feature, FeatureId, Geometry, LngLat, ShapeName, SourceName};
use crate::modes::{DrawModeName, Mode, ModeName};

/// Closed ring of the rectangle spanned by two opposite corners.
fn rectangle_ring([x0, y0]: LngLat, [x1, y1]: LngLat) -> Geometry {
    Geometry::Polygon {
        coordinates: vec![vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]]],
    }
}

/// Draws an axis-aligned rectangle from two clicks.
#[derive(Debug, Default)]
pub struct RectangleMode {
    start: Option<LngLat>,
    preview: Option<FeatureId>,
}

impl RectangleMode {
    pub fn new() -> Self {
        Self::default()
    }

    fn discard(&mut self, ctx: &mut MapMark) {
        if let Some(id) = self.preview.take() {
            ctx.delete_feature(&id);
        }
        self.start = None;
        ctx.update_mode_flags(self.mode(), |flags| flags.action_in_progress = false);
    }

    fn finish(&mut self, ctx: &mut MapMark, start: LngLat, end: LngLat) {
        self.discard(ctx);
        if start[0] == end[0] || start[1] == end[1] {
            log::debug!("Degenerate rectangle dropped");
            return;
        }
        let geojson = Feature::new(rectangle_ring(start, end));
        if !fire_before_feature_create(ctx, DrawModeName::Rectangle, &geojson) {
            return;
        }
        ctx.create_feature(CreateFeature::new(geojson, SourceName::Main).with_shape(ShapeName::Rectangle));
    }
}

impl Mode for RectangleMode {
    fn mode(&self) -> ModeName {
        ModeName::Draw(DrawModeName::Rectangle)
    }

    fn pointer_events(&self) -> &'static [PointerEventName] {
        &[PointerEventName::Click, PointerEventName::MouseMove]
    }

    fn on_start_action(&mut self, _ctx: &mut MapMark) {}

    fn on_end_action(&mut self, ctx: &mut MapMark) {
        self.discard(ctx);
    }

    fn handle_pointer(&mut self, ctx: &mut MapMark, event: &PointerEvent) -> Flow {
        match (event.kind, self.start) {
            (PointerEventName::Click, None) => {
                self.start = Some(event.lng_lat);
                ctx.update_mode_flags(self.mode(), |flags| flags.action_in_progress = true);
            }
            (PointerEventName::Click, Some(start)) => self.finish(ctx, start, event.lng_lat),
            (PointerEventName::MouseMove, Some(start)) => {
                let geometry = rectangle_ring(start, event.lng_lat);
                match &self.preview {
                    Some(id) => {
                        ctx.update_feature_geometry(id, geometry);
                    }
                    None => {
                        let request = CreateFeature::new(Feature::new(geometry), SourceName::Temporary)
                            .with_shape(ShapeName::Rectangle);
                        self.preview = ctx.create_feature(request).map(|feature| feature.id);
                    }
                }
            }
            _ => {}
        }
        Flow::Next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MemoryAdapter;
    use crate::options::Options;
    use kurbo::Point;

    fn pointer(kind: PointerEventName, lng: f64, lat: f64) -> PointerEvent {
        PointerEvent::new(kind, Point::new(lng * 100.0, -lat * 100.0), [lng, lat])
    }

    #[test]
    fn test_two_clicks_make_a_rectangle() {
        let mut ctx = MapMark::new(Options::default(), MemoryAdapter::new());
        ctx.init().unwrap();
        ctx.enable_mode(ModeName::Draw(DrawModeName::Rectangle));

        ctx.handle_pointer(pointer(PointerEventName::Click, 0.0, 0.0));
        ctx.handle_pointer(pointer(PointerEventName::MouseMove, 1.0, 1.0));
        assert_eq!(ctx.features().iter_temporary().count(), 1);
        ctx.handle_pointer(pointer(PointerEventName::Click, 2.0, 1.0));

        assert_eq!(ctx.features().iter_temporary().count(), 0);
        let created: Vec<_> = ctx.features().iter().collect();
        assert_eq!(created.len(), 1);
        assert_eq!(
            created[0].geometry(),
            &Geometry::Polygon {
                coordinates: vec![vec![[0.0, 0.0], [2.0, 0.0], [2.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]
            }
        );
    }

    #[test]
    fn test_degenerate_rectangle_is_dropped() {
        let mut ctx = MapMark::new(Options::default(), MemoryAdapter::new());
        ctx.init().unwrap();
        ctx.enable_mode(ModeName::Draw(DrawModeName::Rectangle));

        ctx.handle_pointer(pointer(PointerEventName::Click, 1.0, 1.0));
        ctx.handle_pointer(pointer(PointerEventName::Click, 1.0, 3.0));
        assert!(ctx.features().is_empty());
    }
}
