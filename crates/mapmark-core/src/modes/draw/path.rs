use super::fire_before_feature_create;
use crate::MapMark;
use crate::events::{Flow, PointerEvent, PointerEventName};
use crate::features::{CreateFeature, Feature, FeatureId, Geometry, LngLat, SourceName};
use crate::modes::{DrawModeName, Mode, ModeName};

/// Draws lines and polygons vertex by vertex.
///
/// Clicks add vertices, the pointer position previews the next one and a
/// double click finishes the shape. The preview lives in the temporary
/// source.
#[derive(Debug)]
pub struct PathMode {
    mode: DrawModeName,
    vertices: Vec<LngLat>,
    preview: Option<FeatureId>,
}

impl PathMode {
    pub fn new(mode: DrawModeName) -> Self {
        debug_assert!(matches!(mode, DrawModeName::Line | DrawModeName::Polygon));
        Self {
            mode,
            vertices: Vec::new(),
            preview: None,
        }
    }

    fn min_vertices(&self) -> usize {
        match self.mode {
            DrawModeName::Polygon => 3,
            _ => 2,
        }
    }

    fn set_in_progress(&self, ctx: &MapMark, in_progress: bool) {
        ctx.update_mode_flags(self.mode(), |flags| flags.action_in_progress = in_progress);
    }

    fn update_preview(&mut self, ctx: &mut MapMark, cursor: Option<LngLat>) {
        let mut coordinates = self.vertices.clone();
        coordinates.extend(cursor);
        let geometry = Geometry::LineString { coordinates };

        match &self.preview {
            Some(id) => {
                ctx.update_feature_geometry(id, geometry);
            }
            None => {
                let request = CreateFeature::new(Feature::new(geometry), SourceName::Temporary)
                    .with_shape(self.mode.shape());
                self.preview = ctx.create_feature(request).map(|feature| feature.id);
            }
        }
    }

    fn discard(&mut self, ctx: &mut MapMark) {
        if let Some(id) = self.preview.take() {
            ctx.delete_feature(&id);
        }
        self.vertices.clear();
        self.set_in_progress(ctx, false);
    }

    fn finish(&mut self, ctx: &mut MapMark) {
        let mut vertices = std::mem::take(&mut self.vertices);
        vertices.dedup();
        self.discard(ctx);

        if vertices.len() < self.min_vertices() {
            log::debug!("Not enough vertices for a {}: {}", self.mode.as_str(), vertices.len());
            return;
        }

        let geometry = match self.mode {
            DrawModeName::Polygon => {
                vertices.push(vertices[0]);
                Geometry::Polygon {
                    coordinates: vec![vertices],
                }
            }
            _ => Geometry::LineString { coordinates: vertices },
        };
        let geojson = Feature::new(geometry);
        if !fire_before_feature_create(ctx, self.mode, &geojson) {
            log::debug!("{} creation vetoed", self.mode.as_str());
            return;
        }
        ctx.create_feature(CreateFeature::new(geojson, SourceName::Main).with_shape(self.mode.shape()));
    }
}

impl Mode for PathMode {
    fn mode(&self) -> ModeName {
        ModeName::Draw(self.mode)
    }

    fn pointer_events(&self) -> &'static [PointerEventName] {
        &[
            PointerEventName::Click,
            PointerEventName::MouseMove,
            PointerEventName::DblClick,
        ]
    }

    fn on_start_action(&mut self, _ctx: &mut MapMark) {}

    fn on_end_action(&mut self, ctx: &mut MapMark) {
        self.discard(ctx);
    }

    fn handle_pointer(&mut self, ctx: &mut MapMark, event: &PointerEvent) -> Flow {
        match event.kind {
            PointerEventName::Click => {
                self.vertices.push(event.lng_lat);
                self.set_in_progress(ctx, true);
                self.update_preview(ctx, None);
            }
            PointerEventName::MouseMove if !self.vertices.is_empty() => {
                self.update_preview(ctx, Some(event.lng_lat));
            }
            PointerEventName::DblClick => {
                self.vertices.push(event.lng_lat);
                self.finish(ctx);
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
    use crate::features::{FeatureShape, ShapeName};
    use crate::options::Options;
    use kurbo::Point;

    fn context(mode: DrawModeName) -> MapMark {
        let mut ctx = MapMark::new(Options::default(), MemoryAdapter::new());
        ctx.init().unwrap();
        ctx.enable_mode(ModeName::Draw(mode));
        ctx
    }

    fn pointer(kind: PointerEventName, lng: f64, lat: f64) -> PointerEvent {
        PointerEvent::new(kind, Point::new(lng * 100.0, -lat * 100.0), [lng, lat])
    }

    #[test]
    fn test_polygon_is_closed() {
        let mut ctx = context(DrawModeName::Polygon);
        ctx.handle_pointer(pointer(PointerEventName::Click, 0.0, 0.0));
        ctx.handle_pointer(pointer(PointerEventName::MouseMove, 0.5, 0.0));
        assert_eq!(ctx.features().iter_temporary().count(), 1);
        assert_eq!(
            ctx.mode_flags(ModeName::Draw(DrawModeName::Polygon))
                .map(|flags| flags.action_in_progress),
            Some(true)
        );

        ctx.handle_pointer(pointer(PointerEventName::Click, 1.0, 0.0));
        ctx.handle_pointer(pointer(PointerEventName::Click, 1.0, 1.0));
        ctx.handle_pointer(pointer(PointerEventName::DblClick, 1.0, 1.0));

        assert_eq!(ctx.features().iter_temporary().count(), 0);
        let created: Vec<_> = ctx.features().iter().collect();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].shape(), FeatureShape::Shape(ShapeName::Polygon));
        assert_eq!(
            created[0].geometry(),
            &Geometry::Polygon {
                coordinates: vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
            }
        );
    }

    #[test]
    fn test_short_line_is_dropped() {
        let mut ctx = context(DrawModeName::Line);
        ctx.handle_pointer(pointer(PointerEventName::Click, 0.0, 0.0));
        ctx.handle_pointer(pointer(PointerEventName::DblClick, 0.0, 0.0));
        assert!(ctx.features().is_empty());
    }

    #[test]
    fn test_line() {
        let mut ctx = context(DrawModeName::Line);
        ctx.handle_pointer(pointer(PointerEventName::Click, 0.0, 0.0));
        ctx.handle_pointer(pointer(PointerEventName::Click, 2.0, 1.0));
        ctx.handle_pointer(pointer(PointerEventName::DblClick, 2.0, 1.0));

        let created: Vec<_> = ctx.features().iter().collect();
        assert_eq!(created.len(), 1);
        assert_eq!(
            created[0].geometry(),
            &Geometry::LineString {
                coordinates: vec![[0.0, 0.0], [2.0, 1.0]]
            }
        );
    }

    #[test]
    fn test_end_discards_preview() {
        let mut ctx = context(DrawModeName::Line);
        ctx.handle_pointer(pointer(PointerEventName::Click, 0.0, 0.0));
        ctx.handle_pointer(pointer(PointerEventName::MouseMove, 1.0, 0.0));

        ctx.disable_mode(ModeName::Draw(DrawModeName::Line));
        assert!(ctx.features().is_empty());
    }
}
