use crate::MapMark;
use crate::events::{EditAction, EventContext, Flow, PointerEvent, PointerEventName, SystemEvent};
use crate::features::SourceName;
use crate::modes::{EditModeName, Mode, ModeName};

/// Deletes the clicked feature.
#[derive(Debug, Default)]
pub struct DeleteMode;

impl DeleteMode {
    pub fn new() -> Self {
        Self
    }
}

impl Mode for DeleteMode {
    fn mode(&self) -> ModeName {
        ModeName::Edit(EditModeName::Delete)
    }

    fn pointer_events(&self) -> &'static [PointerEventName] {
        &[PointerEventName::Click]
    }

    fn on_start_action(&mut self, _ctx: &mut MapMark) {}

    fn on_end_action(&mut self, _ctx: &mut MapMark) {}

    fn handle_pointer(&mut self, ctx: &mut MapMark, event: &PointerEvent) -> Flow {
        let Some(feature) = ctx
            .feature_by_pointer(event, &[SourceName::Main])
            .filter(|feature| feature.shape().as_shape().is_some())
            .map(|feature| feature.snapshot())
        else {
            return Flow::Next;
        };

        if !ctx.delete_feature(&feature.id) {
            return Flow::Next;
        }
        log::debug!("Deleted \"{}\"", feature.id);
        ctx.fire(SystemEvent::Edit {
            mode: EditModeName::Delete,
            action: EditAction::FeatureRemoved { feature },
        });
        Flow::Stop
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MemoryAdapter;
    use crate::features::{CreateFeature, Feature, Geometry, MarkerKind};
    use crate::options::Options;
    use kurbo::Point;

    #[test]
    fn test_click_deletes_feature_with_children() {
        let adapter = MemoryAdapter::new();
        let mut ctx = MapMark::new(Options::default(), adapter.clone());
        ctx.init().unwrap();
        let polygon = Feature::new(Geometry::Polygon {
            coordinates: vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
        });
        let id = ctx
            .create_feature(CreateFeature::new(polygon, SourceName::Main))
            .unwrap()
            .id;
        ctx.features_mut()
            .create_marker_feature(&id, [0.0, 0.0], MarkerKind::Vertex, SourceName::Temporary);
        ctx.enable_mode(ModeName::Edit(EditModeName::Delete));

        let flow = ctx.handle_pointer(PointerEvent::new(
            PointerEventName::Click,
            Point::new(50.0, -50.0),
            [0.5, 0.5],
        ));
        assert_eq!(flow, Flow::Stop);
        assert!(ctx.features().is_empty());
        assert!(adapter.source_features(SourceName::Main).is_empty());
    }

    #[test]
    fn test_click_on_empty_map() {
        let mut ctx = MapMark::new(Options::default(), MemoryAdapter::new());
        ctx.init().unwrap();
        ctx.enable_mode(ModeName::Edit(EditModeName::Delete));
        let flow = ctx.handle_pointer(PointerEvent::new(
            PointerEventName::Click,
            Point::new(10.0, 10.0),
            [0.1, -0.1],
        ));
        assert_eq!(flow, Flow::Next);
    }
}
