use super::fire_before_feature_create;
use crate::MapMark;
use crate::events::{Flow, PointerEvent, PointerEventName};
use crate::features::{CreateFeature, Feature, FeatureId, Geometry, ShapeName, SourceName};
use crate::modes::{DrawModeName, Mode, ModeName};

/// Property holding the label of a text marker.
pub const TEXT_PROPERTY: &str = "text";

/// Places labelled points in two clicks.
///
/// The first click puts an empty text marker into the temporary source and
/// waits for text through [`MapMark::set_text_marker_text`]. The next click
/// moves it to `main` if the text is not blank and drops it otherwise.
#[derive(Debug, Default)]
pub struct TextMarkerMode {
    editing: Option<FeatureId>,
}

impl TextMarkerMode {
    pub fn new() -> Self {
        Self::default()
    }

    fn set_in_progress(&self, ctx: &MapMark, in_progress: bool) {
        ctx.update_mode_flags(self.mode(), |flags| flags.action_in_progress = in_progress);
    }

    fn place(&mut self, ctx: &mut MapMark, event: &PointerEvent) {
        let geojson = Feature::new(Geometry::Point {
            coordinates: event.lng_lat,
        })
        .with_property(TEXT_PROPERTY, "");
        if !fire_before_feature_create(ctx, DrawModeName::TextMarker, &geojson) {
            log::debug!("Text marker creation vetoed");
            return;
        }

        let request = CreateFeature::new(geojson, SourceName::Temporary).with_shape(ShapeName::TextMarker);
        self.editing = ctx.create_feature(request).map(|feature| feature.id);
        self.set_in_progress(ctx, self.editing.is_some());
    }

    fn finish(&mut self, ctx: &mut MapMark, id: FeatureId) {
        self.set_in_progress(ctx, false);
        let Some(geojson) = ctx
            .features()
            .get(SourceName::Temporary, &id)
            .map(|feature| feature.geojson().clone())
        else {
            log::warn!("Text marker \"{}\" vanished while editing", id);
            return;
        };
        ctx.delete_feature(&id);

        let blank = geojson
            .property_str(TEXT_PROPERTY)
            .is_none_or(|text| text.trim().is_empty());
        if blank {
            log::debug!("Dropping text marker \"{}\" without text", id);
            return;
        }
        let request = CreateFeature::new(geojson, SourceName::Main)
            .with_id(id)
            .with_shape(ShapeName::TextMarker);
        ctx.create_feature(request);
    }
}

impl Mode for TextMarkerMode {
    fn mode(&self) -> ModeName {
        ModeName::Draw(DrawModeName::TextMarker)
    }

    fn pointer_events(&self) -> &'static [PointerEventName] {
        &[PointerEventName::Click]
    }

    fn on_start_action(&mut self, _ctx: &mut MapMark) {}

    fn on_end_action(&mut self, ctx: &mut MapMark) {
        if let Some(id) = self.editing.take() {
            ctx.delete_feature(&id);
        }
    }

    fn handle_pointer(&mut self, ctx: &mut MapMark, event: &PointerEvent) -> Flow {
        match self.editing.take() {
            Some(id) => self.finish(ctx, id),
            None => self.place(ctx, event),
        }
        Flow::Stop
    }
}
